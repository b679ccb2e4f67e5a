//! Vellum Scene -- the read-only world snapshot a 2D renderer draws from.
//!
//! A [`Scene`](composite::Scene) holds a tree of [`Composite`](composite::Composite)s
//! with [`Body`](body::Body)s and [`Constraint`](constraint::Constraint)s, plus
//! the collision [`Pair`](composite::Pair)s of the last step. Bodies are made
//! of convex [`Part`](body::Part)s with per-part render styles (fill, border,
//! sprite, text). Compound bodies carry an explicit aggregate part and flag
//! the edges their parts share as internal.
//!
//! [`physics::PhysicsWorld`] is a rapier2d-backed simulation that produces
//! these snapshots.
//!
//! # Quick Start
//!
//! ```
//! use vellum_scene::prelude::*;
//!
//! let mut physics = PhysicsWorld::new(0.0, 9.81);
//! physics
//!     .add_body(BodyDesc::new(Vector::new(0.0, 0.0), vec![box_part(2.0, 2.0)]))
//!     .unwrap();
//! physics.step(1.0 / 60.0);
//!
//! let scene = physics.snapshot();
//! assert_eq!(scene.world.all_bodies().len(), 1);
//! ```

#![deny(unsafe_code)]

pub mod body;
pub mod composite;
pub mod constraint;
pub mod geometry;
pub mod physics;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while building scenes.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// A body id was referenced that does not exist in the world.
    #[error("body {body} does not exist")]
    UnknownBody { body: body::BodyId },

    /// A body was described without any parts.
    #[error("body {body} has no parts")]
    EmptyBody { body: body::BodyId },

    /// A polygon part had no convex hull (fewer than three distinct points).
    #[error("body {body} has a degenerate polygon part")]
    DegenerateShape { body: body::BodyId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::body::{
        BackgroundSprite, Body, BodyId, BodyRender, Part, PartRender, Sprite, TextLabel,
    };
    pub use crate::composite::{BodyIndex, Composite, Pair, PairBody, Scene};
    pub use crate::constraint::{Constraint, ConstraintKind, ConstraintRender};
    pub use crate::geometry::{Bounds, Vector, Vertex};
    pub use crate::physics::{
        box_part, circle_part, polygon_part, BodyDesc, ColliderShape, CollisionPair,
        ConstraintDesc, PartDesc, PhysicsBodyType, PhysicsWorld,
    };
    pub use crate::SceneError;
}
