//! The composite tree, collision pairs and the per-frame [`Scene`] snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::body::{Body, BodyId};
use crate::constraint::Constraint;
use crate::geometry::Vector;

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

/// A node of the world tree: bodies, constraints and nested composites.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Composite {
    /// Identifier.
    pub id: u64,
    /// Free-form label.
    pub label: String,
    /// Bodies owned directly by this composite.
    pub bodies: Vec<Body>,
    /// Constraints owned directly by this composite.
    pub constraints: Vec<Constraint>,
    /// Child composites.
    pub composites: Vec<Composite>,
}

impl Composite {
    /// Empty composite with a label.
    pub fn new(id: u64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            ..Default::default()
        }
    }

    /// Every body in this composite and its descendants, depth first,
    /// own bodies before children.
    pub fn all_bodies(&self) -> Vec<&Body> {
        let mut out = Vec::with_capacity(self.bodies.len());
        self.collect_bodies(&mut out);
        out
    }

    fn collect_bodies<'a>(&'a self, out: &mut Vec<&'a Body>) {
        out.extend(self.bodies.iter());
        for child in &self.composites {
            child.collect_bodies(out);
        }
    }

    /// Every constraint in this composite and its descendants.
    pub fn all_constraints(&self) -> Vec<&Constraint> {
        let mut out = Vec::with_capacity(self.constraints.len());
        self.collect_constraints(&mut out);
        out
    }

    fn collect_constraints<'a>(&'a self, out: &mut Vec<&'a Constraint>) {
        out.extend(self.constraints.iter());
        for child in &self.composites {
            child.collect_constraints(out);
        }
    }
}

// ---------------------------------------------------------------------------
// BodyIndex
// ---------------------------------------------------------------------------

/// Id lookup over a set of borrowed bodies. Built once per frame.
#[derive(Debug, Default)]
pub struct BodyIndex<'a> {
    by_id: HashMap<BodyId, &'a Body>,
}

impl<'a> BodyIndex<'a> {
    /// Index the given bodies. Later duplicates win.
    pub fn new(bodies: &[&'a Body]) -> Self {
        Self {
            by_id: bodies.iter().map(|b| (b.id, *b)).collect(),
        }
    }

    /// Look up a body.
    pub fn get(&self, id: BodyId) -> Option<&'a Body> {
        self.by_id.get(&id).copied()
    }

    /// Number of indexed bodies.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Pair
// ---------------------------------------------------------------------------

/// The body-side data a collision overlay needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairBody {
    /// Body identifier.
    pub id: BodyId,
    /// Body position at snapshot time.
    pub position: Vector,
    /// Whether the body is static.
    pub is_static: bool,
}

/// A collision pair between two bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    /// Identifier.
    pub id: u64,
    /// First body.
    pub body_a: PairBody,
    /// Second body.
    pub body_b: PairBody,
    /// Whether the bodies are currently touching.
    pub is_active: bool,
    /// Contact points in world coordinates.
    pub contacts: Vec<Vector>,
    /// Collision normal, pointing from `body_a` towards `body_b`.
    pub normal: Vector,
    /// Penetration depth.
    pub depth: f64,
    /// `normal * depth`.
    pub penetration: Vector,
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Everything the renderer reads for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scene {
    /// Root of the composite tree.
    pub world: Composite,
    /// Collision pairs from the last step.
    pub pairs: Vec<Pair>,
    /// Simulation timestamp in milliseconds.
    pub timestamp: f64,
    /// Whether the simulation puts bodies to sleep.
    pub enable_sleeping: bool,
}

impl Scene {
    /// Scene with a root composite and no pairs.
    pub fn new(world: Composite) -> Self {
        Self {
            world,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
