//! rapier2d bridge that produces renderable [`Scene`] snapshots.
//!
//! The [`PhysicsWorld`] owns a rapier2d simulation. Bodies are added from
//! [`BodyDesc`]s (one collider per part, each part with its own render
//! style); constraints become rapier spring joints. Each frame:
//!
//! 1. [`PhysicsWorld::step`] advances rapier by a fixed dt and returns the
//!    collisions that started during the step.
//! 2. [`PhysicsWorld::snapshot`] reads bodies, joints and active contact
//!    pairs back into a [`Scene`] in world coordinates.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Bodies, constraints
//! and pairs are emitted in insertion / id order so two runs with the same
//! inputs produce identical snapshots.

use std::collections::HashMap;

use rapier2d::prelude::*;

use crate::body::{Body, BodyId, BodyRender, Part, PartRender};
use crate::composite::{Composite, Pair, PairBody, Scene};
use crate::constraint::{Constraint, ConstraintRender};
use crate::geometry::{Bounds, Vector};
use crate::SceneError;

/// Number of vertices used to outline circle parts.
const CIRCLE_SIDES: usize = 24;

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// How rapier treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum PhysicsBodyType {
    /// Fully simulated.
    #[default]
    Dynamic,
    /// Moved by game logic through its velocity.
    Kinematic,
    /// Never moves.
    Static,
}

/// Collider shape of one part, in part-local coordinates.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ColliderShape {
    /// Box with half-extents.
    Box {
        /// Half-width along x.
        half_width: f64,
        /// Half-height along y.
        half_height: f64,
    },
    /// Circle.
    Circle {
        /// Radius.
        radius: f64,
    },
    /// Convex polygon; the hull of the points is used.
    Polygon {
        /// Points around the part origin.
        points: Vec<Vector>,
    },
}

/// One part of a body to be added.
#[derive(Debug, Clone, PartialEq)]
pub struct PartDesc {
    /// Collider shape.
    pub shape: ColliderShape,
    /// Offset of the part origin from the body origin.
    pub offset: Vector,
    /// Render style.
    pub render: PartRender,
}

impl PartDesc {
    /// Part at the body origin with the default style.
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vector::ZERO,
            render: PartRender::default(),
        }
    }

    /// Move the part away from the body origin.
    pub fn at(mut self, offset: Vector) -> Self {
        self.offset = offset;
        self
    }

    /// Replace the render style.
    pub fn with_render(mut self, render: PartRender) -> Self {
        self.render = render;
        self
    }
}

/// A body to be added to the physics world.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    /// Label carried into snapshots.
    pub label: String,
    /// Simulation type.
    pub body_type: PhysicsBodyType,
    /// Initial position.
    pub position: Vector,
    /// Initial rotation in radians.
    pub angle: f64,
    /// Initial linear velocity.
    pub velocity: Vector,
    /// Bounciness.
    pub restitution: f64,
    /// Parts; two or more make a compound body.
    pub parts: Vec<PartDesc>,
    /// Body-level render flags.
    pub render: BodyRender,
}

impl BodyDesc {
    /// Dynamic body with the given parts.
    pub fn new(position: Vector, parts: Vec<PartDesc>) -> Self {
        Self {
            label: "Body".to_owned(),
            body_type: PhysicsBodyType::Dynamic,
            position,
            angle: 0.0,
            velocity: Vector::ZERO,
            restitution: 0.0,
            parts,
            render: BodyRender::default(),
        }
    }

    /// Change the simulation type.
    pub fn with_type(mut self, body_type: PhysicsBodyType) -> Self {
        self.body_type = body_type;
        self
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// A spring constraint to be added.
///
/// Without `body_b` the second anchor is a fixed world point.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDesc {
    /// First body.
    pub body_a: BodyId,
    /// Second body, or `None` for a world anchor.
    pub body_b: Option<BodyId>,
    /// Anchor relative to `body_a`.
    pub point_a: Vector,
    /// Anchor relative to `body_b`, or world point.
    pub point_b: Vector,
    /// Spring stiffness.
    pub stiffness: f64,
    /// Spring damping.
    pub damping: f64,
    /// Render style.
    pub render: ConstraintRender,
}

// ---------------------------------------------------------------------------
// CollisionPair
// ---------------------------------------------------------------------------

/// Two bodies whose contact started during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    /// First body.
    pub body_a: BodyId,
    /// Second body.
    pub body_b: BodyId,
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

struct BodyEntry {
    id: BodyId,
    handle: RigidBodyHandle,
    label: String,
    render: BodyRender,
    parts: Vec<PartEntry>,
}

struct PartEntry {
    id: u64,
    handle: ColliderHandle,
    render: PartRender,
    /// `is_internal` per vertex, fixed when the body is added.
    internal: Vec<bool>,
}

struct ConstraintEntry {
    id: u64,
    body_a: BodyId,
    body_b: Option<BodyId>,
    handle: ImpulseJointHandle,
    render: ConstraintRender,
}

/// rapier2d simulation that exports [`Scene`] snapshots.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: rapier2d::math::Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Bodies in insertion order.
    bodies: Vec<BodyEntry>,
    constraints: Vec<ConstraintEntry>,
    /// Maps rapier ColliderHandle -> owning body.
    collider_to_body: HashMap<ColliderHandle, BodyId>,
    /// Maps our body ids to rapier handles.
    body_handles: HashMap<BodyId, RigidBodyHandle>,
    /// Fixed body used as the far end of world-anchored constraints.
    ground: Option<RigidBodyHandle>,
    next_body_id: u64,
    next_part_id: u64,
    next_constraint_id: u64,
    /// Simulated time in milliseconds.
    timestamp: f64,
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("bodies", &self.bodies.len())
            .field("constraints", &self.constraints.len())
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Create a physics world with the given gravity.
    pub fn new(gravity_x: f64, gravity_y: f64) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity_x as Real, gravity_y as Real],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies: Vec::new(),
            constraints: Vec::new(),
            collider_to_body: HashMap::new(),
            body_handles: HashMap::new(),
            ground: None,
            next_body_id: 1,
            next_part_id: 1,
            next_constraint_id: 1,
            timestamp: 0.0,
        }
    }

    /// Physics world without gravity.
    pub fn new_zero_gravity() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Add a body and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EmptyBody`] when the descriptor has no parts
    /// and [`SceneError::DegenerateShape`] when a polygon part has no
    /// convex hull.
    pub fn add_body(&mut self, desc: BodyDesc) -> Result<BodyId, SceneError> {
        let id = BodyId(self.next_body_id);
        if desc.parts.is_empty() {
            return Err(SceneError::EmptyBody { body: id });
        }

        // Build every collider first so a degenerate part leaves no trace.
        let mut colliders = Vec::with_capacity(desc.parts.len());
        for part in &desc.parts {
            let builder = match &part.shape {
                ColliderShape::Box {
                    half_width,
                    half_height,
                } => ColliderBuilder::cuboid(*half_width as Real, *half_height as Real),
                ColliderShape::Circle { radius } => ColliderBuilder::ball(*radius as Real),
                ColliderShape::Polygon { points } => {
                    let points: Vec<Point<Real>> = points
                        .iter()
                        .map(|p| point![p.x as Real, p.y as Real])
                        .collect();
                    ColliderBuilder::convex_hull(&points)
                        .ok_or(SceneError::DegenerateShape { body: id })?
                }
            };
            let collider = builder
                .translation(vector![part.offset.x as Real, part.offset.y as Real])
                .restitution(desc.restitution as Real)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build();
            colliders.push((collider, part.render.clone()));
        }

        let translation = vector![desc.position.x as Real, desc.position.y as Real];
        let linvel = vector![desc.velocity.x as Real, desc.velocity.y as Real];
        let rb = match desc.body_type {
            PhysicsBodyType::Dynamic => RigidBodyBuilder::dynamic().linvel(linvel),
            PhysicsBodyType::Kinematic => RigidBodyBuilder::kinematic_velocity_based().linvel(linvel),
            PhysicsBodyType::Static => RigidBodyBuilder::fixed(),
        }
        .translation(translation)
        .rotation(desc.angle as Real)
        .build();

        let mut internal = internal_edge_flags(id, &colliders).into_iter();
        let handle = self.rigid_body_set.insert(rb);
        let mut parts = Vec::with_capacity(colliders.len());
        for (collider, render) in colliders {
            let collider_handle =
                self.collider_set
                    .insert_with_parent(collider, handle, &mut self.rigid_body_set);
            self.collider_to_body.insert(collider_handle, id);
            parts.push(PartEntry {
                id: self.next_part_id,
                handle: collider_handle,
                render,
                internal: internal.next().unwrap_or_default(),
            });
            self.next_part_id += 1;
        }

        tracing::debug!(body = id.0, parts = parts.len(), "added body");
        self.next_body_id += 1;
        self.body_handles.insert(id, handle);
        self.bodies.push(BodyEntry {
            id,
            handle,
            label: desc.label,
            render: desc.render,
            parts,
        });
        Ok(id)
    }

    /// Add a spring constraint and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownBody`] when either body is not in this
    /// world.
    pub fn add_constraint(&mut self, desc: ConstraintDesc) -> Result<u64, SceneError> {
        let handle_a = *self
            .body_handles
            .get(&desc.body_a)
            .ok_or(SceneError::UnknownBody { body: desc.body_a })?;
        let handle_b = match desc.body_b {
            Some(body_b) => *self
                .body_handles
                .get(&body_b)
                .ok_or(SceneError::UnknownBody { body: body_b })?,
            None => self.ground(),
        };

        let anchor_a = point![desc.point_a.x as Real, desc.point_a.y as Real];
        let anchor_b = point![desc.point_b.x as Real, desc.point_b.y as Real];
        let rest_length = self
            .world_point(handle_a, anchor_a)
            .sub(self.world_point(handle_b, anchor_b))
            .magnitude();

        let joint = SpringJointBuilder::new(
            rest_length as Real,
            desc.stiffness as Real,
            desc.damping as Real,
        )
        .local_anchor1(anchor_a)
        .local_anchor2(anchor_b);
        let handle = self
            .impulse_joint_set
            .insert(handle_a, handle_b, joint, true);

        let id = self.next_constraint_id;
        tracing::debug!(constraint = id, rest_length, "added spring");
        self.next_constraint_id += 1;
        self.constraints.push(ConstraintEntry {
            id,
            body_a: desc.body_a,
            body_b: desc.body_b,
            handle,
            render: desc.render,
        });
        Ok(id)
    }

    fn ground(&mut self) -> RigidBodyHandle {
        if let Some(ground) = self.ground {
            return ground;
        }
        let ground = self.rigid_body_set.insert(RigidBodyBuilder::fixed().build());
        self.ground = Some(ground);
        ground
    }

    fn world_point(&self, handle: RigidBodyHandle, local: Point<Real>) -> Vector {
        match self.rigid_body_set.get(handle) {
            Some(rb) => {
                let p = rb.position() * local;
                Vector::new(p.x as f64, p.y as f64)
            }
            None => Vector::new(local.x as f64, local.y as f64),
        }
    }

    /// Step the simulation by `dt` seconds.
    ///
    /// Returns the collisions that started during the step, sorted by
    /// `(min, max)` body id.
    pub fn step(&mut self, dt: f64) -> Vec<CollisionPair> {
        self.integration_params.dt = dt as Real;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );
        self.timestamp += dt * 1000.0;

        let mut collisions = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                let a = self.collider_to_body.get(&h1).copied();
                let b = self.collider_to_body.get(&h2).copied();
                if let (Some(body_a), Some(body_b)) = (a, b) {
                    collisions.push(CollisionPair { body_a, body_b });
                }
            }
        }
        collisions.sort_by_key(|c| (c.body_a.min(c.body_b), c.body_a.max(c.body_b)));
        tracing::trace!(timestamp = self.timestamp, collisions = collisions.len(), "stepped");
        collisions
    }

    /// Read the current simulation state into a renderable [`Scene`].
    pub fn snapshot(&self) -> Scene {
        let mut world = Composite::new(0, "World");
        world.bodies = self
            .bodies
            .iter()
            .filter_map(|entry| self.snapshot_body(entry))
            .collect();

        let index: HashMap<BodyId, &Body> = world.bodies.iter().map(|b| (b.id, b)).collect();
        world.constraints = self
            .constraints
            .iter()
            .filter_map(|entry| self.snapshot_constraint(entry, &index))
            .collect();

        let pairs = self.snapshot_pairs(&index);

        Scene {
            world,
            pairs,
            timestamp: self.timestamp,
            enable_sleeping: true,
        }
    }

    fn snapshot_body(&self, entry: &BodyEntry) -> Option<Body> {
        let rb = self.rigid_body_set.get(entry.handle)?;
        let parts: Vec<Part> = entry
            .parts
            .iter()
            .filter_map(|p| self.snapshot_part(p))
            .collect();

        let angle = rb.rotation().angle() as f64;
        let mut body = Body::from_flagged_parts(entry.id, parts).ok()?.with_angle(angle);
        let translation = rb.translation();
        body.position = Vector::new(translation.x as f64, translation.y as f64);
        let linvel = rb.linvel();
        body.velocity = Vector::new(linvel.x as f64, linvel.y as f64);
        body.is_sleeping = rb.is_sleeping();
        body.is_static = rb.is_fixed();
        body.label = entry.label.clone();
        body.render = entry.render.clone();
        if let Some(aggregate) = body.parts.iter_mut().find(|p| p.is_aggregate) {
            aggregate.position = body.position;
        }
        Some(body)
    }

    fn snapshot_part(&self, entry: &PartEntry) -> Option<Part> {
        let collider = self.collider_set.get(entry.handle)?;
        let mut part = part_geometry(entry.id, collider.shape(), collider.position())?;
        for (vertex, &internal) in part.vertices.iter_mut().zip(&entry.internal) {
            vertex.is_internal = internal;
        }

        let aabb = collider.compute_aabb();
        part.bounds = Bounds::new(
            Vector::new(aabb.mins.x as f64, aabb.mins.y as f64),
            Vector::new(aabb.maxs.x as f64, aabb.maxs.y as f64),
        );
        part.render = entry.render.clone();
        Some(part)
    }

    fn snapshot_constraint(
        &self,
        entry: &ConstraintEntry,
        index: &HashMap<BodyId, &Body>,
    ) -> Option<Constraint> {
        let joint = self.impulse_joint_set.get(entry.handle)?;
        let world_a = self.world_point(joint.body1, joint.data.local_anchor1());
        let world_b = self.world_point(joint.body2, joint.data.local_anchor2());

        // Anchors are stored as offsets from the body position.
        let point_a = match index.get(&entry.body_a) {
            Some(body) => world_a.sub(body.position),
            None => world_a,
        };
        let point_b = match entry.body_b.and_then(|id| index.get(&id)) {
            Some(body) => world_b.sub(body.position),
            None => world_b,
        };

        Some(Constraint {
            id: entry.id,
            body_a: Some(entry.body_a),
            body_b: entry.body_b,
            point_a,
            point_b,
            render: entry.render.clone(),
        })
    }

    fn snapshot_pairs(&self, index: &HashMap<BodyId, &Body>) -> Vec<Pair> {
        let pair_body = |id: BodyId| {
            index.get(&id).map(|b| PairBody {
                id,
                position: b.position,
                is_static: b.is_static,
            })
        };

        let mut pairs = Vec::new();
        for contact in self.narrow_phase.contact_pairs() {
            if !contact.has_any_active_contact {
                continue;
            }
            let a = self.collider_to_body.get(&contact.collider1).copied();
            let b = self.collider_to_body.get(&contact.collider2).copied();
            let (Some(a), Some(b)) = (a, b) else {
                continue;
            };
            let (Some(body_a), Some(body_b)) = (pair_body(a), pair_body(b)) else {
                continue;
            };

            for manifold in &contact.manifolds {
                if manifold.data.solver_contacts.is_empty() {
                    continue;
                }
                let contacts: Vec<Vector> = manifold
                    .data
                    .solver_contacts
                    .iter()
                    .map(|c| Vector::new(c.point.x as f64, c.point.y as f64))
                    .collect();
                let depth = manifold
                    .data
                    .solver_contacts
                    .iter()
                    .map(|c| -(c.dist as f64))
                    .fold(0.0_f64, f64::max);
                let normal = Vector::new(manifold.data.normal.x as f64, manifold.data.normal.y as f64);
                pairs.push(Pair {
                    id: 0,
                    body_a,
                    body_b,
                    is_active: true,
                    contacts,
                    normal,
                    depth,
                    penetration: normal.mult(depth),
                });
            }
        }

        pairs.sort_by_key(|p| (p.body_a.id.min(p.body_b.id), p.body_a.id.max(p.body_b.id)));
        for (i, pair) in pairs.iter_mut().enumerate() {
            pair.id = i as u64 + 1;
        }
        pairs
    }

    /// Simulated time in milliseconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Number of bodies added through [`add_body`](Self::add_body).
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Whether a body id belongs to this world.
    pub fn has_body(&self, id: BodyId) -> bool {
        self.body_handles.contains_key(&id)
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Vertices of a collider shape placed by `iso`, in the order the renderer
/// walks them.
fn part_geometry(id: u64, shape: &dyn Shape, iso: &Isometry<Real>) -> Option<Part> {
    let centre = Vector::new(iso.translation.vector.x as f64, iso.translation.vector.y as f64);
    let angle = iso.rotation.angle() as f64;

    let mut part = if let Some(ball) = shape.as_ball() {
        let mut part = Part::circle(id, centre, ball.radius as f64, CIRCLE_SIDES);
        // keep the first vertex on the rotated x axis so spin is visible
        for v in &mut part.vertices {
            let rotated = Vector::new(v.x, v.y).sub(centre).rotate(angle).add(centre);
            v.x = rotated.x;
            v.y = rotated.y;
        }
        part
    } else {
        let local: Vec<Point<Real>> = if let Some(cuboid) = shape.as_cuboid() {
            let he = cuboid.half_extents;
            vec![
                point![-he.x, -he.y],
                point![he.x, -he.y],
                point![he.x, he.y],
                point![-he.x, he.y],
            ]
        } else if let Some(polygon) = shape.as_convex_polygon() {
            polygon.points().to_vec()
        } else {
            return None;
        };
        let placed: Vec<Vector> = local
            .iter()
            .map(|p| {
                let w = iso * p;
                Vector::new(w.x as f64, w.y as f64)
            })
            .collect();
        let mut part = Part::polygon(id, &placed);
        part.position = centre;
        part
    };
    part.angle = angle;
    Some(part)
}

/// Internal-edge flags per collider, computed once in the body frame.
fn internal_edge_flags(id: BodyId, colliders: &[(Collider, PartRender)]) -> Vec<Vec<bool>> {
    if colliders.len() < 2 {
        return Vec::new();
    }
    let local: Option<Vec<Part>> = colliders
        .iter()
        .enumerate()
        .map(|(i, (collider, _))| part_geometry(i as u64, collider.shape(), collider.position()))
        .collect();
    let Some(body) = local.and_then(|parts| Body::compound(id, parts).ok()) else {
        return Vec::new();
    };
    body.drawable_parts()
        .map(|part| part.vertices.iter().map(|v| v.is_internal).collect())
        .collect()
}

/// Rectangle part descriptor.
pub fn box_part(width: f64, height: f64) -> PartDesc {
    PartDesc::new(ColliderShape::Box {
        half_width: width / 2.0,
        half_height: height / 2.0,
    })
}

/// Circle part descriptor.
pub fn circle_part(radius: f64) -> PartDesc {
    PartDesc::new(ColliderShape::Circle { radius })
}

/// Regular polygon part descriptor.
pub fn polygon_part(sides: usize, radius: f64) -> PartDesc {
    let sides = sides.max(3);
    let points = (0..sides)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / sides as f64;
            Vector::new(radius * theta.cos(), radius * theta.sin())
        })
        .collect();
    PartDesc::new(ColliderShape::Polygon { points })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
