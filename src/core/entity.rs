use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    core::behavior::Behavior,
    spatial::quadtree::{NodeIndex, OwnerSlot},
};

/// How an entity participates in collision detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CollisionType {
    /// Invisible to the collision index entirely.
    None,
    /// Indexed and reported by traces, but never receives impulses.
    NonSolid,
    /// Fully collidable.
    #[default]
    Solid,
}

/// Square simulation region the spatial indices are built over.
///
/// A wrapped layer has toroidal topology: every coordinate is implicitly
/// mod-reduced into `[-side/2, side/2)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Layer {
    pub side: f32,
    pub wrapped: bool,
}

impl Layer {
    pub fn open(side: f32) -> Self {
        Self {
            side,
            wrapped: false,
        }
    }

    pub fn wrapped(side: f32) -> Self {
        Self {
            side,
            wrapped: true,
        }
    }

    pub fn half_side(&self) -> f32 {
        self.side * 0.5
    }
}

/// A simulated body: one bounding circle plus kinematic state.
///
/// Mass and rotational inertia must stay strictly positive; the integrator
/// divides by both. Force and torque accumulate across a frame and are reset
/// to zero after velocity integration.
pub struct Entity {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
    /// Bounding-circle radius. May be clamped down on quadtree insertion if
    /// it exceeds the coarsest available node.
    pub radius: f32,
    pub mass: f32,
    pub inertia: f32,
    /// Restitution factor, clamped to be non-negative when used.
    pub elasticity: f32,
    pub force: Vec2,
    pub torque: f32,
    pub collision: CollisionType,
    pub applies_gravity: bool,
    pub reacts_to_gravity: bool,
    /// Static objects are tallied separately by the spatial index.
    pub is_static: bool,
    /// Simulation time at which the behavior's `think` next runs.
    pub next_think: f32,
    pub behavior: Option<Box<dyn Behavior>>,
    pub(crate) visibility_node: Option<NodeIndex>,
    pub(crate) collision_node: Option<NodeIndex>,
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            radius: 1.0,
            mass: 1.0,
            inertia: 1.0,
            elasticity: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            collision: CollisionType::Solid,
            applies_gravity: false,
            reacts_to_gravity: false,
            is_static: false,
            next_think: f32::INFINITY,
            behavior: None,
            visibility_node: None,
            collision_node: None,
        }
    }
}

impl Entity {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            radius,
            ..Default::default()
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_inertia(mut self, inertia: f32) -> Self {
        self.inertia = inertia;
        self
    }

    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity;
        self
    }

    pub fn with_collision(mut self, collision: CollisionType) -> Self {
        self.collision = collision;
        self
    }

    pub fn with_gravity_flags(mut self, applies: bool, reacts: bool) -> Self {
        self.applies_gravity = applies;
        self.reacts_to_gravity = reacts;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_behavior<B: Behavior + 'static>(mut self, behavior: B) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Schedules the first `think` callback.
    pub fn with_next_think(mut self, at: f32) -> Self {
        self.next_think = at;
        self
    }

    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }

    pub fn apply_torque(&mut self, torque: f32) {
        self.torque += torque;
    }

    /// The spatial node currently owning this entity in the given index.
    pub fn owner(&self, slot: OwnerSlot) -> Option<NodeIndex> {
        match slot {
            OwnerSlot::Visibility => self.visibility_node,
            OwnerSlot::Collision => self.collision_node,
        }
    }

    pub(crate) fn set_owner(&mut self, slot: OwnerSlot, node: Option<NodeIndex>) {
        match slot {
            OwnerSlot::Visibility => self.visibility_node = node,
            OwnerSlot::Collision => self.collision_node = node,
        }
    }
}
