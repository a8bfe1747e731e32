use glam::Vec2;

use crate::{utils::allocator::EntityId, world::PhysicsWorld};

/// Game-specific logic attached to an entity.
///
/// Callbacks run inline on the simulation thread. For the duration of a call
/// the world detaches the behavior box from its entity, so implementations
/// may mutate the world freely, including removing their own entity.
pub trait Behavior {
    /// Invoked once when the entity joins a world.
    fn on_added(&mut self, _world: &mut PhysicsWorld, _id: EntityId) {}

    /// Invoked when the simulation clock reaches the entity's scheduled think
    /// time. Returns the time at which `think` should run next.
    fn think(&mut self, _world: &mut PhysicsWorld, _id: EntityId, _now: f32) -> f32 {
        f32::INFINITY
    }

    /// Invoked once per resolved contact involving this entity, after
    /// integration. `normal` points toward this entity; the counterpart call
    /// on `other` receives the negated normal.
    #[allow(clippy::too_many_arguments)]
    fn collide(
        &mut self,
        _world: &mut PhysicsWorld,
        _id: EntityId,
        _other: EntityId,
        _point: Vec2,
        _normal: Vec2,
        _force: f32,
        _now: f32,
        _dt: f32,
    ) {
    }

    /// Collision veto: return `true` to skip impulse resolution against
    /// `other`. The contact is still reported with zero force.
    fn ignores(&self, _other: EntityId) -> bool {
        false
    }
}
