//! Velocity and position integration over the entity arena.

use glam::Vec2;

use crate::{
    core::entity::{Entity, Layer},
    utils::{allocator::Arena, math},
};

/// Applies each entity's accumulated force and torque, resets the
/// accumulators, and clamps the resulting speed.
///
/// A zero `dt` leaves the accumulators untouched so a paused frame does not
/// silently discard forces queued by game logic.
pub fn integrate_velocities(arena: &mut Arena<Entity>, dt: f32, max_speed: f32) {
    if dt == 0.0 {
        return;
    }

    for entity in arena.iter_mut() {
        debug_assert!(entity.mass > 0.0, "entity mass must stay positive");
        debug_assert!(entity.inertia > 0.0, "entity inertia must stay positive");

        entity.velocity += entity.force * (dt / entity.mass);
        entity.angular_velocity += entity.torque * (dt / entity.inertia);
        entity.force = Vec2::ZERO;
        entity.torque = 0.0;

        let speed = entity.velocity.length();
        if speed > max_speed {
            entity.velocity *= max_speed / speed;
        }
    }
}

/// Advances one entity's pose by its velocity; returns the displacement so
/// the caller can decide whether a spatial re-insert is needed.
///
/// A wrapped layer mod-reduces the new position; an open layer clamps it to
/// the square, so the spatial indices never hold an out-of-layer position.
pub fn integrate_position(entity: &mut Entity, dt: f32, layer: Layer) -> Vec2 {
    let displacement = entity.velocity * dt;
    entity.position += displacement;
    entity.position = if layer.wrapped {
        math::wrap_point(entity.position, layer.side)
    } else {
        math::clamp_point(entity.position, layer.side)
    };
    entity.angle += entity.angular_velocity * dt;
    displacement
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn forces_become_velocity_and_reset() {
        let mut arena = Arena::new();
        let id = arena.insert(Entity::new(Vec2::ZERO, 1.0).with_mass(2.0));
        arena.get_mut(id).unwrap().apply_force(Vec2::new(120.0, 0.0));
        arena.get_mut(id).unwrap().apply_torque(4.0);

        integrate_velocities(&mut arena, 0.5, 1000.0);

        let e = arena.get(id).unwrap();
        assert_relative_eq!(e.velocity.x, 30.0);
        assert_relative_eq!(e.angular_velocity, 2.0);
        assert_eq!(e.force, Vec2::ZERO);
        assert_eq!(e.torque, 0.0);
    }

    #[test]
    fn speed_is_clamped_to_the_maximum() {
        let mut arena = Arena::new();
        let id = arena.insert(Entity::new(Vec2::ZERO, 1.0));
        arena.get_mut(id).unwrap().apply_force(Vec2::new(1.0e6, 0.0));

        integrate_velocities(&mut arena, 1.0, 300.0);
        assert_relative_eq!(arena.get(id).unwrap().velocity.length(), 300.0);
    }

    #[test]
    fn zero_dt_preserves_accumulated_forces() {
        let mut arena = Arena::new();
        let id = arena.insert(Entity::new(Vec2::ZERO, 1.0));
        arena.get_mut(id).unwrap().apply_force(Vec2::new(3.0, 0.0));

        integrate_velocities(&mut arena, 0.0, 300.0);
        assert_eq!(arena.get(id).unwrap().force, Vec2::new(3.0, 0.0));
        assert_eq!(arena.get(id).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn open_layer_position_integration_clamps_to_the_square() {
        let layer = Layer::open(10.0);
        let mut entity =
            Entity::new(Vec2::new(4.0, 0.0), 0.5).with_velocity(Vec2::new(10.0, 0.0));

        let displacement = integrate_position(&mut entity, 1.0, layer);
        assert_relative_eq!(displacement.x, 10.0);
        assert_relative_eq!(entity.position.x, 5.0);
    }

    #[test]
    fn wrapped_position_integration_reduces_into_the_layer() {
        let layer = Layer::wrapped(10.0);
        let mut entity = Entity::new(Vec2::new(4.5, 0.0), 0.5).with_velocity(Vec2::new(2.0, 0.0));

        let displacement = integrate_position(&mut entity, 1.0, layer);
        assert_relative_eq!(displacement.x, 2.0);
        assert_relative_eq!(entity.position.x, -3.5);
    }
}
