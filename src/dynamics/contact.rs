//! Interpenetration resolution via a closed-form impulse solve.

use glam::Vec2;

use crate::{
    core::entity::{CollisionType, Entity, Layer},
    utils::{
        allocator::{Arena, EntityId},
        math,
    },
};

/// Transient record of one resolved contact, buffered for end-of-frame
/// dispatch and never reused across frames.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    pub a: EntityId,
    pub b: EntityId,
    /// Contact location, blended along the center line by the two radii.
    pub point: Vec2,
    /// Unit contact normal, oriented toward entity `a`.
    pub normal: Vec2,
    /// Impulse magnitude accumulated along the normal. Zero when the pair was
    /// separating, vetoed, or the solve had no real root.
    pub force: f32,
}

/// Resolves one currently-interpenetrating pair and reports the contact.
///
/// The impulse magnitude `F` is the root of the tangency condition after one
/// integration step: with `P = Pa − Pb`, `V = Va − Vb`, `M = 1/ma + 1/mb`,
/// `Q = P + dt·V` and `A = dt²·M·N`, requiring `|Q + F·A| = ra + rb` gives
/// `(A·A)F² + 2(Q·A)F + (Q·Q − r²) = 0`. One timestep then separates the
/// bodies exactly, so there is no jitter from repeated small corrections.
/// Degenerate cases fall back to zero force but still report the contact.
///
/// Returns `None` only when the circles do not overlap or an id is stale.
pub fn resolve_interpenetration(
    arena: &mut Arena<Entity>,
    a: EntityId,
    b: EntityId,
    dt: f32,
    layer: Layer,
) -> Option<CollisionEvent> {
    debug_assert!(a != b, "an entity cannot collide with itself");

    let vetoed = {
        let ea = arena.get(a)?;
        let eb = arena.get(b)?;
        ea.behavior.as_ref().is_some_and(|bh| bh.ignores(b))
            || eb.behavior.as_ref().is_some_and(|bh| bh.ignores(a))
    };

    let (ea, eb) = arena.get2_mut(a, b)?;
    debug_assert!(ea.mass > 0.0 && eb.mass > 0.0, "mass must stay positive");

    let delta = if layer.wrapped {
        math::wrapped_delta(ea.position, eb.position, layer.side)
    } else {
        ea.position - eb.position
    };
    let r = ea.radius + eb.radius;
    let dist_sq = delta.length_squared();
    if dist_sq >= r * r {
        return None;
    }

    let normal = if dist_sq > 0.0 {
        delta / dist_sq.sqrt()
    } else {
        // coincident centers: arbitrary but deterministic direction
        Vec2::X
    };

    // nearest periodic image of b, identical to b's position on open layers
    let b_image = ea.position - delta;
    let point = (ea.position * eb.radius + b_image * ea.radius) / r;

    let relative = ea.velocity - eb.velocity;
    let approaching = relative.dot(delta) < 0.0;
    let both_solid =
        ea.collision == CollisionType::Solid && eb.collision == CollisionType::Solid;

    let mut force = 0.0;
    if approaching && both_solid && !vetoed && dt > 0.0 {
        let inv_mass_sum = 1.0 / ea.mass + 1.0 / eb.mass;
        let q = delta + relative * dt;
        let a_vec = normal * (dt * dt * inv_mass_sum);

        let qa = a_vec.length_squared();
        let qb = 2.0 * q.dot(a_vec);
        let qc = q.length_squared() - r * r;
        force = math::positive_root_or_zero(math::solve_quadratic(qa, qb, qc));
        force *= 1.0 + ea.elasticity.max(0.0) * eb.elasticity.max(0.0);

        ea.force += normal * force;
        eb.force -= normal * force;
    }

    Some(CollisionEvent {
        a,
        b,
        point,
        normal,
        force,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn open_layer() -> Layer {
        Layer::open(128.0)
    }

    fn pair(arena: &mut Arena<Entity>) -> (EntityId, EntityId) {
        let a = arena.insert(
            Entity::new(Vec2::new(-0.5, 0.0), 1.0).with_velocity(Vec2::new(5.0, 0.0)),
        );
        let b = arena.insert(
            Entity::new(Vec2::new(0.5, 0.0), 1.0).with_velocity(Vec2::new(-5.0, 0.0)),
        );
        (a, b)
    }

    #[test]
    fn head_on_overlap_yields_a_separating_impulse() {
        let mut arena = Arena::new();
        let (a, b) = pair(&mut arena);

        let event = resolve_interpenetration(&mut arena, a, b, DT, open_layer()).unwrap();
        assert!(event.force > 0.0);
        assert_relative_eq!(event.normal.x.abs(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(event.normal.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(event.point.x, 0.0, epsilon = 1e-5);

        // applying the accumulated force for one step separates to tangency
        for id in [a, b] {
            let e = arena.get_mut(id).unwrap();
            e.velocity += e.force * (DT / e.mass);
            e.position += e.velocity * DT;
        }
        let pa = arena.get(a).unwrap().position;
        let pb = arena.get(b).unwrap().position;
        assert!(pa.distance(pb) >= 2.0 - 1e-3);
    }

    #[test]
    fn separating_pair_reports_contact_with_zero_force() {
        let mut arena = Arena::new();
        let (a, b) = pair(&mut arena);
        arena.get_mut(a).unwrap().velocity = Vec2::new(-5.0, 0.0);
        arena.get_mut(b).unwrap().velocity = Vec2::new(5.0, 0.0);

        let event = resolve_interpenetration(&mut arena, a, b, DT, open_layer()).unwrap();
        assert_eq!(event.force, 0.0);
        assert_eq!(arena.get(a).unwrap().force, Vec2::ZERO);
    }

    #[test]
    fn non_overlapping_pair_reports_nothing() {
        let mut arena = Arena::new();
        let a = arena.insert(Entity::new(Vec2::new(-5.0, 0.0), 1.0));
        let b = arena.insert(Entity::new(Vec2::new(5.0, 0.0), 1.0));
        assert!(resolve_interpenetration(&mut arena, a, b, DT, open_layer()).is_none());
    }

    #[test]
    fn coincident_centers_default_the_normal() {
        let mut arena = Arena::new();
        let a = arena.insert(Entity::new(Vec2::ZERO, 1.0));
        let b = arena.insert(Entity::new(Vec2::ZERO, 1.0));

        let event = resolve_interpenetration(&mut arena, a, b, DT, open_layer()).unwrap();
        assert_eq!(event.normal, Vec2::X);
    }

    #[test]
    fn restitution_scales_the_impulse() {
        let mut arena = Arena::new();
        let (a, b) = pair(&mut arena);
        let inelastic = resolve_interpenetration(&mut arena, a, b, DT, open_layer())
            .unwrap()
            .force;

        let mut arena = Arena::new();
        let (a, b) = pair(&mut arena);
        arena.get_mut(a).unwrap().elasticity = 1.0;
        arena.get_mut(b).unwrap().elasticity = 1.0;
        let elastic = resolve_interpenetration(&mut arena, a, b, DT, open_layer())
            .unwrap()
            .force;

        assert_relative_eq!(elastic, 2.0 * inelastic, epsilon = 1e-2);
    }

    #[test]
    fn wrapped_pair_collides_across_the_seam() {
        let mut arena = Arena::new();
        let layer = Layer::wrapped(20.0);
        let a = arena.insert(
            Entity::new(Vec2::new(-9.5, 0.0), 1.0).with_velocity(Vec2::new(-3.0, 0.0)),
        );
        let b = arena.insert(
            Entity::new(Vec2::new(9.5, 0.0), 1.0).with_velocity(Vec2::new(3.0, 0.0)),
        );

        let event = resolve_interpenetration(&mut arena, a, b, DT, layer).unwrap();
        assert!(event.force > 0.0);
        // normal points toward a through the seam
        assert_relative_eq!(event.normal.x, 1.0, epsilon = 1e-5);
    }
}
