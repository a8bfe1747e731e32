//! Scalar, quadratic, and toroidal math helpers layered on top of `glam`.

use glam::Vec2;

/// Mod-reduces a coordinate into the canonical wrapped range `[-side/2, side/2)`.
pub fn wrap_coord(x: f32, side: f32) -> f32 {
    let half = side * 0.5;
    (x + half).rem_euclid(side) - half
}

/// Mod-reduces both components of a point into the canonical wrapped square.
pub fn wrap_point(p: Vec2, side: f32) -> Vec2 {
    Vec2::new(wrap_coord(p.x, side), wrap_coord(p.y, side))
}

/// Clamps a point into the closed square `[-side/2, side/2]²` of an open
/// layer. Spatial-index containment requires every position to stay inside
/// the root square.
pub fn clamp_point(p: Vec2, side: f32) -> Vec2 {
    let half = side * 0.5;
    p.clamp(Vec2::splat(-half), Vec2::splat(half))
}

/// Shortest vector from `b` to `a` on a torus of the given side length.
///
/// Each component of the plain difference is reduced into `[-side/2, side/2)`,
/// which picks the nearest periodic image of `b`.
pub fn wrapped_delta(a: Vec2, b: Vec2, side: f32) -> Vec2 {
    wrap_point(a - b, side)
}

/// The eight non-zero axis and diagonal translations of a wrapped layer.
///
/// A query circle near a wrapped edge must also be tested against the nodes
/// on the opposite edge; re-running an unwrapped query at each of these
/// offsets covers every periodic image that can matter.
pub fn wrap_offsets(side: f32) -> [Vec2; 8] {
    [
        Vec2::new(side, 0.0),
        Vec2::new(-side, 0.0),
        Vec2::new(0.0, side),
        Vec2::new(0.0, -side),
        Vec2::new(side, side),
        Vec2::new(side, -side),
        Vec2::new(-side, side),
        Vec2::new(-side, -side),
    ]
}

/// Solves `a·x² + b·x + c = 0`, returning real roots in ascending order.
///
/// A vanishing quadratic coefficient degrades to the linear solution; a
/// negative discriminant returns `None`.
pub fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return None;
        }
        let x = -c / b;
        return Some((x, x));
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_disc = discriminant.sqrt();
    let x0 = (-b - sqrt_disc) / (2.0 * a);
    let x1 = (-b + sqrt_disc) / (2.0 * a);
    if x0 <= x1 {
        Some((x0, x1))
    } else {
        Some((x1, x0))
    }
}

/// Root selection for the impulse solve: the smaller positive root when one
/// exists, else the larger positive root, else zero.
pub fn positive_root_or_zero(roots: Option<(f32, f32)>) -> f32 {
    match roots {
        Some((lo, _)) if lo > 0.0 => lo,
        Some((_, hi)) if hi > 0.0 => hi,
        _ => 0.0,
    }
}

/// Distance from `point` to the segment running from `start` to `start + dir`.
pub fn segment_point_distance(start: Vec2, dir: Vec2, point: Vec2) -> f32 {
    let len_sq = dir.length_squared();
    if len_sq < 1e-12 {
        return start.distance(point);
    }
    let t = ((point - start).dot(dir) / len_sq).clamp(0.0, 1.0);
    (start + dir * t).distance(point)
}

/// Earliest `t ∈ [0, 1]` at which a point swept along `start + t·dir` comes
/// within `radius` of `center`. A start already inside reports `t = 0`.
pub fn sweep_circle_toi(start: Vec2, dir: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let oc = start - center;
    if oc.length_squared() <= radius * radius {
        return Some(0.0);
    }

    let a = dir.length_squared();
    let b = 2.0 * oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let (t0, t1) = solve_quadratic(a, b, c)?;
    if t1 < 0.0 || t0 > 1.0 {
        return None;
    }
    Some(t0.max(0.0))
}
