//! A tiny two-body system: a heavy anchor and a satellite on a circular
//! orbit, stepped for ten simulated seconds.
//!
//! Run with `RUST_LOG=trace` to watch the per-pass timers.

use quadwrap::{Entity, Layer, PhysicsConfig, PhysicsWorld, Vec2};

fn main() {
    env_logger::init();

    let config = PhysicsConfig {
        gravity_constant: 1.0,
        ..Default::default()
    };
    let mut world = PhysicsWorld::new(Layer::open(512.0), config);

    world.add_entity(
        Entity::new(Vec2::ZERO, 2.0)
            .with_mass(10_000.0)
            .with_gravity_flags(true, false),
    );

    // circular orbit speed at r = 40: v = sqrt(G·M / r)
    let orbit_radius = 40.0;
    let speed = (1.0 * 10_000.0 / orbit_radius as f64).sqrt() as f32;
    let satellite = world.add_entity(
        Entity::new(Vec2::new(orbit_radius, 0.0), 0.5)
            .with_velocity(Vec2::new(0.0, speed))
            .with_gravity_flags(false, true),
    );

    let dt = 1.0 / 60.0;
    for frame in 0..600 {
        world.process_frame(dt);
        if frame % 60 == 0 {
            let e = world.entity(satellite).unwrap();
            println!(
                "t = {:>4.1}s  position = ({:>7.2}, {:>7.2})  r = {:>6.2}",
                world.clock(),
                e.position.x,
                e.position.y,
                e.position.length()
            );
        }
    }
}
