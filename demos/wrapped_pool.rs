//! Elastic circles drifting on a toroidal layer: bodies leaving one edge
//! re-enter on the opposite one, and seam-straddling contacts still resolve.

use std::cell::RefCell;
use std::rc::Rc;

use quadwrap::{Behavior, Entity, EntityId, Layer, PhysicsConfig, PhysicsWorld, Vec2};

struct BounceCounter {
    bounces: Rc<RefCell<u32>>,
}

impl Behavior for BounceCounter {
    fn collide(
        &mut self,
        _world: &mut PhysicsWorld,
        _id: EntityId,
        _other: EntityId,
        _point: Vec2,
        _normal: Vec2,
        force: f32,
        _now: f32,
        _dt: f32,
    ) {
        if force > 0.0 {
            *self.bounces.borrow_mut() += 1;
        }
    }
}

fn main() {
    env_logger::init();

    let config = PhysicsConfig {
        gravity_constant: 0.0,
        ..Default::default()
    };
    let mut world = PhysicsWorld::new(Layer::wrapped(80.0), config);
    let bounces = Rc::new(RefCell::new(0));

    for i in 0..16 {
        let angle = i as f32 * std::f32::consts::TAU / 16.0;
        world.add_entity(
            Entity::new(Vec2::from_angle(angle) * 30.0, 1.5)
                .with_velocity(-Vec2::from_angle(angle) * 12.0)
                .with_elasticity(0.9)
                .with_behavior(BounceCounter {
                    bounces: bounces.clone(),
                }),
        );
    }

    let dt = 1.0 / 60.0;
    for _ in 0..1200 {
        world.process_frame(dt);
    }

    println!(
        "after {:.0} s: {} impulse contacts across {} bodies",
        world.clock(),
        bounces.borrow(),
        world.len()
    );
    for id in world.entity_ids() {
        let e = world.entity(id).unwrap();
        println!(
            "  body at ({:>6.2}, {:>6.2})  speed {:>5.2}",
            e.position.x,
            e.position.y,
            e.velocity.length()
        );
    }
}
