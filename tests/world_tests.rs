use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use glam::Vec2;
use quadwrap::{
    Behavior, CollisionType, Entity, EntityId, Layer, PhysicsConfig, PhysicsWorld,
};

const DT: f32 = 1.0 / 60.0;

fn quiet_world() -> PhysicsWorld {
    let config = PhysicsConfig {
        gravity_constant: 0.0,
        ..Default::default()
    };
    PhysicsWorld::new(Layer::open(128.0), config)
}

#[test]
fn zero_dt_frame_is_a_paused_passthrough() {
    let mut w = quiet_world();
    let id = w.add_entity(
        Entity::new(Vec2::new(3.0, 4.0), 1.0).with_velocity(Vec2::new(10.0, 0.0)),
    );
    w.entity_mut(id).unwrap().apply_force(Vec2::new(5.0, 0.0));

    w.process_frame(0.0);

    let e = w.entity(id).unwrap();
    assert_eq!(e.position, Vec2::new(3.0, 4.0));
    assert_eq!(e.velocity, Vec2::new(10.0, 0.0));
    // queued force survives the paused frame
    assert_eq!(e.force, Vec2::new(5.0, 0.0));
    assert_eq!(w.clock(), 0.0);
}

#[test]
fn speed_is_clamped_during_the_frame() {
    let mut w = quiet_world();
    let id = w.add_entity(Entity::new(Vec2::ZERO, 1.0));
    w.entity_mut(id).unwrap().apply_force(Vec2::new(1.0e8, 0.0));

    w.process_frame(DT);
    assert!(w.entity(id).unwrap().velocity.length() <= 300.0 + 1e-3);
}

#[test]
fn moved_entities_stay_queryable_through_the_indices() {
    let mut w = quiet_world();
    let id = w.add_entity(
        Entity::new(Vec2::new(-40.0, 0.0), 1.0).with_velocity(Vec2::new(120.0, 0.0)),
    );

    for _ in 0..30 {
        w.process_frame(DT);
    }

    let position = w.entity(id).unwrap().position;
    assert!(position.x > 0.0, "entity did not travel: {position:?}");
    assert!(w.area_overlaps_any_entity(position, 0.5, false));
    assert!(!w.area_overlaps_any_entity(Vec2::new(-40.0, 0.0), 0.5, false));
}

#[test]
fn gravity_flag_changes_move_entities_between_partition_sets() {
    let mut w = quiet_world();
    let id = w.add_entity(Entity::new(Vec2::ZERO, 1.0).with_gravity_flags(true, false));
    assert_eq!(w.gravity_partition().counts(), (1, 0, 0, 0));

    w.entity_mut(id).unwrap().reacts_to_gravity = true;
    w.handle_changed_reacts_to_gravity(id);
    assert_eq!(w.gravity_partition().counts(), (0, 0, 1, 0));

    w.entity_mut(id).unwrap().applies_gravity = false;
    w.handle_changed_applies_gravity(id);
    assert_eq!(w.gravity_partition().counts(), (0, 1, 0, 0));

    w.remove_entity(id);
    assert!(w.gravity_partition().is_empty());
}

#[test]
fn reacts_only_entity_is_pulled_by_a_heavy_attractor() {
    let config = PhysicsConfig {
        gravity_constant: 1.0,
        ..Default::default()
    };
    let mut w = PhysicsWorld::new(Layer::open(128.0), config);
    let target = w.add_entity(Entity::new(Vec2::ZERO, 1.0).with_gravity_flags(false, true));
    w.add_entity(
        Entity::new(Vec2::new(20.0, 0.0), 1.0)
            .with_mass(1000.0)
            .with_gravity_flags(true, false),
    );

    w.process_frame(DT);
    assert!(w.entity(target).unwrap().velocity.x > 0.0);
}

#[test]
fn collision_type_change_updates_the_collision_index() {
    let mut w = quiet_world();
    let id = w.add_entity(Entity::new(Vec2::ZERO, 1.0));
    assert!(w.area_overlaps_any_entity(Vec2::ZERO, 0.5, false));

    w.entity_mut(id).unwrap().collision = CollisionType::None;
    w.handle_changed_collision_type(id);
    assert!(!w.area_overlaps_any_entity(Vec2::ZERO, 0.5, false));

    w.entity_mut(id).unwrap().collision = CollisionType::Solid;
    w.handle_changed_collision_type(id);
    assert!(w.area_overlaps_any_entity(Vec2::ZERO, 0.5, false));
}

#[test]
fn radius_change_rehomes_the_entity() {
    let mut w = quiet_world();
    let id = w.add_entity(Entity::new(Vec2::new(30.0, 30.0), 0.5));

    w.entity_mut(id).unwrap().radius = 40.0;
    w.handle_changed_radius(id);

    // the fatter circle now overlaps a query near the world center
    assert!(w.area_overlaps_any_entity(Vec2::ZERO, 5.0, false));
}

struct TickCounter {
    ticks: Rc<RefCell<u32>>,
    interval: f32,
}

impl Behavior for TickCounter {
    fn think(&mut self, _world: &mut PhysicsWorld, _id: EntityId, now: f32) -> f32 {
        *self.ticks.borrow_mut() += 1;
        now + self.interval
    }
}

#[test]
fn think_runs_when_scheduled_and_reschedules_itself() {
    let ticks = Rc::new(RefCell::new(0));
    let mut w = quiet_world();
    w.add_entity(
        Entity::new(Vec2::ZERO, 1.0)
            .with_behavior(TickCounter {
                ticks: ticks.clone(),
                interval: 0.1,
            })
            .with_next_think(0.0),
    );

    // 30 frames = 0.5 s; first think at t=1/60, then every 0.1 s
    for _ in 0..30 {
        w.process_frame(DT);
    }
    let count = *ticks.borrow();
    assert!((5..=6).contains(&count), "unexpected tick count {count}");
}

struct SelfDestruct;

impl Behavior for SelfDestruct {
    fn think(&mut self, world: &mut PhysicsWorld, id: EntityId, _now: f32) -> f32 {
        world.remove_entity(id);
        f32::INFINITY
    }
}

#[test]
fn think_may_remove_its_own_entity_mid_frame() {
    let mut w = quiet_world();
    let doomed = w.add_entity(
        Entity::new(Vec2::ZERO, 1.0)
            .with_behavior(SelfDestruct)
            .with_next_think(0.0),
    );
    let bystander = w.add_entity(Entity::new(Vec2::new(10.0, 0.0), 1.0));

    w.process_frame(DT);

    assert!(w.entity(doomed).is_none());
    assert!(w.entity(bystander).is_some());
    assert_eq!(w.len(), 1);
}

#[test]
fn line_trace_returns_hits_in_ray_order_without_duplicates() {
    let mut w = quiet_world();
    let near = w.add_entity(Entity::new(Vec2::new(10.0, 0.0), 1.0));
    let far = w.add_entity(Entity::new(Vec2::new(30.0, 0.0), 1.0));
    let off_path = w.add_entity(Entity::new(Vec2::new(20.0, 30.0), 1.0));

    let hits = w.line_trace(Vec2::new(-40.0, 0.0), Vec2::new(100.0, 0.0), 0.5, false);

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].entity, near);
    assert_eq!(hits[1].entity, far);
    assert!(hits[0].time < hits[1].time);
    assert!(hits.iter().all(|h| h.entity != off_path));
    assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.time)));
}

#[test]
fn wrapped_line_trace_crosses_the_seam() {
    let config = PhysicsConfig {
        gravity_constant: 0.0,
        ..Default::default()
    };
    let mut w = PhysicsWorld::new(Layer::wrapped(100.0), config);
    let beyond_seam = w.add_entity(Entity::new(Vec2::new(-48.0, 0.0), 1.0));

    // ray starts near the right edge and sweeps 10 units rightward
    let hits = w.line_trace(Vec2::new(45.0, 0.0), Vec2::new(10.0, 0.0), 0.5, false);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity, beyond_seam);
}

#[test]
fn area_trace_respects_the_nonsolid_switch() {
    let mut w = quiet_world();
    let solid = w.add_entity(Entity::new(Vec2::ZERO, 1.0));
    let soft = w.add_entity(
        Entity::new(Vec2::new(1.0, 0.0), 1.0).with_collision(CollisionType::NonSolid),
    );

    let solids_only = w.area_trace(Vec2::ZERO, 3.0, false);
    assert_eq!(solids_only, vec![solid]);

    let mut everyone = w.area_trace(Vec2::ZERO, 3.0, true);
    everyone.sort();
    assert_eq!(everyone, vec![solid, soft]);
}

#[test]
fn removal_tears_down_every_index() {
    let mut w = quiet_world();
    let id = w.add_entity(Entity::new(Vec2::ZERO, 1.0).with_gravity_flags(true, true));
    assert_eq!(w.len(), 1);

    let removed = w.remove_entity(id);
    assert!(removed.is_some());
    assert!(w.is_empty());
    assert!(!w.area_overlaps_any_entity(Vec2::ZERO, 5.0, false));
    assert_eq!(w.visibility_index().total_objects(), 0);

    // stale id is inert
    assert!(w.remove_entity(id).is_none());
    w.process_frame(DT);
}

#[test]
fn open_layer_confines_positions_to_the_square() {
    let mut w = quiet_world();
    let id = w.add_entity(
        Entity::new(Vec2::new(60.0, 0.0), 1.0).with_velocity(Vec2::new(120.0, 0.0)),
    );

    for _ in 0..60 {
        w.process_frame(DT);
        let p = w.entity(id).unwrap().position;
        assert!(p.x <= 64.0, "position escaped the open layer: {p:?}");
    }
    // still queryable at the edge it was pinned against
    assert!(w.area_overlaps_any_entity(Vec2::new(64.0, 0.0), 0.5, false));
}

#[test]
fn wrapped_world_keeps_positions_in_canonical_range() {
    let config = PhysicsConfig {
        gravity_constant: 0.0,
        ..Default::default()
    };
    let mut w = PhysicsWorld::new(Layer::wrapped(20.0), config);
    let id = w.add_entity(
        Entity::new(Vec2::new(9.0, 0.0), 0.5).with_velocity(Vec2::new(60.0, 0.0)),
    );

    for _ in 0..120 {
        w.process_frame(DT);
        let p = w.entity(id).unwrap().position;
        assert!((-10.0..10.0).contains(&p.x), "position escaped layer: {p:?}");
    }
}

#[test]
fn on_added_fires_when_the_entity_joins() {
    struct Greeter {
        seen: Rc<RefCell<Option<EntityId>>>,
    }
    impl Behavior for Greeter {
        fn on_added(&mut self, _world: &mut PhysicsWorld, id: EntityId) {
            *self.seen.borrow_mut() = Some(id);
        }
    }

    let seen = Rc::new(RefCell::new(None));
    let mut w = quiet_world();
    let id = w.add_entity(
        Entity::new(Vec2::ZERO, 1.0).with_behavior(Greeter { seen: seen.clone() }),
    );
    assert_eq!(*seen.borrow(), Some(id));
}

#[test]
fn clock_accumulates_frame_deltas() {
    let mut w = quiet_world();
    for _ in 0..60 {
        w.process_frame(DT);
    }
    assert_relative_eq!(w.clock(), 1.0, epsilon = 1e-4);
}
