//! The per-frame orchestrator owning all simulation state.

use glam::Vec2;
use log::debug;

use crate::{
    config::PhysicsConfig,
    core::entity::{CollisionType, Entity, Layer},
    dynamics::{
        contact::{self, CollisionEvent},
        gravity::GravityPartition,
        integrator,
    },
    spatial::{
        collision_tree::{CollisionTree, TraceHit},
        quadtree::{OwnerSlot, QuadTree},
    },
    utils::{
        allocator::{Arena, EntityId},
        logging::{self, ScopedTimer},
        math,
    },
};

/// Central simulation container.
///
/// One `process_frame` call fully completes, including all behavior callback
/// invocations, before the next may begin; callbacks run inline and may
/// mutate the world, including removing the entity they belong to.
pub struct PhysicsWorld {
    entities: Arena<Entity>,
    layer: Layer,
    config: PhysicsConfig,
    visibility: QuadTree,
    collision: CollisionTree,
    gravity: GravityPartition,
    events: Vec<CollisionEvent>,
    clock: f32,
    parallel_enabled: bool,
}

impl PhysicsWorld {
    pub fn new(layer: Layer, config: PhysicsConfig) -> Self {
        assert!(layer.side > 0.0, "layer side length must be positive");

        Self {
            entities: Arena::new(),
            layer,
            config,
            visibility: QuadTree::new(
                Vec2::ZERO,
                layer.half_side(),
                config.tree_depth,
                OwnerSlot::Visibility,
            ),
            collision: CollisionTree::new(Vec2::ZERO, layer.half_side(), config.tree_depth),
            gravity: GravityPartition::new(),
            events: Vec::new(),
            clock: 0.0,
            parallel_enabled: cfg!(feature = "parallel"),
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.parallel_enabled = enabled;
    }

    pub fn parallel_enabled(&self) -> bool {
        self.parallel_enabled
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.ids().collect()
    }

    /// Read access to the visibility index, mainly for invariant checks.
    pub fn visibility_index(&self) -> &QuadTree {
        &self.visibility
    }

    /// Read access to the collision index.
    pub fn collision_index(&self) -> &CollisionTree {
        &self.collision
    }

    /// Read access to the gravity partition.
    pub fn gravity_partition(&self) -> &GravityPartition {
        &self.gravity
    }

    /// Inserts an entity into the world, both spatial indices, and the
    /// gravity partition, then fires its `on_added` callback.
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        debug_assert!(entity.mass > 0.0, "entity mass must be positive");
        debug_assert!(entity.inertia > 0.0, "entity inertia must be positive");

        entity.position = if self.layer.wrapped {
            math::wrap_point(entity.position, self.layer.side)
        } else {
            math::clamp_point(entity.position, self.layer.side)
        };
        let applies = entity.applies_gravity;
        let reacts = entity.reacts_to_gravity;
        let collidable = entity.collision != CollisionType::None;

        let id = self.entities.insert(entity);
        self.visibility.insert(&mut self.entities, id);
        if collidable {
            self.collision.insert(&mut self.entities, id);
        }
        self.gravity.insert(id, applies, reacts);
        debug!("entity {id:?} added (collidable: {collidable})");

        if let Some(mut behavior) = self
            .entities
            .get_mut(id)
            .and_then(|e| e.behavior.take())
        {
            behavior.on_added(self, id);
            self.restore_behavior(id, behavior);
        }
        id
    }

    /// Removes an entity from the world and both indices. Buffered events
    /// that still name the id are dropped at dispatch time.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.visibility.remove(&mut self.entities, id);
        self.collision.remove(&mut self.entities, id);
        self.gravity.remove(id);
        let removed = self.entities.remove(id);
        if removed.is_some() {
            debug!("entity {id:?} removed");
        }
        removed
    }

    /// Call after mutating an entity's radius: re-homes it in both indices.
    pub fn handle_changed_radius(&mut self, id: EntityId) {
        self.visibility.reinsert(&mut self.entities, id);
        if self
            .entities
            .get(id)
            .is_some_and(|e| e.collision != CollisionType::None)
        {
            self.collision.reinsert(&mut self.entities, id);
        }
    }

    /// Call after mutating an entity's collision type: adds it to or removes
    /// it from the collision index.
    pub fn handle_changed_collision_type(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        if entity.collision == CollisionType::None {
            self.collision.remove(&mut self.entities, id);
        } else if entity.owner(OwnerSlot::Collision).is_none() {
            self.collision.insert(&mut self.entities, id);
        }
    }

    /// Call after mutating the applies-gravity flag.
    pub fn handle_changed_applies_gravity(&mut self, id: EntityId) {
        self.reclassify_gravity(id);
    }

    /// Call after mutating the reacts-to-gravity flag.
    pub fn handle_changed_reacts_to_gravity(&mut self, id: EntityId) {
        self.reclassify_gravity(id);
    }

    /// Time-ordered capsule sweep against the collision index, honoring the
    /// layer's topology.
    pub fn line_trace(
        &self,
        start: Vec2,
        dir: Vec2,
        radius: f32,
        include_nonsolid: bool,
    ) -> Vec<TraceHit> {
        if self.layer.wrapped {
            self.collision.line_trace_wrapped(
                &self.entities,
                start,
                dir,
                radius,
                include_nonsolid,
                self.layer.side,
            )
        } else {
            self.collision
                .line_trace(&self.entities, start, dir, radius, include_nonsolid)
        }
    }

    /// Every eligible entity overlapping the query circle.
    pub fn area_trace(&self, center: Vec2, radius: f32, include_nonsolid: bool) -> Vec<EntityId> {
        let mut out = Vec::new();
        if self.layer.wrapped {
            self.collision.area_trace_wrapped(
                &self.entities,
                center,
                radius,
                include_nonsolid,
                self.layer.side,
                &mut out,
            );
        } else {
            self.collision
                .area_trace(&self.entities, center, radius, include_nonsolid, &mut out);
        }
        out
    }

    /// Does the query circle overlap any eligible entity in the layer?
    pub fn area_overlaps_any_entity(
        &self,
        center: Vec2,
        radius: f32,
        include_nonsolid: bool,
    ) -> bool {
        if self.layer.wrapped {
            self.collision.area_overlaps_any_entity_wrapped(
                &self.entities,
                center,
                radius,
                include_nonsolid,
                self.layer.side,
            )
        } else {
            self.collision
                .area_overlaps_any_entity(&self.entities, center, radius, include_nonsolid)
        }
    }

    /// Runs the configured interpenetration pass and returns the events it
    /// produced, without integrating or dispatching. Separating impulses are
    /// still accumulated into the entities' force accumulators.
    pub fn collect_contacts(&mut self, dt: f32) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        self.detect_interpenetrations(dt, &mut events);
        events
    }

    /// Advances the simulation by one frame.
    ///
    /// The pass order is a hard contract: interpenetration, gravity, thinks,
    /// velocity integration, position integration with re-indexing, then
    /// collision dispatch. A zero `dt` is a paused frame: the clock holds,
    /// no forces move, and only already-due thinks run.
    pub fn process_frame(&mut self, dt: f32) {
        let _frame_timer = ScopedTimer::with_budget("frame", logging::DEFAULT_FRAME_BUDGET_MS);
        self.clock += dt;

        if dt != 0.0 {
            {
                let _timer = ScopedTimer::new("frame::interpenetration");
                let mut events = std::mem::take(&mut self.events);
                self.detect_interpenetrations(dt, &mut events);
                self.events = events;
            }
            {
                let _timer = ScopedTimer::new("frame::gravity");
                self.gravity.accumulate(
                    &mut self.entities,
                    self.config.gravity_constant,
                    self.layer,
                    self.parallel_enabled,
                );
            }
        }

        self.run_thinks();

        {
            let _timer = ScopedTimer::new("frame::integrate");
            integrator::integrate_velocities(&mut self.entities, dt, self.config.max_speed);
            self.integrate_positions(dt);
        }

        self.dispatch_events(dt);
    }

    fn detect_interpenetrations(&mut self, dt: f32, events: &mut Vec<CollisionEvent>) {
        if self.config.use_spatial_index {
            let ids: Vec<EntityId> = self.entities.ids().collect();
            for id in ids {
                self.collision
                    .collide_entity(&mut self.entities, id, dt, self.layer, events);
            }
        } else {
            // all-pairs reference path; ids are ascending, so (a, b) is
            // already the canonical pair order
            let ids: Vec<EntityId> = self
                .entities
                .ids()
                .filter(|&id| {
                    self.entities
                        .get(id)
                        .is_some_and(|e| e.collision == CollisionType::Solid)
                })
                .collect();
            for (i, &a) in ids.iter().enumerate() {
                for &b in &ids[i + 1..] {
                    if let Some(event) =
                        contact::resolve_interpenetration(&mut self.entities, a, b, dt, self.layer)
                    {
                        events.push(event);
                    }
                }
            }
        }
    }

    fn run_thinks(&mut self) {
        let _timer = ScopedTimer::new("frame::think");
        let now = self.clock;
        // snapshot: callbacks may add or remove entities mid-iteration
        let ids: Vec<EntityId> = self.entities.ids().collect();
        for id in ids {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if entity.next_think > now {
                continue;
            }
            let Some(mut behavior) = entity.behavior.take() else {
                continue;
            };
            let next = behavior.think(self, id, now);
            if let Some(entity) = self.entities.get_mut(id) {
                entity.next_think = next;
            }
            self.restore_behavior(id, behavior);
        }
    }

    fn integrate_positions(&mut self, dt: f32) {
        if dt == 0.0 {
            return;
        }
        let ids: Vec<EntityId> = self.entities.ids().collect();
        for id in ids {
            let (moved, collidable) = {
                let Some(entity) = self.entities.get_mut(id) else {
                    continue;
                };
                let displacement = integrator::integrate_position(entity, dt, self.layer);
                (
                    displacement != Vec2::ZERO,
                    entity.collision != CollisionType::None,
                )
            };
            if moved {
                self.visibility.reinsert(&mut self.entities, id);
                if collidable {
                    self.collision.reinsert(&mut self.entities, id);
                }
            }
        }
    }

    fn dispatch_events(&mut self, dt: f32) {
        if self.events.is_empty() {
            return;
        }
        let _timer = ScopedTimer::new("frame::dispatch");
        let events = std::mem::take(&mut self.events);
        let now = self.clock;
        for event in &events {
            self.dispatch_to(event.a, event.b, event.point, event.normal, event.force, now, dt);
            self.dispatch_to(
                event.b,
                event.a,
                event.point,
                -event.normal,
                event.force,
                now,
                dt,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_to(
        &mut self,
        id: EntityId,
        other: EntityId,
        point: Vec2,
        normal: Vec2,
        force: f32,
        now: f32,
        dt: f32,
    ) {
        let Some(mut behavior) = self.entities.get_mut(id).and_then(|e| e.behavior.take())
        else {
            return;
        };
        behavior.collide(self, id, other, point, normal, force, now, dt);
        self.restore_behavior(id, behavior);
    }

    fn restore_behavior(&mut self, id: EntityId, behavior: Box<dyn crate::core::behavior::Behavior>) {
        if let Some(entity) = self.entities.get_mut(id) {
            // the callback may have installed a replacement behavior
            if entity.behavior.is_none() {
                entity.behavior = Some(behavior);
            }
        }
    }

    fn reclassify_gravity(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get(id) {
            self.gravity
                .reclassify(id, entity.applies_gravity, entity.reacts_to_gravity);
        }
    }
}
