//! Collision-aware traversals layered on the plain quadtree.

use std::collections::HashSet;

use glam::Vec2;

use crate::{
    core::entity::{CollisionType, Entity, Layer},
    dynamics::contact::{self, CollisionEvent},
    spatial::quadtree::{NodeIndex, OwnerSlot, QuadTree},
    utils::{
        allocator::{Arena, EntityId},
        math,
    },
};

/// One entity touched by a line trace, keyed by earliest intersection time.
#[derive(Debug, Clone, Copy)]
pub struct TraceHit {
    /// Parametric time along the swept segment, in `[0, 1]`.
    pub time: f32,
    pub entity: EntityId,
}

/// Quadtree specialization for collision queries: overlap tests, capsule
/// sweeps, area enumeration, and per-entity collision-candidate discovery,
/// each with a toroidal twin.
pub struct CollisionTree {
    tree: QuadTree,
}

impl CollisionTree {
    pub fn new(center: Vec2, half_extent: f32, depth: u32) -> Self {
        Self {
            tree: QuadTree::new(center, half_extent, depth, OwnerSlot::Collision),
        }
    }

    pub fn tree(&self) -> &QuadTree {
        &self.tree
    }

    pub fn insert(&mut self, arena: &mut Arena<Entity>, id: EntityId) -> NodeIndex {
        self.tree.insert(arena, id)
    }

    pub fn remove(&mut self, arena: &mut Arena<Entity>, id: EntityId) {
        self.tree.remove(arena, id)
    }

    pub fn reinsert(&mut self, arena: &mut Arena<Entity>, id: EntityId) -> NodeIndex {
        self.tree.reinsert(arena, id)
    }

    pub fn clear(&mut self, arena: &mut Arena<Entity>) {
        self.tree.clear(arena)
    }

    /// Does the query circle overlap any solid entity (or any non-solid one
    /// too, when `include_nonsolid` is set)?
    pub fn area_overlaps_any_entity(
        &self,
        arena: &Arena<Entity>,
        center: Vec2,
        radius: f32,
        include_nonsolid: bool,
    ) -> bool {
        self.overlap_search(arena, self.tree.root(), center, radius, include_nonsolid)
    }

    pub fn area_overlaps_any_entity_wrapped(
        &self,
        arena: &Arena<Entity>,
        center: Vec2,
        radius: f32,
        include_nonsolid: bool,
        side: f32,
    ) -> bool {
        if self.overlap_search(arena, self.tree.root(), center, radius, include_nonsolid) {
            return true;
        }
        math::wrap_offsets(side).into_iter().any(|offset| {
            self.overlap_search(
                arena,
                self.tree.root(),
                center + offset,
                radius,
                include_nonsolid,
            )
        })
    }

    /// Sweeps a capsule (segment thickened by `radius`) through the index.
    /// Hits come back ordered by time with at most one entry per entity, so
    /// the front of the list is the first ray-cast hit.
    pub fn line_trace(
        &self,
        arena: &Arena<Entity>,
        start: Vec2,
        dir: Vec2,
        radius: f32,
        include_nonsolid: bool,
    ) -> Vec<TraceHit> {
        let mut hits = Vec::new();
        self.line_search(
            arena,
            self.tree.root(),
            start,
            dir,
            radius,
            include_nonsolid,
            &mut hits,
        );
        Self::finish_trace(&mut hits);
        hits
    }

    pub fn line_trace_wrapped(
        &self,
        arena: &Arena<Entity>,
        start: Vec2,
        dir: Vec2,
        radius: f32,
        include_nonsolid: bool,
        side: f32,
    ) -> Vec<TraceHit> {
        let mut hits = Vec::new();
        self.line_search(
            arena,
            self.tree.root(),
            start,
            dir,
            radius,
            include_nonsolid,
            &mut hits,
        );
        for offset in math::wrap_offsets(side) {
            self.line_search(
                arena,
                self.tree.root(),
                start + offset,
                dir,
                radius,
                include_nonsolid,
                &mut hits,
            );
        }
        Self::finish_trace(&mut hits);
        hits
    }

    /// Appends every eligible entity whose bounding circle intersects the
    /// query circle. Order is unspecified.
    pub fn area_trace(
        &self,
        arena: &Arena<Entity>,
        center: Vec2,
        radius: f32,
        include_nonsolid: bool,
        out: &mut Vec<EntityId>,
    ) {
        self.area_search(
            arena,
            self.tree.root(),
            center,
            radius,
            include_nonsolid,
            out,
        );
    }

    pub fn area_trace_wrapped(
        &self,
        arena: &Arena<Entity>,
        center: Vec2,
        radius: f32,
        include_nonsolid: bool,
        side: f32,
        out: &mut Vec<EntityId>,
    ) {
        let before = out.len();
        self.area_search(
            arena,
            self.tree.root(),
            center,
            radius,
            include_nonsolid,
            out,
        );
        for offset in math::wrap_offsets(side) {
            self.area_search(
                arena,
                self.tree.root(),
                center + offset,
                radius,
                include_nonsolid,
                out,
            );
        }
        // an entity near a seam can be found through several images
        let mut tail = out.split_off(before);
        tail.sort_unstable();
        tail.dedup();
        out.append(&mut tail);
    }

    /// Finds every solid entity currently interpenetrating `id`, resolves the
    /// pair, and appends one event per pair.
    ///
    /// Only neighbors whose id compares greater than `id` are reported; with
    /// the caller invoking this once per entity per frame, that global order
    /// yields at most one event per unordered pair.
    pub fn collide_entity(
        &self,
        arena: &mut Arena<Entity>,
        id: EntityId,
        dt: f32,
        layer: Layer,
        events: &mut Vec<CollisionEvent>,
    ) {
        let (position, radius, collision) = match arena.get(id) {
            Some(e) => (e.position, e.radius, e.collision),
            None => return,
        };
        if collision != CollisionType::Solid {
            return;
        }

        let mut candidates = Vec::new();
        self.candidate_search(arena, self.tree.root(), id, position, radius, &mut candidates);
        if layer.wrapped {
            for offset in math::wrap_offsets(layer.side) {
                self.candidate_search(
                    arena,
                    self.tree.root(),
                    id,
                    position + offset,
                    radius,
                    &mut candidates,
                );
            }
            candidates.sort_unstable();
            candidates.dedup();
        }

        for other in candidates {
            if let Some(event) = contact::resolve_interpenetration(arena, id, other, dt, layer) {
                events.push(event);
            }
        }
    }

    fn eligible(entity: &Entity, include_nonsolid: bool) -> bool {
        match entity.collision {
            CollisionType::Solid => true,
            CollisionType::NonSolid => include_nonsolid,
            CollisionType::None => false,
        }
    }

    fn overlap_search(
        &self,
        arena: &Arena<Entity>,
        node: NodeIndex,
        center: Vec2,
        radius: f32,
        include_nonsolid: bool,
    ) -> bool {
        let n = self.tree.node(node);
        if n.subtree_count == 0 {
            return false;
        }
        if center.distance(n.center) >= radius + 2.0 * n.radius {
            return false;
        }

        for &id in &n.objects {
            let Some(entity) = arena.get(id) else {
                continue;
            };
            if !Self::eligible(entity, include_nonsolid) {
                continue;
            }
            if center.distance(entity.position) < radius + entity.radius {
                return true;
            }
        }

        match n.children {
            Some(children) => children.into_iter().any(|child| {
                self.overlap_search(arena, child, center, radius, include_nonsolid)
            }),
            None => false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn line_search(
        &self,
        arena: &Arena<Entity>,
        node: NodeIndex,
        start: Vec2,
        dir: Vec2,
        radius: f32,
        include_nonsolid: bool,
        hits: &mut Vec<TraceHit>,
    ) {
        let n = self.tree.node(node);
        if n.subtree_count == 0 {
            return;
        }
        if math::segment_point_distance(start, dir, n.center) >= radius + 2.0 * n.radius {
            return;
        }

        for &id in &n.objects {
            let Some(entity) = arena.get(id) else {
                continue;
            };
            if !Self::eligible(entity, include_nonsolid) {
                continue;
            }
            if let Some(time) =
                math::sweep_circle_toi(start, dir, entity.position, radius + entity.radius)
            {
                hits.push(TraceHit { time, entity: id });
            }
        }

        if let Some(children) = n.children {
            for child in children {
                self.line_search(arena, child, start, dir, radius, include_nonsolid, hits);
            }
        }
    }

    fn area_search(
        &self,
        arena: &Arena<Entity>,
        node: NodeIndex,
        center: Vec2,
        radius: f32,
        include_nonsolid: bool,
        out: &mut Vec<EntityId>,
    ) {
        let n = self.tree.node(node);
        if n.subtree_count == 0 {
            return;
        }
        if center.distance(n.center) >= radius + 2.0 * n.radius {
            return;
        }

        for &id in &n.objects {
            let Some(entity) = arena.get(id) else {
                continue;
            };
            if !Self::eligible(entity, include_nonsolid) {
                continue;
            }
            if center.distance(entity.position) < radius + entity.radius {
                out.push(id);
            }
        }

        if let Some(children) = n.children {
            for child in children {
                self.area_search(arena, child, center, radius, include_nonsolid, out);
            }
        }
    }

    fn candidate_search(
        &self,
        arena: &Arena<Entity>,
        node: NodeIndex,
        query: EntityId,
        center: Vec2,
        radius: f32,
        out: &mut Vec<EntityId>,
    ) {
        let n = self.tree.node(node);
        if n.subtree_count == 0 {
            return;
        }
        if center.distance(n.center) >= radius + 2.0 * n.radius {
            return;
        }

        for &id in &n.objects {
            if id <= query {
                continue;
            }
            let Some(entity) = arena.get(id) else {
                continue;
            };
            if entity.collision != CollisionType::Solid {
                continue;
            }
            if center.distance(entity.position) < radius + entity.radius {
                out.push(id);
            }
        }

        if let Some(children) = n.children {
            for child in children {
                self.candidate_search(arena, child, query, center, radius, out);
            }
        }
    }

    fn finish_trace(hits: &mut Vec<TraceHit>) {
        hits.sort_by(|a, b| a.time.total_cmp(&b.time).then(a.entity.cmp(&b.entity)));
        let mut seen = HashSet::new();
        hits.retain(|hit| seen.insert(hit.entity));
    }
}
