//! Arena-backed quadtree over circular objects.
//!
//! The tree is built once to a fixed depth and never restructured; objects
//! move between nodes through insert/remove/reinsert. All nodes live in one
//! contiguous arena and reference each other by index, and each entity keeps
//! its owning node's index for O(1) removal.

use glam::Vec2;
use log::warn;

use crate::{
    core::entity::Entity,
    utils::{
        allocator::{Arena, EntityId},
        math,
    },
};

/// Index of a node in the tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(pub(crate) u32);

/// Which back-reference field on [`Entity`] a tree writes its ownership into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSlot {
    Visibility,
    Collision,
}

pub(crate) struct Node {
    pub(crate) center: Vec2,
    pub(crate) half_extent: f32,
    /// Bounding-circle radius of the node's square, `half_extent · √2`.
    pub(crate) radius: f32,
    pub(crate) parent: Option<NodeIndex>,
    /// All four children present or none; the tree is leaf-or-fully-split.
    pub(crate) children: Option<[NodeIndex; 4]>,
    pub(crate) objects: Vec<EntityId>,
    /// Objects owned by this node and all descendants.
    pub(crate) subtree_count: usize,
    /// Static objects in the same subtree.
    pub(crate) static_count: usize,
}

pub struct QuadTree {
    nodes: Vec<Node>,
    slot: OwnerSlot,
}

impl QuadTree {
    /// Builds the full tree up front. `depth` counts levels, so `depth == 1`
    /// is a lone root. Malformed parameters are programming errors.
    pub fn new(center: Vec2, half_extent: f32, depth: u32, slot: OwnerSlot) -> Self {
        assert!(depth >= 1, "quadtree depth must be at least 1");
        assert!(half_extent > 0.0, "quadtree half extent must be positive");

        let mut tree = Self {
            nodes: Vec::new(),
            slot,
        };
        let root = tree.push_node(center, half_extent, None);
        tree.split_to_depth(root, depth - 1);
        tree
    }

    pub fn root(&self) -> NodeIndex {
        NodeIndex(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_center(&self, node: NodeIndex) -> Vec2 {
        self.nodes[node.0 as usize].center
    }

    pub fn node_radius(&self, node: NodeIndex) -> f32 {
        self.nodes[node.0 as usize].radius
    }

    pub fn subtree_count(&self, node: NodeIndex) -> usize {
        self.nodes[node.0 as usize].subtree_count
    }

    pub fn static_count(&self, node: NodeIndex) -> usize {
        self.nodes[node.0 as usize].static_count
    }

    /// Total objects owned by the whole tree.
    pub fn total_objects(&self) -> usize {
        self.nodes[0].subtree_count
    }

    /// Per-node counts, for invariant checks.
    pub fn counts(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes
            .iter()
            .map(|n| (n.subtree_count, n.static_count))
    }

    pub(crate) fn node(&self, node: NodeIndex) -> &Node {
        &self.nodes[node.0 as usize]
    }

    /// Places the object at the deepest node whose granularity fits its
    /// radius and whose area contains its position. Always succeeds; an
    /// object too large for the reached leaf has its radius clamped to the
    /// node's (lossy, the node is the coarsest granularity available).
    pub fn insert(&mut self, arena: &mut Arena<Entity>, id: EntityId) -> NodeIndex {
        self.insert_from(arena, id, self.root())
    }

    /// O(1) removal via the entity's stored owning-node back-reference.
    pub fn remove(&mut self, arena: &mut Arena<Entity>, id: EntityId) {
        let Some(entity) = arena.get_mut(id) else {
            return;
        };
        let Some(node) = entity.owner(self.slot) else {
            return;
        };
        entity.set_owner(self.slot, None);
        let is_static = entity.is_static;

        let objects = &mut self.nodes[node.0 as usize].objects;
        if let Some(pos) = objects.iter().position(|&o| o == id) {
            objects.swap_remove(pos);
        }
        self.adjust_counts(node, -1, if is_static { -1 } else { 0 });
    }

    /// Re-homes a moved or resized object. The descent restarts from the
    /// nearest ancestor of the old owner that still contains the new position
    /// and whose granularity still fits the radius, not from the root.
    pub fn reinsert(&mut self, arena: &mut Arena<Entity>, id: EntityId) -> NodeIndex {
        let (position, radius, current) = match arena.get(id) {
            Some(e) => (e.position, e.radius, e.owner(self.slot)),
            None => return self.root(),
        };
        let Some(old) = current else {
            return self.insert(arena, id);
        };

        self.remove(arena, id);

        let mut start = old;
        loop {
            let n = &self.nodes[start.0 as usize];
            let contains = (position.x - n.center.x).abs() <= n.half_extent
                && (position.y - n.center.y).abs() <= n.half_extent;
            if contains && radius * 2.0 <= n.radius {
                break;
            }
            match n.parent {
                Some(parent) => start = parent,
                None => break,
            }
        }
        self.insert_from(arena, id, start)
    }

    /// Does any indexed object's bounding circle overlap the query circle?
    pub fn area_overlaps_any_object(
        &self,
        arena: &Arena<Entity>,
        center: Vec2,
        radius: f32,
    ) -> bool {
        self.area_overlap_search(arena, self.root(), center, radius)
    }

    /// Wrapped twin: also runs the query translated by the layer side length,
    /// so a circle near a wrapped edge sees the opposite edge's objects.
    pub fn area_overlaps_any_object_wrapped(
        &self,
        arena: &Arena<Entity>,
        center: Vec2,
        radius: f32,
        side: f32,
    ) -> bool {
        if self.area_overlap_search(arena, self.root(), center, radius) {
            return true;
        }
        math::wrap_offsets(side)
            .into_iter()
            .any(|offset| self.area_overlap_search(arena, self.root(), center + offset, radius))
    }

    /// Drops all node contents without destructuring the tree.
    pub fn clear(&mut self, arena: &mut Arena<Entity>) {
        let slot = self.slot;
        for node in &mut self.nodes {
            for id in node.objects.drain(..) {
                if let Some(entity) = arena.get_mut(id) {
                    entity.set_owner(slot, None);
                }
            }
            node.subtree_count = 0;
            node.static_count = 0;
        }
    }

    fn insert_from(
        &mut self,
        arena: &mut Arena<Entity>,
        id: EntityId,
        start: NodeIndex,
    ) -> NodeIndex {
        let (position, radius, is_static) = match arena.get(id) {
            Some(e) => (e.position, e.radius, e.is_static),
            None => {
                debug_assert!(false, "insert of a stale entity id");
                return self.root();
            }
        };

        let mut node = start;
        loop {
            let n = &self.nodes[node.0 as usize];
            let Some(children) = n.children else {
                break;
            };
            // descend only while the finer granularity still fits the object
            let child_radius = n.radius * 0.5;
            if radius * 2.0 > child_radius {
                break;
            }
            let quadrant = usize::from(position.x >= n.center.x)
                + 2 * usize::from(position.y >= n.center.y);
            node = children[quadrant];
        }

        let node_radius = self.nodes[node.0 as usize].radius;
        if radius > node_radius {
            warn!(
                "object radius {radius} exceeds node radius {node_radius}; clamping on insert"
            );
            if let Some(entity) = arena.get_mut(id) {
                entity.radius = node_radius;
            }
        }

        self.nodes[node.0 as usize].objects.push(id);
        if let Some(entity) = arena.get_mut(id) {
            entity.set_owner(self.slot, Some(node));
        }
        self.adjust_counts(node, 1, if is_static { 1 } else { 0 });
        node
    }

    fn area_overlap_search(
        &self,
        arena: &Arena<Entity>,
        node: NodeIndex,
        center: Vec2,
        radius: f32,
    ) -> bool {
        let n = &self.nodes[node.0 as usize];
        if n.subtree_count == 0 {
            return false;
        }
        // Children's objects can extend beyond the node's own radius, hence
        // the factor 2 in the rejection inequality.
        if center.distance(n.center) >= radius + 2.0 * n.radius {
            return false;
        }

        for &id in &n.objects {
            if let Some(entity) = arena.get(id) {
                if center.distance(entity.position) < radius + entity.radius {
                    return true;
                }
            }
        }

        match n.children {
            Some(children) => children
                .into_iter()
                .any(|child| self.area_overlap_search(arena, child, center, radius)),
            None => false,
        }
    }

    fn adjust_counts(&mut self, node: NodeIndex, delta: i64, static_delta: i64) {
        let mut cursor = Some(node);
        while let Some(index) = cursor {
            let n = &mut self.nodes[index.0 as usize];
            n.subtree_count = (n.subtree_count as i64 + delta) as usize;
            n.static_count = (n.static_count as i64 + static_delta) as usize;
            cursor = n.parent;
        }
    }

    fn push_node(&mut self, center: Vec2, half_extent: f32, parent: Option<NodeIndex>) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(Node {
            center,
            half_extent,
            radius: half_extent * std::f32::consts::SQRT_2,
            parent,
            children: None,
            objects: Vec::new(),
            subtree_count: 0,
            static_count: 0,
        });
        index
    }

    fn split_to_depth(&mut self, node: NodeIndex, levels: u32) {
        if levels == 0 {
            return;
        }
        let (center, quarter) = {
            let n = &self.nodes[node.0 as usize];
            (n.center, n.half_extent * 0.5)
        };
        let offsets = [
            Vec2::new(-quarter, -quarter),
            Vec2::new(quarter, -quarter),
            Vec2::new(-quarter, quarter),
            Vec2::new(quarter, quarter),
        ];
        let children = offsets.map(|offset| self.push_node(center + offset, quarter, Some(node)));
        self.nodes[node.0 as usize].children = Some(children);
        for child in children {
            self.split_to_depth(child, levels - 1);
        }
    }
}
