//! Pairwise gravity over a four-way entity partition.
//!
//! Entities are classified by their (applies-gravity, reacts-to-gravity)
//! flags into four disjoint sets so the per-frame pass only walks the four
//! cross products that can actually exchange force, instead of all pairs.

use std::collections::HashSet;

use glam::Vec2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    core::entity::{Entity, Layer},
    utils::{
        allocator::{Arena, EntityId},
        math,
    },
};

/// Read-only kinematic snapshot used by the pair evaluation.
#[derive(Debug, Clone, Copy)]
struct Sample {
    id: EntityId,
    position: Vec2,
    mass: f32,
    radius: f32,
}

/// Four-way disjoint partition of entities by gravity flags.
///
/// An id belongs to exactly one set at all times; membership changes exactly
/// on add/remove and on flag-change notification.
#[derive(Debug, Default)]
pub struct GravityPartition {
    applies_only: HashSet<EntityId>,
    reacts_only: HashSet<EntityId>,
    both: HashSet<EntityId>,
    neither: HashSet<EntityId>,
}

impl GravityPartition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: EntityId, applies: bool, reacts: bool) {
        debug_assert!(!self.tracks(id), "id inserted into the partition twice");
        self.set_for(applies, reacts).insert(id);
    }

    pub fn remove(&mut self, id: EntityId) {
        self.applies_only.remove(&id);
        self.reacts_only.remove(&id);
        self.both.remove(&id);
        self.neither.remove(&id);
    }

    /// Moves an id to the set matching its current flags.
    pub fn reclassify(&mut self, id: EntityId, applies: bool, reacts: bool) {
        self.remove(id);
        self.set_for(applies, reacts).insert(id);
    }

    pub fn tracks(&self, id: EntityId) -> bool {
        self.applies_only.contains(&id)
            || self.reacts_only.contains(&id)
            || self.both.contains(&id)
            || self.neither.contains(&id)
    }

    /// Set sizes as (applies-only, reacts-only, both, neither).
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.applies_only.len(),
            self.reacts_only.len(),
            self.both.len(),
            self.neither.len(),
        )
    }

    pub fn len(&self) -> usize {
        self.applies_only.len() + self.reacts_only.len() + self.both.len() + self.neither.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the four ordered cross products (applies×reacts, applies×both,
    /// both×both, both×reacts) and accumulates attraction into each sink's
    /// force accumulator. Self-pairs are skipped, as are pairs close enough
    /// that the inverse-square law would blow up at near-contact.
    pub fn accumulate(&self, arena: &mut Arena<Entity>, g: f32, layer: Layer, parallel: bool) {
        if g == 0.0 {
            return;
        }

        let applies = Self::samples(arena, &self.applies_only);
        let reacts = Self::samples(arena, &self.reacts_only);
        let both = Self::samples(arena, &self.both);

        let mut deltas = Vec::new();
        for (sources, sinks) in [
            (&applies, &reacts),
            (&applies, &both),
            (&both, &both),
            (&both, &reacts),
        ] {
            Self::cross_product(sources, sinks, g, layer, parallel, &mut deltas);
        }

        for (id, force) in deltas {
            if let Some(entity) = arena.get_mut(id) {
                entity.force += force;
            }
        }
    }

    fn set_for(&mut self, applies: bool, reacts: bool) -> &mut HashSet<EntityId> {
        match (applies, reacts) {
            (true, false) => &mut self.applies_only,
            (false, true) => &mut self.reacts_only,
            (true, true) => &mut self.both,
            (false, false) => &mut self.neither,
        }
    }

    fn samples(arena: &Arena<Entity>, set: &HashSet<EntityId>) -> Vec<Sample> {
        let mut samples: Vec<Sample> = set
            .iter()
            .filter_map(|&id| {
                arena.get(id).map(|e| Sample {
                    id,
                    position: e.position,
                    mass: e.mass,
                    radius: e.radius,
                })
            })
            .collect();
        // HashSet order varies run to run; sorting keeps the float
        // accumulation order stable
        samples.sort_unstable_by_key(|s| s.id);
        samples
    }

    fn cross_product(
        sources: &[Sample],
        sinks: &[Sample],
        g: f32,
        layer: Layer,
        parallel: bool,
        deltas: &mut Vec<(EntityId, Vec2)>,
    ) {
        if sources.is_empty() || sinks.is_empty() {
            return;
        }

        #[cfg(feature = "parallel")]
        if parallel {
            deltas.par_extend(sinks.par_iter().map(|sink| {
                let mut total = Vec2::ZERO;
                for source in sources {
                    if source.id != sink.id {
                        total += Self::pair_force(source, sink, g, layer);
                    }
                }
                (sink.id, total)
            }));
            return;
        }
        let _ = parallel;

        deltas.extend(sinks.iter().map(|sink| {
            let mut total = Vec2::ZERO;
            for source in sources {
                if source.id != sink.id {
                    total += Self::pair_force(source, sink, g, layer);
                }
            }
            (sink.id, total)
        }));
    }

    /// Attraction exerted on `sink` by `source`.
    fn pair_force(source: &Sample, sink: &Sample, g: f32, layer: Layer) -> Vec2 {
        let delta = if layer.wrapped {
            math::wrapped_delta(source.position, sink.position, layer.side)
        } else {
            source.position - sink.position
        };
        let dist_sq = delta.length_squared();
        if dist_sq <= 0.0 {
            return Vec2::ZERO;
        }
        let dist = dist_sq.sqrt();
        // near-contact guard: inside this range the collision response owns
        // the interaction
        if dist * std::f32::consts::FRAC_1_SQRT_2 < source.radius + sink.radius {
            return Vec2::ZERO;
        }
        delta * (g * source.mass * sink.mass / (dist_sq * dist))
    }
}
