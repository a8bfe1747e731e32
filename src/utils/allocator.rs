use serde::{Deserialize, Serialize};

/// Handle to an entity slot in the world arena.
///
/// Carries a generation stamp so a recycled slot can never be addressed
/// through a stale id. The derived `Ord` (slot index first) doubles as the
/// global traversal order used to deduplicate unordered collision pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Sentinel id that never refers to a live slot.
    pub const NULL: EntityId = EntityId {
        index: u32::MAX,
        generation: 0,
    };

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

enum Slot<T> {
    Vacant { next_free: Option<u32> },
    Occupied { value: T },
}

/// Generational arena handing out stable [`EntityId`]s.
///
/// Removal bumps the slot generation, so lookups through an id taken before
/// the removal return `None` instead of aliasing whatever reuses the slot.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    generations: Vec<u32>,
    free_head: Option<u32>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_head: None,
            live: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> EntityId {
        self.live += 1;
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let next = match slot {
                Slot::Vacant { next_free } => *next_free,
                Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };
            self.free_head = next;
            *slot = Slot::Occupied { value };
            return EntityId {
                index,
                generation: self.generations[index as usize],
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied { value });
        self.generations.push(0);
        EntityId {
            index,
            generation: 0,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.is_current(id)
            && matches!(self.slots.get(id.index()), Some(Slot::Occupied { .. }))
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        if !self.is_current(id) {
            return None;
        }
        match self.slots.get(id.index()) {
            Some(Slot::Occupied { value }) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        if !self.is_current(id) {
            return None;
        }
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied { value }) => Some(value),
            _ => None,
        }
    }

    /// Disjoint mutable borrow of two distinct slots, used by the pairwise
    /// interpenetration solver.
    pub fn get2_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut T, &mut T)> {
        if a.index() == b.index() || !self.is_current(a) || !self.is_current(b) {
            return None;
        }

        let (lo, hi, flipped) = if a.index() < b.index() {
            (a.index(), b.index(), false)
        } else {
            (b.index(), a.index(), true)
        };
        if hi >= self.slots.len() {
            return None;
        }

        let (left, right) = self.slots.split_at_mut(hi);
        let lo_value = match &mut left[lo] {
            Slot::Occupied { value } => value,
            Slot::Vacant { .. } => return None,
        };
        let hi_value = match &mut right[0] {
            Slot::Occupied { value } => value,
            Slot::Vacant { .. } => return None,
        };

        if flipped {
            Some((hi_value, lo_value))
        } else {
            Some((lo_value, hi_value))
        }
    }

    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        if !self.is_current(id) {
            return None;
        }
        let slot = self.slots.get_mut(id.index())?;
        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }

        let taken = std::mem::replace(
            slot,
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = Some(id.index() as u32);
        self.generations[id.index()] = self.generations[id.index()].wrapping_add(1);
        self.live -= 1;
        match taken {
            Slot::Occupied { value } => Some(value),
            Slot::Vacant { .. } => unreachable!(),
        }
    }

    /// Live ids in slot order, which is also `EntityId` order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            matches!(slot, Slot::Occupied { .. }).then(|| EntityId {
                index: index as u32,
                generation: self.generations[index],
            })
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied { value } => Some(value),
            Slot::Vacant { .. } => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| match slot {
            Slot::Occupied { value } => Some(value),
            Slot::Vacant { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn is_current(&self, id: EntityId) -> bool {
        self.generations
            .get(id.index())
            .is_some_and(|gen| *gen == id.generation())
    }
}
