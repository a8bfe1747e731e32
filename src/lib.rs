//! Quadwrap – a 2D circle physics kernel for toroidal worlds.
//!
//! The crate pairs an arena-backed quadtree spatial index with a per-frame
//! physics integrator: interpenetration is resolved by a closed-form impulse
//! solve so one timestep separates overlapping bodies exactly, pairwise
//! gravity runs over a four-way entity partition, and ordered collision
//! events are delivered to game-specific [`Behavior`] callbacks. Layers may
//! be open squares or toroidally wrapped; every spatial query has a wrapped
//! twin.

pub mod config;
pub mod core;
pub mod dynamics;
pub mod spatial;
pub mod utils;
pub mod world;

pub use glam::Vec2;

pub use crate::config::PhysicsConfig;
pub use crate::core::{
    behavior::Behavior,
    entity::{CollisionType, Entity, Layer},
};
pub use crate::dynamics::{contact::CollisionEvent, gravity::GravityPartition};
pub use crate::spatial::{
    collision_tree::{CollisionTree, TraceHit},
    quadtree::{NodeIndex, OwnerSlot, QuadTree},
};
pub use crate::utils::allocator::{Arena, EntityId};
pub use crate::world::PhysicsWorld;
