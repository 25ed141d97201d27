//! # cadence_ecs
//!
//! The entity-component store the frame scheduler runs its systems over.
//!
//! This crate provides:
//!
//! - [`Entity`]: generational `u64` identifiers and the [`EntityAllocator`].
//! - [`Component`] trait: the contract all stored data must satisfy.
//! - [`Column`]: dense, chunked storage for a single component type.
//! - [`World`]: the store itself: spawn, despawn, attach, typed access.
//! - [`Query`]: lazy, restartable iteration over entities holding a set of
//!   component types.
//! - [`Access`]: declared read/write component sets used by the scheduler
//!   for conflict analysis.

pub mod access;
pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod storage;
pub mod world;

pub use access::Access;
pub use component::{Component, ComponentTypeId};
pub use entity::{Entity, EntityAllocator};
pub use error::StoreError;
pub use query::{Query, QueryData, QueryIter};
pub use storage::{CHUNK_SIZE, ChunkMut, ChunkRef, Column, ColumnRead, ComponentMut};
pub use world::World;
