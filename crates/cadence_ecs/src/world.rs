//! The entity-component store.
//!
//! The [`World`] owns entity identities and one [`Column`] per component
//! type. It takes `&self` everywhere so it can be shared across worker
//! threads behind an `Arc`. The internal locks only keep Rust's aliasing rules
//! intact. Whether two systems may touch the same data at the same time is
//! decided by the scheduler from their declared [`Access`](crate::Access)
//! profiles, not by the store.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::trace;

use crate::component::{Component, ComponentTypeId};
use crate::entity::{Entity, EntityAllocator};
use crate::error::StoreError;
use crate::query::{Query, QueryData};
use crate::storage::{ChunkMut, ChunkRef, Column, ColumnRead, ComponentMut, ErasedColumn};

/// The shared entity-component store.
pub struct World {
    /// Entity ID allocator and liveness table.
    entities: RwLock<EntityAllocator>,
    /// One column per component type, created on first use.
    columns: DashMap<ComponentTypeId, Arc<dyn ErasedColumn>>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entity_count())
            .field("columns", &self.columns.len())
            .finish()
    }
}

impl World {
    /// Create a new empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(EntityAllocator::new()),
            columns: DashMap::new(),
        }
    }

    /// Allocate a new entity with no components attached.
    pub fn spawn(&self) -> Entity {
        self.entities.write().allocate()
    }

    /// Destroy an entity and release every component attached to it.
    ///
    /// Returns `false` (and does nothing) if the entity is already dead.
    pub fn despawn(&self, entity: Entity) -> bool {
        if !self.entities.write().free(entity) {
            return false;
        }

        let columns: Vec<Arc<dyn ErasedColumn>> =
            self.columns.iter().map(|c| Arc::clone(c.value())).collect();
        let released = columns
            .iter()
            .filter(|column| column.remove_entity(entity))
            .count();
        trace!(%entity, released, "despawned entity");
        true
    }

    /// Like [`World::despawn`], but reports a dead entity as an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownEntity`] if the entity is not alive.
    pub fn despawn_strict(&self, entity: Entity) -> Result<(), StoreError> {
        if self.despawn(entity) {
            Ok(())
        } else {
            Err(StoreError::UnknownEntity(entity))
        }
    }

    /// Returns `true` if the entity is alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.read().is_alive(entity)
    }

    /// Make slots of entities despawned so far available for reuse.
    ///
    /// Must only be called once no system can still hold a handle from the
    /// current cycle, i.e. after the scheduler's join.
    pub fn recycle_despawned(&self) -> usize {
        self.entities.write().recycle()
    }

    /// Explicitly create the column for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TypeNameCollision`] if a different Rust type
    /// already registered the same component name.
    pub fn register<T: Component>(&self) -> Result<Column<T>, StoreError> {
        let erased = Arc::clone(
            self.columns
                .entry(T::component_type_id())
                .or_insert_with(|| Arc::new(Column::<T>::new()))
                .value(),
        );
        erased
            .as_any()
            .downcast_ref::<Column<T>>()
            .cloned()
            .ok_or(StoreError::TypeNameCollision {
                name: T::type_name(),
            })
    }

    /// Returns the column for `T`, if one exists.
    #[must_use]
    pub fn column<T: Component>(&self) -> Option<Column<T>> {
        let erased = Arc::clone(self.columns.get(&T::component_type_id())?.value());
        erased.as_any().downcast_ref::<Column<T>>().cloned()
    }

    /// Store or overwrite component `T` for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEntity`] if the entity is dead, or
    /// [`StoreError::TypeNameCollision`] if `T`'s name is taken.
    pub fn attach<T: Component>(&self, entity: Entity, component: T) -> Result<(), StoreError> {
        let column = self.register::<T>()?;
        // Held across the insert: a despawn frees the slot under the write
        // lock before sweeping columns, so it either sees this row or we see
        // the entity dead.
        let entities = self.entities.read();
        if !entities.is_alive(entity) {
            return Err(StoreError::InvalidEntity(entity));
        }
        column.insert(entity, component);
        drop(entities);
        Ok(())
    }

    /// Remove component `T` from `entity`, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEntity`] if the entity is dead.
    pub fn detach<T: Component>(&self, entity: Entity) -> Result<Option<T>, StoreError> {
        if !self.is_alive(entity) {
            return Err(StoreError::InvalidEntity(entity));
        }
        Ok(self.column::<T>().and_then(|c| c.remove(entity)))
    }

    /// Returns a copy of component `T` for `entity`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.column::<T>()?.get(entity)
    }

    /// Returns a write guard on component `T` for `entity`.
    ///
    /// Only call this from a system whose access profile declares write
    /// access to `T`.
    #[must_use]
    pub fn get_mut<T: Component>(&self, entity: Entity) -> Option<ComponentMut<T>> {
        if !self.is_alive(entity) {
            return None;
        }
        self.column::<T>()?.get_mut(entity)
    }

    /// Returns `true` if `entity` is alive and has component `T`.
    #[must_use]
    pub fn contains<T: Component>(&self, entity: Entity) -> bool {
        self.is_alive(entity) && self.column::<T>().is_some_and(|c| c.contains(entity))
    }

    /// Returns a shared view over the whole column for `T`.
    #[must_use]
    pub fn read<T: Component>(&self) -> Option<ColumnRead<T>> {
        Some(self.column::<T>()?.read())
    }

    /// Returns the number of chunks in the column for `T` (0 if absent).
    #[must_use]
    pub fn chunk_count<T: Component>(&self) -> usize {
        self.column::<T>().map_or(0, |c| c.chunk_count())
    }

    /// Returns a shared view of chunk `index` of the column for `T`.
    #[must_use]
    pub fn chunk<T: Component>(&self, index: usize) -> Option<ChunkRef<T>> {
        self.column::<T>()?.chunk(index)
    }

    /// Returns an exclusive view of chunk `index` of the column for `T`.
    #[must_use]
    pub fn chunk_mut<T: Component>(&self, index: usize) -> Option<ChunkMut<T>> {
        self.column::<T>()?.chunk_mut(index)
    }

    /// Lazily iterate every entity holding all component types in `Q`.
    ///
    /// The query holds shared column locks until dropped; collect what you
    /// need before despawning or attaching from the same thread.
    #[must_use]
    pub fn query<Q: QueryData>(&self) -> Query<Q> {
        Query::new(self)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.read().live()
    }

    /// Returns the number of stored `T` components.
    #[must_use]
    pub fn component_count<T: Component>(&self) -> usize {
        self.column::<T>().map_or(0, |c| c.len())
    }

    /// Returns the names of all registered component types.
    #[must_use]
    pub fn component_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.columns.iter().map(|c| c.value().type_name()).collect();
        names.sort_unstable();
        names
    }

    /// Returns the total number of stored components across all types.
    #[must_use]
    pub fn total_components(&self) -> usize {
        self.columns.iter().map(|c| c.value().len()).sum()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position(f32, f32);

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Mass(f32);

    impl Component for Mass {
        fn type_name() -> &'static str {
            "Mass"
        }
    }

    /// Shares its name with `Position`.
    #[derive(Debug, Clone, Copy)]
    struct Impostor;

    impl Component for Impostor {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[test]
    fn test_spawn_has_no_components() {
        let world = World::new();
        let e = world.spawn();
        assert!(world.is_alive(e));
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.get::<Position>(e), None);
        assert_eq!(world.total_components(), 0);
    }

    #[test]
    fn test_attach_then_get_roundtrip() {
        let world = World::new();
        let e = world.spawn();
        world.attach(e, Position(1.0, 2.0)).unwrap();
        assert_eq!(world.get::<Position>(e), Some(Position(1.0, 2.0)));

        assert!(world.despawn(e));
        assert_eq!(world.get::<Position>(e), None);
    }

    #[test]
    fn test_attach_to_dead_entity_fails() {
        let world = World::new();
        let e = world.spawn();
        world.despawn(e);
        assert_eq!(
            world.attach(e, Mass(1.0)),
            Err(StoreError::InvalidEntity(e))
        );
    }

    #[test]
    fn test_attach_racing_despawn_leaves_no_orphans() {
        let world = World::new();
        let entities: Vec<_> = (0..2000).map(|_| world.spawn()).collect();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for &e in &entities {
                    let _ = world.attach(e, Mass(1.0));
                }
            });
            scope.spawn(|| {
                for &e in entities.iter().rev() {
                    world.despawn(e);
                }
            });
        });

        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.component_count::<Mass>(), 0);
    }

    #[test]
    fn test_despawn_releases_all_columns() {
        let world = World::new();
        let e = world.spawn();
        let keep = world.spawn();
        world.attach(e, Position(0.0, 0.0)).unwrap();
        world.attach(e, Mass(3.0)).unwrap();
        world.attach(keep, Mass(4.0)).unwrap();

        world.despawn(e);
        assert_eq!(world.component_count::<Position>(), 0);
        assert_eq!(world.component_count::<Mass>(), 1);
        assert_eq!(world.get::<Mass>(keep), Some(Mass(4.0)));
    }

    #[test]
    fn test_despawn_is_noop_when_dead() {
        let world = World::new();
        let e = world.spawn();
        assert!(world.despawn(e));
        assert!(!world.despawn(e));
        assert_eq!(world.despawn_strict(e), Err(StoreError::UnknownEntity(e)));
    }

    #[test]
    fn test_never_returns_component_of_despawned_entity() {
        let world = World::new();
        let mut live = Vec::new();
        let mut dead = Vec::new();
        // Deterministic interleaving of spawns and despawns, with recycling.
        for round in 0..20u32 {
            for i in 0..10u32 {
                let e = world.spawn();
                world.attach(e, Mass((round * 10 + i) as f32)).unwrap();
                live.push(e);
            }
            for _ in 0..(round % 7) {
                if let Some(e) = live.pop() {
                    world.despawn(e);
                    dead.push(e);
                }
            }
            if round % 3 == 0 {
                world.recycle_despawned();
            }
        }
        for &e in &dead {
            assert_eq!(world.get::<Mass>(e), None);
            assert!(!world.contains::<Mass>(e));
            assert!(world.get_mut::<Mass>(e).is_none());
        }
        for &e in &live {
            assert!(world.get::<Mass>(e).is_some());
        }
    }

    #[test]
    fn test_slots_not_reused_until_recycled() {
        let world = World::new();
        let e = world.spawn();
        world.despawn(e);
        let fresh = world.spawn();
        assert_ne!(fresh.index(), e.index());
        assert_eq!(world.recycle_despawned(), 1);
        let reused = world.spawn();
        assert_eq!(reused.index(), e.index());
        assert!(!world.is_alive(e));
    }

    #[test]
    fn test_get_mut_writes_through() {
        let world = World::new();
        let e = world.spawn();
        world.attach(e, Mass(1.0)).unwrap();
        if let Some(mut mass) = world.get_mut::<Mass>(e) {
            mass.0 = 9.0;
        }
        assert_eq!(world.get::<Mass>(e), Some(Mass(9.0)));
    }

    #[test]
    fn test_detach() {
        let world = World::new();
        let e = world.spawn();
        world.attach(e, Mass(1.0)).unwrap();
        assert_eq!(world.detach::<Mass>(e), Ok(Some(Mass(1.0))));
        assert_eq!(world.detach::<Mass>(e), Ok(None));
        assert!(world.is_alive(e));
    }

    #[test]
    fn test_type_name_collision_rejected() {
        let world = World::new();
        world.register::<Position>().unwrap();
        assert_eq!(
            world.register::<Impostor>().err(),
            Some(StoreError::TypeNameCollision { name: "Position" })
        );
        let e = world.spawn();
        assert!(world.attach(e, Impostor).is_err());
    }

    #[test]
    fn test_component_names_sorted() {
        let world = World::new();
        world.register::<Position>().unwrap();
        world.register::<Mass>().unwrap();
        assert_eq!(world.component_names(), vec!["Mass", "Position"]);
    }
}
