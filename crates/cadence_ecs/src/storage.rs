//! Dense, chunked component storage.
//!
//! A [`Column`] stores every instance of one component type. Entities map to
//! dense rows through a sparse slot table; rows are kept packed (removal is a
//! swap-remove) and iterate in insertion order.
//!
//! Values live in fixed-size chunks of [`CHUNK_SIZE`] rows, each behind its own
//! lock. Structural changes (insert of a new row, removal) take the column
//! lock exclusively; value access takes it shared and then locks a single
//! chunk. Subtasks of one system can therefore write disjoint chunks of the
//! same column in parallel.
//!
//! Lock order is always column, then chunk. Holding any guard from this
//! module while performing a structural change on the same column from the
//! same thread deadlocks.

use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

use crate::component::Component;
use crate::entity::Entity;

/// Number of rows per chunk. A chunk is the unit of data-parallel work.
pub const CHUNK_SIZE: usize = 256;

const EMPTY: u32 = u32::MAX;

type ReadArc<T> = ArcRwLockReadGuard<RawRwLock, T>;
type WriteArc<T> = ArcRwLockWriteGuard<RawRwLock, T>;
type Chunk<T> = Arc<RwLock<Vec<T>>>;

struct ColumnInner<T> {
    /// Slot index -> dense row, or `EMPTY`.
    sparse: Vec<u32>,
    /// Dense row -> owning entity.
    owners: Vec<Entity>,
    chunks: Vec<Chunk<T>>,
}

const fn locate(row: usize) -> (usize, usize) {
    (row / CHUNK_SIZE, row % CHUNK_SIZE)
}

impl<T> ColumnInner<T> {
    fn new() -> Self {
        Self {
            sparse: Vec::new(),
            owners: Vec::new(),
            chunks: Vec::new(),
        }
    }

    fn row(&self, entity: Entity) -> Option<usize> {
        let row = *self.sparse.get(entity.index() as usize)?;
        if row == EMPTY {
            return None;
        }
        let row = row as usize;
        (self.owners.get(row) == Some(&entity)).then_some(row)
    }

    fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let slot = entity.index() as usize;
        if self.sparse.len() <= slot {
            self.sparse.resize(slot + 1, EMPTY);
        }

        let existing = self.sparse[slot];
        if existing != EMPTY {
            // Either an overwrite, or a stale row left by an older generation.
            let row = existing as usize;
            let same_owner = self.owners[row] == entity;
            self.owners[row] = entity;
            let (chunk, offset) = locate(row);
            let old = std::mem::replace(&mut self.chunks[chunk].write()[offset], value);
            return same_owner.then_some(old);
        }

        let row = self.owners.len();
        self.sparse[slot] = row as u32;
        self.owners.push(entity);
        if row % CHUNK_SIZE == 0 {
            self.chunks
                .push(Arc::new(RwLock::new(Vec::with_capacity(CHUNK_SIZE))));
        }
        self.chunks[row / CHUNK_SIZE].write().push(value);
        None
    }

    fn remove(&mut self, entity: Entity) -> Option<T> {
        let row = self.row(entity)?;
        let last = self.owners.len() - 1;

        let tail = self.chunks[last / CHUNK_SIZE].write().pop()?;
        let removed = if row == last {
            tail
        } else {
            let (chunk, offset) = locate(row);
            std::mem::replace(&mut self.chunks[chunk].write()[offset], tail)
        };

        self.owners.swap_remove(row);
        if row != last {
            let moved = self.owners[row];
            self.sparse[moved.index() as usize] = row as u32;
        }
        self.sparse[entity.index() as usize] = EMPTY;

        if last % CHUNK_SIZE == 0 {
            self.chunks.pop();
        }
        Some(removed)
    }

    fn get_cloned(&self, entity: Entity) -> Option<T>
    where
        T: Clone,
    {
        let (chunk, offset) = locate(self.row(entity)?);
        self.chunks[chunk].read().get(offset).cloned()
    }
}

/// Storage for every instance of one component type.
///
/// Cloning a `Column` is cheap and yields another handle to the same storage.
pub struct Column<T> {
    inner: Arc<RwLock<ColumnInner<T>>>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Component> Default for Column<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> Column<T> {
    /// Create a new, empty column.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ColumnInner::new())),
        }
    }

    /// Store or overwrite the value for `entity`. Returns the previous value
    /// if the entity already had one.
    pub fn insert(&self, entity: Entity, value: T) -> Option<T> {
        self.inner.write().insert(entity, value)
    }

    /// Remove and return the value for `entity`, swap-removing its row.
    pub fn remove(&self, entity: Entity) -> Option<T> {
        self.inner.write().remove(entity)
    }

    /// Returns `true` if `entity` has a value in this column.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.read().row(entity).is_some()
    }

    /// Returns a copy of the value for `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<T> {
        self.inner.read().get_cloned(entity)
    }

    /// Returns a write guard on the value for `entity`.
    ///
    /// The guard locks the chunk holding the row; other chunks stay
    /// accessible.
    #[must_use]
    pub fn get_mut(&self, entity: Entity) -> Option<ComponentMut<T>> {
        let inner = self.inner.read_arc();
        let (chunk, offset) = locate(inner.row(entity)?);
        let chunk = inner.chunks[chunk].write_arc();
        Some(ComponentMut {
            chunk,
            offset,
            _column: inner,
        })
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().owners.len()
    }

    /// Returns `true` if the column holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of chunks currently allocated.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.inner.read().chunks.len()
    }

    /// Returns a shared view of the whole column.
    #[must_use]
    pub fn read(&self) -> ColumnRead<T> {
        ColumnRead {
            inner: self.inner.read_arc(),
        }
    }

    /// Returns a shared view of chunk `index`.
    #[must_use]
    pub fn chunk(&self, index: usize) -> Option<ChunkRef<T>> {
        let inner = self.inner.read_arc();
        let data = inner.chunks.get(index)?.read_arc();
        Some(ChunkRef {
            data,
            start: index * CHUNK_SIZE,
            inner,
        })
    }

    /// Returns an exclusive view of chunk `index`.
    #[must_use]
    pub fn chunk_mut(&self, index: usize) -> Option<ChunkMut<T>> {
        let inner = self.inner.read_arc();
        let data = inner.chunks.get(index)?.write_arc();
        Some(ChunkMut {
            data,
            start: index * CHUNK_SIZE,
            inner,
        })
    }
}

/// A shared view over a whole column.
///
/// Holds the column lock shared for its lifetime: structural changes to this
/// column wait until it is dropped.
pub struct ColumnRead<T> {
    inner: ReadArc<ColumnInner<T>>,
}

impl<T: Clone> ColumnRead<T> {
    /// Returns a copy of the value for `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<T> {
        self.inner.get_cloned(entity)
    }

    /// Returns `true` if `entity` has a value in this column.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.row(entity).is_some()
    }

    /// Entities with a value in this column, in dense (insertion) order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.inner.owners
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.owners.len()
    }

    /// Returns `true` if the column holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.owners.is_empty()
    }
}

/// A shared view over one chunk of a column.
pub struct ChunkRef<T> {
    data: ReadArc<Vec<T>>,
    start: usize,
    inner: ReadArc<ColumnInner<T>>,
}

impl<T> ChunkRef<T> {
    /// Entities owning the rows of this chunk.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.inner.owners[self.start..self.start + self.data.len()]
    }

    /// Iterate `(entity, value)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.entities().iter().copied().zip(self.data.iter())
    }

    /// Number of rows in this chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the chunk has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An exclusive view over one chunk of a column.
pub struct ChunkMut<T> {
    data: WriteArc<Vec<T>>,
    start: usize,
    inner: ReadArc<ColumnInner<T>>,
}

impl<T> ChunkMut<T> {
    /// Entities owning the rows of this chunk.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.inner.owners[self.start..self.start + self.data.len()]
    }

    /// Iterate `(entity, value)` pairs in row order with mutable access.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        let end = self.start + self.data.len();
        let owners = &self.inner.owners[self.start..end];
        owners.iter().copied().zip(self.data.iter_mut())
    }

    /// Number of rows in this chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the chunk has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A write guard on a single component value.
pub struct ComponentMut<T> {
    chunk: WriteArc<Vec<T>>,
    offset: usize,
    _column: ReadArc<ColumnInner<T>>,
}

impl<T> Deref for ComponentMut<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.chunk[self.offset]
    }
}

impl<T> DerefMut for ComponentMut<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.chunk[self.offset]
    }
}

/// Type-erased column operations the world needs without knowing `T`.
pub(crate) trait ErasedColumn: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn remove_entity(&self, entity: Entity) -> bool;
    fn len(&self) -> usize;
    fn type_name(&self) -> &'static str;
}

impl<T: Component> ErasedColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn remove_entity(&self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn len(&self) -> usize {
        Column::len(self)
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Mass(f32);

    impl Component for Mass {
        fn type_name() -> &'static str {
            "Mass"
        }
    }

    fn filled(count: u32) -> (Column<Mass>, Vec<Entity>) {
        let column = Column::new();
        let entities: Vec<Entity> = (0..count).map(|i| Entity::new(i, 0)).collect();
        for (i, &e) in entities.iter().enumerate() {
            column.insert(e, Mass(i as f32));
        }
        (column, entities)
    }

    #[test]
    fn test_insert_and_get() {
        let (column, entities) = filled(3);
        assert_eq!(column.len(), 3);
        assert_eq!(column.get(entities[1]), Some(Mass(1.0)));
        assert_eq!(column.get(Entity::new(9, 0)), None);
    }

    #[test]
    fn test_insert_overwrites() {
        let (column, entities) = filled(1);
        assert_eq!(column.insert(entities[0], Mass(5.0)), Some(Mass(0.0)));
        assert_eq!(column.len(), 1);
        assert_eq!(column.get(entities[0]), Some(Mass(5.0)));
    }

    #[test]
    fn test_stale_generation_is_not_visible() {
        let (column, entities) = filled(1);
        let stale = Entity::new(entities[0].index(), 1);
        assert!(!column.contains(stale));
        assert!(column.get_mut(stale).is_none());
    }

    #[test]
    fn test_chunks_split_at_chunk_size() {
        let (column, _) = filled(CHUNK_SIZE as u32 + 10);
        assert_eq!(column.chunk_count(), 2);
        assert_eq!(column.chunk(0).map(|c| c.len()), Some(CHUNK_SIZE));
        assert_eq!(column.chunk(1).map(|c| c.len()), Some(10));
        assert!(column.chunk(2).is_none());
    }

    #[test]
    fn test_remove_moves_tail_across_chunks() {
        let (column, entities) = filled(CHUNK_SIZE as u32 + 1);
        let tail = *entities.last().unwrap();

        assert_eq!(column.remove(entities[0]), Some(Mass(0.0)));
        assert_eq!(column.len(), CHUNK_SIZE);
        // The single-row tail chunk is released.
        assert_eq!(column.chunk_count(), 1);
        // The tail row now occupies row 0.
        let chunk = column.chunk(0).unwrap();
        assert_eq!(chunk.entities()[0], tail);
        assert_eq!(column.get(tail), Some(Mass(CHUNK_SIZE as f32)));
        assert!(!column.contains(entities[0]));
    }

    #[test]
    fn test_remove_last_row() {
        let (column, entities) = filled(2);
        assert_eq!(column.remove(entities[1]), Some(Mass(1.0)));
        assert_eq!(column.remove(entities[1]), None);
        assert_eq!(column.get(entities[0]), Some(Mass(0.0)));
        assert_eq!(column.len(), 1);
    }

    #[test]
    fn test_chunk_mut_updates_values() {
        let (column, entities) = filled(4);
        {
            let mut chunk = column.chunk_mut(0).unwrap();
            for (_, mass) in chunk.iter_mut() {
                mass.0 *= 2.0;
            }
        }
        assert_eq!(column.get(entities[3]), Some(Mass(6.0)));
    }

    #[test]
    fn test_component_mut_guard() {
        let (column, entities) = filled(2);
        if let Some(mut mass) = column.get_mut(entities[0]) {
            mass.0 = 42.0;
        }
        assert_eq!(column.get(entities[0]), Some(Mass(42.0)));
    }

    #[test]
    fn test_disjoint_chunks_written_in_parallel() {
        let (column, entities) = filled(CHUNK_SIZE as u32 * 4);
        std::thread::scope(|scope| {
            for index in 0..column.chunk_count() {
                let column = column.clone();
                scope.spawn(move || {
                    let mut chunk = column.chunk_mut(index).unwrap();
                    for (_, mass) in chunk.iter_mut() {
                        mass.0 += 1.0;
                    }
                });
            }
        });
        for (i, &e) in entities.iter().enumerate() {
            assert_eq!(column.get(e), Some(Mass(i as f32 + 1.0)));
        }
    }

    #[test]
    fn test_read_view_lists_entities_in_insertion_order() {
        let (column, entities) = filled(5);
        let view = column.read();
        assert_eq!(view.entities(), entities.as_slice());
        assert_eq!(view.get(entities[4]), Some(Mass(4.0)));
        assert_eq!(view.len(), 5);
    }
}
