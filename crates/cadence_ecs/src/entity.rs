//! Entity type and allocation utilities.
//!
//! An [`Entity`] is a lightweight `u64` identifier with no inherent data. The
//! low 32 bits address a slot, the high 32 bits carry a generation counter so
//! stale handles to a recycled slot are detected.

/// A unique entity identifier.
///
/// Entities are pure identifiers; they carry no data of their own. Components
/// are attached to entities to give them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u64);

impl Entity {
    /// The null / invalid entity sentinel.
    pub const INVALID: Entity = Entity(u64::MAX);

    /// Create an entity from a slot index and generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    /// Create an entity from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns the slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation of the slot this handle was issued for.
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns `true` if this is not the [`Entity::INVALID`] sentinel.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.generation())
    }
}

/// Allocates entity IDs and tracks which are alive.
///
/// Freed slots are not reusable immediately: they sit in a retired list until
/// [`EntityAllocator::recycle`] is called, which the scheduler does only once
/// a cycle has been joined. Systems still running in the current cycle can
/// therefore never observe a reused identifier.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    retired: Vec<u32>,
    live: usize,
}

impl EntityAllocator {
    /// Creates a new, empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh entity ID, reusing a recycled slot when available.
    pub fn allocate(&mut self) -> Entity {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return Entity::new(index, self.generations[slot]);
        }

        // u32::MAX with generation u32::MAX would collide with the sentinel.
        assert!(
            self.generations.len() < u32::MAX as usize,
            "entity slot space exhausted"
        );
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        Entity::new(index, 0)
    }

    /// Marks an entity dead. Returns `false` if it was not alive.
    ///
    /// The slot's generation is bumped immediately so the old handle is stale
    /// from this point on; the slot itself is retired until [`recycle`].
    ///
    /// [`recycle`]: EntityAllocator::recycle
    pub fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = entity.index() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.retired.push(entity.index());
        self.live -= 1;
        true
    }

    /// Returns `true` if the entity handle refers to a live slot.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index() as usize;
        entity.is_valid()
            && self.alive.get(slot).copied().unwrap_or(false)
            && self.generations[slot] == entity.generation()
    }

    /// Makes every retired slot available for reuse. Returns how many slots
    /// were released.
    pub fn recycle(&mut self) -> usize {
        let released = self.retired.len();
        self.free.append(&mut self.retired);
        released
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Returns the number of slots ever created.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }
}
