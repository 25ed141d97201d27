//! Access profiles for system data access declarations.
//!
//! An [`Access`] declares which component types a system reads and writes.
//! The scheduler compares profiles to decide which systems may run
//! concurrently and which must be ordered.

use crate::component::{Component, ComponentTypeId};

/// Describes the data access requirements of a system.
///
/// Systems declare their profile once; the scheduler uses it to build the
/// pipeline graph. Declaring a profile that does not cover what the system
/// actually touches is a programming error the scheduler cannot detect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Access {
    /// Component types the system reads immutably.
    pub reads: Vec<ComponentTypeId>,
    /// Component types the system writes (mutable access, attach, detach).
    pub writes: Vec<ComponentTypeId>,
    /// Structural access to the whole store (e.g. despawn, which releases
    /// every component type of the entity).
    pub exclusive: bool,
}

impl Access {
    /// Create a new empty access profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a profile that conflicts with every other profile.
    #[must_use]
    pub fn exclusive() -> Self {
        Self {
            exclusive: true,
            ..Self::default()
        }
    }

    /// Add a read-only component requirement.
    #[must_use]
    pub fn read<T: Component>(self) -> Self {
        self.read_id(T::component_type_id())
    }

    /// Add a mutable component requirement.
    #[must_use]
    pub fn write<T: Component>(self) -> Self {
        self.write_id(T::component_type_id())
    }

    /// Add a read-only requirement by raw type id.
    #[must_use]
    pub fn read_id(mut self, type_id: ComponentTypeId) -> Self {
        if !self.reads.contains(&type_id) {
            self.reads.push(type_id);
        }
        self
    }

    /// Add a mutable requirement by raw type id.
    #[must_use]
    pub fn write_id(mut self, type_id: ComponentTypeId) -> Self {
        if !self.writes.contains(&type_id) {
            self.writes.push(type_id);
        }
        self
    }

    /// Returns `true` if the profile touches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.exclusive && self.reads.is_empty() && self.writes.is_empty()
    }

    /// Checks whether this profile conflicts with another.
    ///
    /// Two profiles conflict when either is exclusive, or when one writes a
    /// component type that the other reads or writes:
    ///
    /// ```text
    /// A.writes ∩ (B.reads ∪ B.writes) ≠ ∅  OR
    /// B.writes ∩ (A.reads ∪ A.writes) ≠ ∅
    /// ```
    #[must_use]
    pub fn conflicts_with(&self, other: &Access) -> bool {
        if self.exclusive || other.exclusive {
            return true;
        }
        for w in &self.writes {
            if other.reads.contains(w) || other.writes.contains(w) {
                return true;
            }
        }
        for w in &other.writes {
            if self.reads.contains(w) || self.writes.contains(w) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFORM: ComponentTypeId = ComponentTypeId(1);
    const VELOCITY: ComponentTypeId = ComponentTypeId(2);
    const AI_STATE: ComponentTypeId = ComponentTypeId(3);

    #[test]
    fn test_no_conflict_both_read() {
        let a = Access::new().read_id(TRANSFORM);
        let b = Access::new().read_id(TRANSFORM);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn test_conflict_read_vs_write() {
        let a = Access::new().read_id(TRANSFORM);
        let b = Access::new().write_id(TRANSFORM);
        assert!(a.conflicts_with(&b));
        assert!(b.conflicts_with(&a));
    }

    #[test]
    fn test_conflict_write_vs_write() {
        let a = Access::new().write_id(VELOCITY);
        let b = Access::new().write_id(VELOCITY);
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn test_no_conflict_different_types() {
        // Physics: reads Transform, writes Velocity
        let physics = Access::new().read_id(TRANSFORM).write_id(VELOCITY);
        // AI: reads Transform, writes AiState
        let ai = Access::new().read_id(TRANSFORM).write_id(AI_STATE);
        assert!(!physics.conflicts_with(&ai));
    }

    #[test]
    fn test_exclusive_conflicts_with_everything() {
        let lifetime = Access::exclusive();
        assert!(lifetime.conflicts_with(&Access::new()));
        assert!(Access::new().read_id(AI_STATE).conflicts_with(&lifetime));
    }

    #[test]
    fn test_duplicate_declarations_collapse() {
        let a = Access::new().read_id(TRANSFORM).read_id(TRANSFORM);
        assert_eq!(a.reads.len(), 1);
        assert!(!a.is_empty());
        assert!(Access::new().is_empty());
    }
}
