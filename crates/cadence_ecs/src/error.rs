//! Store-level error types.
//!
//! These are local and recoverable: a system may skip, log or substitute a
//! default when it hits one.

use crate::entity::Entity;

/// Errors returned by [`World`](crate::World) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The operation referenced an entity that is dead or was never issued.
    #[error("entity {0} is not alive")]
    InvalidEntity(Entity),

    /// A strict despawn targeted an entity that is not alive.
    #[error("cannot despawn unknown entity {0}")]
    UnknownEntity(Entity),

    /// Two distinct Rust types share a component name, and therefore a
    /// `ComponentTypeId`.
    #[error("component name `{name}` is already registered by a different type")]
    TypeNameCollision {
        /// The colliding component name.
        name: &'static str,
    },
}
