//! Lazy iteration over entities holding a set of component types.
//!
//! A [`Query`] snapshots shared views of the columns it needs when created and
//! iterates the first column's entities, yielding only those that hold every
//! other requested type too. Iteration is lazy and can be restarted by calling
//! [`Query::iter`] again.

use crate::access::Access;
use crate::component::Component;
use crate::entity::Entity;
use crate::storage::ColumnRead;
use crate::world::World;

/// A tuple of component types that can be fetched together.
pub trait QueryData: Sized {
    /// The column views held while the query is alive.
    type Fetch;

    /// Acquire views of every column, or `None` if one does not exist yet.
    fn fetch(world: &World) -> Option<Self::Fetch>;

    /// Entities of the column that drives iteration.
    fn entities(fetch: &Self::Fetch) -> &[Entity];

    /// Read every component of `entity`, or `None` if one is missing.
    fn get(fetch: &Self::Fetch, entity: Entity) -> Option<Self>;

    /// The read profile a system running this query must declare.
    fn access() -> Access;
}

macro_rules! impl_query_data {
    ($head:ident $(, $tail:ident)*) => {
        impl<$head: Component $(, $tail: Component)*> QueryData for ($head, $($tail,)*) {
            type Fetch = (ColumnRead<$head>, $(ColumnRead<$tail>,)*);

            #[allow(non_snake_case)]
            fn fetch(world: &World) -> Option<Self::Fetch> {
                Some((world.read::<$head>()?, $(world.read::<$tail>()?,)*))
            }

            fn entities(fetch: &Self::Fetch) -> &[Entity] {
                fetch.0.entities()
            }

            #[allow(non_snake_case)]
            fn get(fetch: &Self::Fetch, entity: Entity) -> Option<Self> {
                let ($head, $($tail,)*) = fetch;
                Some(($head.get(entity)?, $($tail.get(entity)?,)*))
            }

            fn access() -> Access {
                Access::new().read::<$head>()$(.read::<$tail>())*
            }
        }
    };
}

impl_query_data!(A);
impl_query_data!(A, B);
impl_query_data!(A, B, C);
impl_query_data!(A, B, C, D);

/// Shared views over the columns of `Q`.
///
/// Holds shared column locks until dropped. Structural changes to those
/// columns from the same thread must wait until the query is gone.
pub struct Query<Q: QueryData> {
    fetch: Option<Q::Fetch>,
}

impl<Q: QueryData> Query<Q> {
    pub(crate) fn new(world: &World) -> Self {
        Self {
            fetch: Q::fetch(world),
        }
    }

    /// Start (or restart) iteration.
    pub fn iter(&self) -> QueryIter<'_, Q> {
        QueryIter {
            fetch: self.fetch.as_ref(),
            cursor: 0,
        }
    }

    /// Returns the components of a single entity, if it matches.
    pub fn get(&self, entity: Entity) -> Option<Q> {
        Q::get(self.fetch.as_ref()?, entity)
    }

    /// Returns the number of matching entities. Walks the whole query.
    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

impl<'q, Q: QueryData> IntoIterator for &'q Query<Q> {
    type Item = (Entity, Q);
    type IntoIter = QueryIter<'q, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over `(Entity, Q)` pairs of a [`Query`].
pub struct QueryIter<'q, Q: QueryData> {
    fetch: Option<&'q Q::Fetch>,
    cursor: usize,
}

impl<Q: QueryData> Iterator for QueryIter<'_, Q> {
    type Item = (Entity, Q);

    fn next(&mut self) -> Option<Self::Item> {
        let fetch = self.fetch?;
        let entities = Q::entities(fetch);
        while let Some(&entity) = entities.get(self.cursor) {
            self.cursor += 1;
            if let Some(item) = Q::get(fetch, entity) {
                return Some((entity, item));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Age(f32);

    impl Component for Age {
        fn type_name() -> &'static str {
            "Age"
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Lifetime(f32);

    impl Component for Lifetime {
        fn type_name() -> &'static str {
            "Lifetime"
        }
    }

    #[test]
    fn test_query_yields_only_full_matches() {
        let world = World::new();
        let both = world.spawn();
        let age_only = world.spawn();
        world.attach(both, Age(1.0)).unwrap();
        world.attach(both, Lifetime(2.0)).unwrap();
        world.attach(age_only, Age(5.0)).unwrap();

        let query = world.query::<(Age, Lifetime)>();
        let found: Vec<_> = query.iter().collect();
        assert_eq!(found, vec![(both, (Age(1.0), Lifetime(2.0)))]);
        assert_eq!(query.get(age_only), None);
    }

    #[test]
    fn test_query_missing_column_is_empty() {
        let world = World::new();
        let e = world.spawn();
        world.attach(e, Age(1.0)).unwrap();
        let query = world.query::<(Age, Lifetime)>();
        assert_eq!(query.count(), 0);
    }

    #[test]
    fn test_query_is_restartable() {
        let world = World::new();
        for i in 0..10 {
            let e = world.spawn();
            world.attach(e, Age(i as f32)).unwrap();
        }
        let query = world.query::<(Age,)>();
        let first: Vec<_> = query.iter().take(3).collect();
        let again: Vec<_> = query.iter().take(3).collect();
        assert_eq!(first, again);
        assert_eq!((&query).into_iter().count(), 10);
    }

    #[test]
    fn test_query_skips_despawned() {
        let world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        world.attach(a, Age(1.0)).unwrap();
        world.attach(b, Age(2.0)).unwrap();
        world.despawn(a);

        let query = world.query::<(Age,)>();
        let entities: Vec<_> = query.iter().map(|(e, _)| e).collect();
        assert_eq!(entities, vec![b]);
    }

    #[test]
    fn test_query_access_reads_every_type() {
        let access = <(Age, Lifetime)>::access();
        assert_eq!(access.reads.len(), 2);
        assert!(access.writes.is_empty());
    }
}
