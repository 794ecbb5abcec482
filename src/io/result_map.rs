//! Type-indexed container of imported records.

use crate::schema::{Convertible, SchemaId};
use std::any::Any;
use std::collections::HashMap;

/// Imported records, one ordered list per record type.
///
/// Retrieval is keyed by the expected type and fails closed: a missing or
/// mistyped entry reads as an empty list.
#[derive(Default)]
pub struct ResultMap {
    entries: HashMap<SchemaId, Box<dyn Any + Send>>,
}

impl ResultMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `items` for `T`, replacing any previous list.
    ///
    /// Returns `true` if a previous list was replaced.
    pub fn put<T: Convertible + Send + 'static>(&mut self, items: Vec<T>) -> bool {
        self.put_erased(SchemaId::of::<T>(), Box::new(items))
    }

    /// Stores a type-erased list under `schema`, replacing any previous one.
    ///
    /// `items` must be a `Vec<T>` for the `T` that `schema` identifies;
    /// anything else is unreachable through the typed getters.
    pub(crate) fn put_erased(&mut self, schema: SchemaId, items: Box<dyn Any + Send>) -> bool {
        self.entries.insert(schema, items).is_some()
    }

    /// Records imported for `T`, in archive order; empty if none.
    #[must_use]
    pub fn get<T: Convertible + 'static>(&self) -> &[T] {
        self.entries
            .get(&SchemaId::of::<T>())
            .and_then(|items| items.downcast_ref::<Vec<T>>())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Removes and returns the records for `T`; empty if none.
    pub fn take<T: Convertible + 'static>(&mut self) -> Vec<T> {
        let key = SchemaId::of::<T>();
        match self.entries.remove(&key) {
            Some(items) => match items.downcast::<Vec<T>>() {
                Ok(items) => *items,
                Err(other) => {
                    self.entries.insert(key, other);
                    Vec::new()
                },
            },
            None => Vec::new(),
        }
    }

    /// Returns whether an entry exists for `T`, even an empty one.
    #[must_use]
    pub fn contains<T: Convertible + 'static>(&self) -> bool {
        self.entries.contains_key(&SchemaId::of::<T>())
    }

    /// Schemas with an entry, in arbitrary order.
    pub fn schemas(&self) -> impl Iterator<Item = SchemaId> + '_ {
        self.entries.keys().copied()
    }

    /// Number of record types present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no record type is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ResultMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
