//! Column descriptors.

use std::fmt;

/// Accessor that extracts one cell value from a record.
pub type Accessor<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// One named field-extraction rule of a record schema.
///
/// The header name is both the write-order key and the matching key used on
/// import, so it must be unique within a schema.
pub struct Column<T> {
    header: String,
    accessor: Accessor<T>,
}

impl<T> Column<T> {
    /// Creates a column from a raw accessor.
    ///
    /// `None` is written as an empty cell.
    pub fn new(
        header: impl Into<String>,
        accessor: impl Fn(&T) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            header: header.into(),
            accessor: Box::new(accessor),
        }
    }

    /// Creates a column whose value is always present.
    pub fn value<V: fmt::Display>(
        header: impl Into<String>,
        accessor: impl Fn(&T) -> V + Send + Sync + 'static,
    ) -> Self {
        Self::new(header, move |item| Some(accessor(item).to_string()))
    }

    /// Creates a column for a nullable field.
    pub fn optional<V: fmt::Display>(
        header: impl Into<String>,
        accessor: impl Fn(&T) -> Option<V> + Send + Sync + 'static,
    ) -> Self {
        Self::new(header, move |item| accessor(item).map(|v| v.to_string()))
    }

    /// Returns the header name.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Extracts this column's value from `item`.
    #[must_use]
    pub fn extract(&self, item: &T) -> Option<String> {
        (self.accessor)(item)
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}
