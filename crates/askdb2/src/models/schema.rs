use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.trim().to_ascii_uppercase(),
            data_type: data_type.trim().to_ascii_uppercase(),
        }
    }
}

/// Table to column-list metadata for one library.
///
/// Columns keep the remote ordinal order so a header line can be rebuilt
/// positionally for exported CSV.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    pub library: String,
    pub tables: BTreeMap<String, Vec<ColumnDescriptor>>,
    pub fetched_at: Instant,
}

impl SchemaSnapshot {
    #[must_use]
    pub fn empty(library: &str, fetched_at: Instant) -> Self {
        Self {
            library: library.to_ascii_uppercase(),
            tables: BTreeMap::new(),
            fetched_at,
        }
    }

    /// Groups `(table, column, data_type)` rows in arrival order.
    #[must_use]
    pub fn from_rows<I, S>(library: &str, rows: I, fetched_at: Instant) -> Self
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: AsRef<str>,
    {
        let mut snapshot = Self::empty(library, fetched_at);
        for (table, column, data_type) in rows {
            let table = table.as_ref().trim().to_ascii_uppercase();
            if table.is_empty() {
                continue;
            }
            snapshot
                .tables
                .entry(table)
                .or_default()
                .push(ColumnDescriptor::new(column.as_ref(), data_type.as_ref()));
        }
        snapshot
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[must_use]
    pub fn columns(&self, table: &str) -> Option<&[ColumnDescriptor]> {
        self.tables
            .get(&table.to_ascii_uppercase())
            .map(Vec::as_slice)
    }
}
