use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::models::{ColumnDescriptor, SchemaSnapshot};

pub const SCHEMA_TTL: Duration = Duration::from_secs(600);
pub const FOCUSED_TABLE_MAX_COLUMNS: usize = 30;
pub const OVERVIEW_MAX_TABLES: usize = 8;
pub const OVERVIEW_MAX_COLUMNS: usize = 12;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Per-library schema snapshots with a fixed time-to-live.
///
/// Entries are immutable `Arc`s swapped in whole, so readers never see a
/// half-built snapshot. Two requests racing on the same stale library may
/// both fetch; the later insert wins.
pub struct SchemaCache<C: Clock = SystemClock> {
    entries: RwLock<HashMap<String, Arc<SchemaSnapshot>>>,
    ttl: Duration,
    clock: C,
}

impl SchemaCache<SystemClock> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock, SCHEMA_TTL)
    }
}

impl Default for SchemaCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SchemaCache<C> {
    #[must_use]
    pub fn with_clock(clock: C, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Cached snapshot for `library`, or a fresh one from `fetch` when the
    /// entry is missing or at least `ttl` old. `fetch` runs without holding
    /// the lock and receives the uppercased library and the fetch instant.
    /// A failed fetch leaves the cache untouched.
    pub fn get_or_fetch<F>(&self, library: &str, fetch: F) -> Result<Arc<SchemaSnapshot>>
    where
        F: FnOnce(&str, Instant) -> Result<SchemaSnapshot>,
    {
        let key = library.to_ascii_uppercase();
        let now = self.clock.now();

        if let Some(hit) = self.fresh_entry(&key, now) {
            tracing::debug!(library = %key, "schema cache hit");
            return Ok(hit);
        }

        tracing::debug!(library = %key, "schema cache miss");
        let snapshot = Arc::new(fetch(&key, now)?);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn fresh_entry(&self, key: &str, now: Instant) -> Option<Arc<SchemaSnapshot>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|snapshot| now.saturating_duration_since(snapshot.fetched_at) < self.ttl)
            .cloned()
    }
}

/// Prompt-sized schema description. A known `table` is rendered alone with
/// up to 30 columns; otherwise the first 8 tables alphabetically, 12 columns
/// each.
#[must_use]
pub fn schema_text(library: &str, table: Option<&str>, snapshot: &SchemaSnapshot) -> String {
    let library = library.to_ascii_uppercase();
    let mut text = format!("LIBRARY={library}");
    if snapshot.is_empty() {
        text.push_str("\n(schema unavailable)");
        return text;
    }

    if let Some(table) = table.map(str::to_ascii_uppercase)
        && let Some(columns) = snapshot.tables.get(&table)
    {
        push_table_line(&mut text, &table, columns, FOCUSED_TABLE_MAX_COLUMNS);
        return text;
    }

    for (table, columns) in overview_tables(&snapshot.tables) {
        push_table_line(&mut text, table, columns, OVERVIEW_MAX_COLUMNS);
    }
    text
}

fn overview_tables(
    tables: &BTreeMap<String, Vec<ColumnDescriptor>>,
) -> impl Iterator<Item = (&String, &Vec<ColumnDescriptor>)> {
    tables.iter().take(OVERVIEW_MAX_TABLES)
}

fn push_table_line(text: &mut String, table: &str, columns: &[ColumnDescriptor], limit: usize) {
    let rendered = columns
        .iter()
        .take(limit)
        .map(|column| format!("{} {}", column.name, column.data_type))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = write!(text, "\n{table}({rendered})");
}
