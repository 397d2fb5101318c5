use std::cell::Cell;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use askdb2::models::SchemaSnapshot;
use askdb2::schema_cache::{Clock, SCHEMA_TTL, SchemaCache, schema_text};

#[derive(Clone)]
struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock should not be poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("clock lock should not be poisoned")
    }
}

fn customers(library: &str, fetched_at: Instant) -> SchemaSnapshot {
    SchemaSnapshot::from_rows(
        library,
        [("CUSTOMERS", "ID", "INTEGER"), ("CUSTOMERS", "NAME", "VARCHAR")],
        fetched_at,
    )
}

fn fetch_customers(library: &str, fetched_at: Instant) -> Result<SchemaSnapshot> {
    Ok(customers(library, fetched_at))
}

#[test]
fn lookups_within_ttl_fetch_once() {
    let clock = ManualClock::new();
    let cache = SchemaCache::with_clock(clock.clone(), SCHEMA_TTL);
    let fetches = Cell::new(0);
    let fetch = |library: &str, at: Instant| {
        fetches.set(fetches.get() + 1);
        fetch_customers(library, at)
    };

    let first = cache
        .get_or_fetch("raj2001", fetch)
        .expect("first lookup should fetch");
    clock.advance(Duration::from_secs(599));
    let second = cache
        .get_or_fetch("RAJ2001", fetch)
        .expect("second lookup should hit");

    assert_eq!(fetches.get(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.library, "RAJ2001");
}

#[test]
fn lookup_after_ttl_refreshes_exactly_once() {
    let clock = ManualClock::new();
    let cache = SchemaCache::with_clock(clock.clone(), SCHEMA_TTL);
    let fetches = Cell::new(0);
    let fetch = |library: &str, at: Instant| {
        fetches.set(fetches.get() + 1);
        fetch_customers(library, at)
    };

    let stale = cache.get_or_fetch("RAJ2001", fetch).expect("initial fetch");
    clock.advance(SCHEMA_TTL);
    let refreshed = cache.get_or_fetch("RAJ2001", fetch).expect("refresh");
    let cached = cache.get_or_fetch("RAJ2001", fetch).expect("cached read");

    assert_eq!(fetches.get(), 2);
    assert!(!Arc::ptr_eq(&stale, &refreshed));
    assert!(Arc::ptr_eq(&refreshed, &cached));
    assert_eq!(refreshed.fetched_at, stale.fetched_at + SCHEMA_TTL);
}

#[test]
fn empty_snapshots_are_cached_too() {
    let cache = SchemaCache::with_clock(ManualClock::new(), SCHEMA_TTL);
    let fetches = Cell::new(0);
    let fetch = |library: &str, at: Instant| -> Result<SchemaSnapshot> {
        fetches.set(fetches.get() + 1);
        Ok(SchemaSnapshot::empty(library, at))
    };

    assert!(cache.get_or_fetch("QGPL", fetch).expect("empty fetch").is_empty());
    assert!(cache.get_or_fetch("QGPL", fetch).expect("cached empty").is_empty());
    assert_eq!(fetches.get(), 1);
}

#[test]
fn failed_fetch_is_not_cached() {
    let cache = SchemaCache::with_clock(ManualClock::new(), SCHEMA_TTL);
    let fetches = Cell::new(0);

    let error = cache
        .get_or_fetch("RAJ2001", |_, _| {
            fetches.set(fetches.get() + 1);
            Err(anyhow!("failed to open ssh channel"))
        })
        .expect_err("transport failure should surface");
    assert!(error.to_string().contains("failed to open ssh channel"));

    let snapshot = cache
        .get_or_fetch("RAJ2001", |library, at| {
            fetches.set(fetches.get() + 1);
            fetch_customers(library, at)
        })
        .expect("retry should fetch again");
    assert_eq!(fetches.get(), 2);
    assert!(!snapshot.is_empty());
}

#[test]
fn libraries_are_cached_independently() {
    let cache = SchemaCache::with_clock(ManualClock::new(), SCHEMA_TTL);
    let a = cache.get_or_fetch("LIBA", fetch_customers).expect("LIBA fetch");
    let b = cache.get_or_fetch("LIBB", fetch_customers).expect("LIBB fetch");
    assert_eq!(a.library, "LIBA");
    assert_eq!(b.library, "LIBB");
}

#[test]
fn concurrent_lookups_only_ever_see_whole_snapshots() {
    const THREADS: usize = 8;
    const COLUMNS: usize = 25;

    let cache = SchemaCache::with_clock(ManualClock::new(), SCHEMA_TTL);
    let barrier = Barrier::new(THREADS);
    let fetched_by = Mutex::new(Vec::new());

    let seen = thread::scope(|scope| {
        let handles = (0..THREADS)
            .map(|worker| {
                let cache = &cache;
                let barrier = &barrier;
                let fetched_by = &fetched_by;
                scope.spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_fetch("RAJ2001", |library, at| {
                            fetched_by
                                .lock()
                                .expect("fetch log lock should not be poisoned")
                                .push(worker);
                            let marker = format!("W{worker}");
                            let rows = (0..COLUMNS).map(|column| {
                                ("WIDE".to_string(), format!("C{column:02}"), marker.clone())
                            });
                            Ok(SchemaSnapshot::from_rows(library, rows, at))
                        })
                        .expect("fetch should succeed")
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker should not panic"))
            .collect::<Vec<_>>()
    });

    let fetched_by = fetched_by
        .into_inner()
        .expect("fetch log lock should not be poisoned");
    assert!(!fetched_by.is_empty());

    for snapshot in &seen {
        let columns = snapshot.columns("WIDE").expect("table should be present");
        assert_eq!(columns.len(), COLUMNS);
        let marker = &columns[0].data_type;
        assert!(columns.iter().all(|column| &column.data_type == marker));
    }

    let settled = cache
        .get_or_fetch("RAJ2001", |_, _| Err(anyhow!("entry should still be fresh")))
        .expect("settled entry should be cached");
    let marker = settled.columns("WIDE").expect("table should be present")[0]
        .data_type
        .clone();
    assert!(
        fetched_by
            .iter()
            .any(|worker| format!("W{worker}") == marker),
        "cached marker {marker} was never fetched"
    );
}

#[test]
fn unavailable_schema_text() {
    let snapshot = SchemaSnapshot::empty("qgpl", Instant::now());
    insta::assert_snapshot!(
        schema_text("qgpl", None, &snapshot),
        @r"
    LIBRARY=QGPL
    (schema unavailable)
    "
    );
}

#[test]
fn focused_table_is_rendered_alone() {
    let snapshot = SchemaSnapshot::from_rows(
        "RAJ2001",
        [
            ("CUSTOMERS", "ID", "INTEGER"),
            ("CUSTOMERS", "NAME", "VARCHAR"),
            ("ORDERS", "ORDER_ID", "INTEGER"),
        ],
        Instant::now(),
    );
    assert_eq!(
        schema_text("RAJ2001", Some("customers"), &snapshot),
        "LIBRARY=RAJ2001\nCUSTOMERS(ID INTEGER, NAME VARCHAR)"
    );
}

#[test]
fn unknown_table_falls_back_to_overview() {
    let snapshot = SchemaSnapshot::from_rows(
        "RAJ2001",
        [
            ("ORDERS", "ORDER_ID", "INTEGER"),
            ("CUSTOMERS", "ID", "INTEGER"),
        ],
        Instant::now(),
    );
    assert_eq!(
        schema_text("RAJ2001", Some("INVOICES"), &snapshot),
        "LIBRARY=RAJ2001\nCUSTOMERS(ID INTEGER)\nORDERS(ORDER_ID INTEGER)"
    );
}

#[test]
fn overview_caps_tables_and_columns() {
    let rows = (0..10).flat_map(|table| {
        (0..15).map(move |column| (format!("T{table:02}"), format!("C{column:02}"), "INTEGER".to_string()))
    });
    let snapshot = SchemaSnapshot::from_rows("LIB", rows, Instant::now());
    let text = schema_text("LIB", None, &snapshot);
    let lines = text.lines().collect::<Vec<_>>();

    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0], "LIBRARY=LIB");
    assert!(lines[1].starts_with("T00(C00 INTEGER,"));
    assert!(lines[1].ends_with("C11 INTEGER)"));
    assert!(lines[8].starts_with("T07("));
}

#[test]
fn focused_table_caps_at_thirty_columns() {
    let rows = (0..40).map(|column| ("WIDE".to_string(), format!("C{column:02}"), "CHAR".to_string()));
    let snapshot = SchemaSnapshot::from_rows("LIB", rows, Instant::now());
    let text = schema_text("LIB", Some("WIDE"), &snapshot);
    assert_eq!(text.matches(" CHAR").count(), 30);
    assert!(text.ends_with("C29 CHAR)"));
}
