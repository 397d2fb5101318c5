use std::sync::OnceLock;

use regex::{Captures, NoExpand, Regex};

use super::extract::PinnedTable;

#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    pub library: &'a str,
    pub pinned: Option<&'a PinnedTable>,
    pub write_mode: bool,
}

/// Applies the post-generation fixups in order: forced table (pinned read)
/// or schema qualification, then the aggregate alias fix.
#[must_use]
pub fn rewrite_statement(sql: &str, context: RewriteContext<'_>) -> String {
    let rewritten = match context.pinned {
        Some(pinned) if !context.write_mode => force_from_table(sql, pinned),
        _ => ensure_schema_qualified(sql, context.library),
    };
    fix_sql_for_ctas(&rewritten)
}

/// Keeps only a trailing WHERE clause from `sql` and reads it against the
/// pinned table.
#[must_use]
pub fn force_from_table(sql: &str, pinned: &PinnedTable) -> String {
    let where_part = where_tail_regex()
        .captures(sql)
        .map(|captures| captures[1].trim().to_string())
        .filter(|condition| !condition.is_empty())
        .map(|condition| format!(" WHERE {condition}"))
        .unwrap_or_default();
    format!("SELECT * FROM {}{where_part}", pinned.qualified_name())
}

/// Prefixes bare `FROM`/`JOIN` targets with `library`. Already-qualified
/// names are left alone, so applying it twice changes nothing.
#[must_use]
pub fn ensure_schema_qualified(sql: &str, library: &str) -> String {
    let library = library.to_ascii_uppercase();
    let qualified = from_target_regex().replace_all(sql, |captures: &Captures<'_>| {
        qualify_target("FROM", &library, &captures[1])
    });
    let qualified = join_target_regex().replace_all(&qualified, |captures: &Captures<'_>| {
        qualify_target("JOIN", &library, &captures[1])
    });
    collapse_double_qualification(&qualified, &library)
}

fn qualify_target(keyword: &str, library: &str, target: &str) -> String {
    if target.contains('.') {
        format!("{keyword} {target}")
    } else {
        format!("{keyword} {library}.{target}")
    }
}

/// Names bare `COUNT(...)` projections so `CREATE TABLE ... AS (SELECT ...)`
/// accepts them.
#[must_use]
pub fn fix_sql_for_ctas(sql: &str) -> String {
    let trimmed = sql.trim();
    let fixed = count_star_regex().replace_all(trimmed, "SELECT COUNT(*) AS CNT${1}");
    count_column_regex()
        .replace_all(&fixed, "SELECT COUNT(${1}) AS CNT${2}")
        .into_owned()
}

fn collapse_double_qualification(sql: &str, library: &str) -> String {
    let escaped = regex::escape(library);
    match Regex::new(&format!(r"(?i)\b{escaped}\.{escaped}\.")) {
        Ok(doubled) => doubled
            .replace_all(sql, NoExpand(&format!("{library}.")))
            .into_owned(),
        Err(_) => sql.to_string(),
    }
}

fn where_tail_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?is)\bWHERE\b(.*)").expect("where regex should compile"))
}

fn from_target_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\bFROM\s+([A-Za-z0-9_.]+)\b").expect("from target regex should compile")
    })
}

fn join_target_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\bJOIN\s+([A-Za-z0-9_.]+)\b").expect("join target regex should compile")
    })
}

fn count_star_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)\bSELECT\s+COUNT\s*\(\s*\*\s*\)(\s+FROM\b)")
            .expect("count star regex should compile")
    })
}

fn count_column_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)\bSELECT\s+COUNT\s*\(\s*([A-Za-z0-9_.]+)\s*\)(\s+FROM\b)")
            .expect("count column regex should compile")
    })
}
