use std::sync::OnceLock;

use regex::Regex;

use crate::models::SchemaSnapshot;

/// Prepends the cached column names when `sql` is exactly
/// `SELECT * FROM LIB.TABLE` for a table in `snapshot`. The remote export
/// writes no header row, so this is the only way a plain table read gets
/// one. Any other statement, or empty output, passes through unchanged.
#[must_use]
pub fn add_header_if_select_star(csv_text: &str, sql: &str, snapshot: &SchemaSnapshot) -> String {
    if csv_text.is_empty() {
        return csv_text.to_string();
    }
    let Some(captures) = select_star_regex().captures(sql) else {
        return csv_text.to_string();
    };
    if !captures[1].eq_ignore_ascii_case(&snapshot.library) {
        return csv_text.to_string();
    }
    let Some(columns) = snapshot.columns(&captures[2]) else {
        return csv_text.to_string();
    };
    if columns.is_empty() {
        return csv_text.to_string();
    }

    let header = columns
        .iter()
        .map(|column| column.name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let line_break = if csv_text.contains("\r\n") { "\r\n" } else { "\n" };
    format!("{header}{line_break}{csv_text}")
}

fn select_star_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)^\s*SELECT\s+\*\s+FROM\s+([A-Za-z0-9_]+)\.([A-Za-z0-9_]+)\s*$")
            .expect("select star regex should compile")
    })
}
