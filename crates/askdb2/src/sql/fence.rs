use std::sync::OnceLock;

use regex::Regex;

/// Returns the body of the first fenced block (optionally tagged `sql`),
/// or the trimmed input when there is no fence.
#[must_use]
pub fn unwrap_sql_fence(text: &str) -> String {
    let trimmed = text.trim();
    match fence_regex().captures(trimmed) {
        Some(captures) => captures[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

fn fence_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)```(?:sql)?\s*(.*?)```").expect("sql fence regex should compile")
    })
}
