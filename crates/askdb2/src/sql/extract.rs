use std::sync::OnceLock;

use regex::Regex;

/// An explicit `LIB/TABLE` or `LIB.TABLE` mention in the question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedTable {
    pub library: String,
    pub table: String,
}

impl PinnedTable {
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.library, self.table)
    }
}

/// First `WORD/WORD` or `WORD.WORD` match, uppercased. Heuristic: no check
/// that either name exists remotely.
#[must_use]
pub fn extract_qualified(text: &str) -> Option<PinnedTable> {
    qualified_regex().captures(text).map(|captures| PinnedTable {
        library: captures[1].to_ascii_uppercase(),
        table: captures[2].to_ascii_uppercase(),
    })
}

/// `from WORD` wins over `table WORD`; first match of each pattern only.
#[must_use]
pub fn extract_bare_table(text: &str) -> Option<String> {
    [from_table_regex(), table_keyword_regex()]
        .into_iter()
        .find_map(|regex| regex.captures(text))
        .map(|captures| captures[1].to_ascii_uppercase())
}

/// Both passes together: the bare pass only runs when nothing was pinned.
#[must_use]
pub fn extract_table_hints(text: &str) -> (Option<PinnedTable>, Option<String>) {
    match extract_qualified(text) {
        Some(pinned) => {
            let table = pinned.table.clone();
            (Some(pinned), Some(table))
        }
        None => (None, extract_bare_table(text)),
    }
}

fn qualified_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b([A-Za-z0-9_]+)\s*[/.]\s*([A-Za-z0-9_]+)\b")
            .expect("qualified table regex should compile")
    })
}

fn from_table_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\bfrom\s+([A-Za-z0-9_]+)\b").expect("from table regex should compile")
    })
}

fn table_keyword_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\btable\s+([A-Za-z0-9_]+)\b")
            .expect("table keyword regex should compile")
    })
}
