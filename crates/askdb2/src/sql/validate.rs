const BANNED_KEYWORDS: &[&str] = &[
    "DROP", "ALTER", "CREATE", "TRUNCATE", "GRANT", "REVOKE", "CALL",
];
const QUERY_PREFIXES: &[&str] = &["SELECT", "WITH"];
const DML_PREFIXES: &[&str] = &["INSERT", "UPDATE", "DELETE", "MERGE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Dml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    Empty,
    MultiStatement,
    Privileged,
    WriteDisabled,
    Unsupported,
    UnboundedWrite,
}

impl RejectionReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty_statement",
            Self::MultiStatement => "multi_statement",
            Self::Privileged => "privileged_statement",
            Self::WriteDisabled => "write_disabled",
            Self::Unsupported => "unsupported_statement",
            Self::UnboundedWrite => "missing_where_clause",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Empty => "Empty SQL produced by AI.",
            Self::MultiStatement => "Semicolons/multiple statements are not allowed.",
            Self::Privileged => "DDL/privileged commands are not allowed.",
            Self::WriteDisabled => {
                "Write queries are disabled. Use prefix `write:` to enable INSERT/UPDATE/DELETE."
            }
            Self::Unsupported => "Only SELECT or INSERT/UPDATE/DELETE are allowed.",
            Self::UnboundedWrite => "UPDATE/DELETE must include a WHERE clause.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlRejection {
    pub reason: RejectionReason,
    pub detected_keyword: Option<&'static str>,
}

impl SqlRejection {
    fn new(reason: RejectionReason) -> Self {
        Self {
            reason,
            detected_keyword: None,
        }
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        self.reason.message()
    }
}

impl std::fmt::Display for SqlRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for SqlRejection {}

/// Safety gate for one generated statement. Rules run in a fixed order and
/// the first failure wins; success yields the trimmed statement.
///
/// The keyword scan is a plain substring match over the uppercased text, so
/// it also fires inside literals and identifiers (`RECALL`, `'DROP'`).
pub fn validate_generated_sql(sql: &str, write_mode: bool) -> Result<String, SqlRejection> {
    let statement = sql.trim();
    if statement.is_empty() {
        return Err(SqlRejection::new(RejectionReason::Empty));
    }
    if statement.contains(';') {
        return Err(SqlRejection::new(RejectionReason::MultiStatement));
    }

    let upper = statement.to_ascii_uppercase();
    if let Some(keyword) = first_banned_keyword(&upper) {
        return Err(SqlRejection {
            reason: RejectionReason::Privileged,
            detected_keyword: Some(keyword),
        });
    }

    let kind = classify_statement(&upper);
    if kind == Some(StatementKind::Dml) && !write_mode {
        return Err(SqlRejection::new(RejectionReason::WriteDisabled));
    }
    if kind.is_none() {
        return Err(SqlRejection::new(RejectionReason::Unsupported));
    }

    let unbounded_candidate = upper.starts_with("UPDATE") || upper.starts_with("DELETE");
    if unbounded_candidate && !upper.contains(" WHERE ") {
        return Err(SqlRejection::new(RejectionReason::UnboundedWrite));
    }

    Ok(statement.to_string())
}

#[must_use]
pub fn classify_statement(sql: &str) -> Option<StatementKind> {
    let upper = sql.trim_start().to_ascii_uppercase();
    if QUERY_PREFIXES.iter().any(|prefix| upper.starts_with(prefix)) {
        Some(StatementKind::Query)
    } else if DML_PREFIXES.iter().any(|prefix| upper.starts_with(prefix)) {
        Some(StatementKind::Dml)
    } else {
        None
    }
}

fn first_banned_keyword(upper_sql: &str) -> Option<&'static str> {
    BANNED_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| upper_sql.contains(keyword))
}
