const WRITE_MODE_RULES: &str = "\
Write mode ENABLED.
Generate ONLY ONE statement: INSERT or UPDATE or DELETE (or SELECT if user asked).
- UPDATE/DELETE MUST include a WHERE clause.
- No semicolons. No multiple statements.
- No DDL (CREATE/ALTER/DROP/TRUNCATE), no CALL/GRANT/REVOKE.";

const READ_MODE_RULES: &str = "\
Write mode DISABLED.
Generate ONLY a SELECT (or WITH...SELECT). No INSERT/UPDATE/DELETE.";

#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub question: &'a str,
    pub library: &'a str,
    pub schema_text: &'a str,
    pub write_mode: bool,
}

/// Deterministic instruction prompt: same input, same text.
#[must_use]
pub fn build_sql_prompt(input: &PromptInput<'_>) -> String {
    let library = input.library.to_ascii_uppercase();
    let mode_rules = if input.write_mode {
        WRITE_MODE_RULES
    } else {
        READ_MODE_RULES
    };

    format!(
        "You are an expert IBM Db2 for i (AS/400) SQL assistant.
Return ONLY ONE SQL statement, nothing else.

Rules:
- Use schema-qualified tables like {library}.TABLE (or user-specified LIB/TABLE).
- Use only tables/columns from schema. Do not invent.
- For text filters like STATUS: use full values from user text (e.g., 'AVAILABLE', 'ISSUED') and do not guess codes.
- If using aggregates/expressions, always alias columns (COUNT(*) AS CNT).
- No semicolons. No multiple statements.
- Do NOT add FETCH FIRST / LIMIT clauses.

{mode_rules}

Schema:
{schema}

User request: {question}

SQL:",
        schema = input.schema_text.trim(),
        question = input.question.trim(),
    )
}
