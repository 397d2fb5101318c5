use std::time::Instant;

use anyhow::{Context, Result};

use super::RemoteSession;
use super::executor::{ExecutionOutcome, run_select_to_csv};
use crate::models::SchemaSnapshot;

#[must_use]
pub fn catalog_query(library: &str) -> String {
    format!(
        "SELECT TABLE_NAME, COLUMN_NAME, DATA_TYPE \
         FROM QSYS2.SYSCOLUMNS \
         WHERE TABLE_SCHEMA = '{}' \
         ORDER BY TABLE_NAME, ORDINAL_POSITION",
        library.to_ascii_uppercase().replace('\'', "''")
    )
}

/// Reads table/column metadata for `library` through the CSV export path.
///
/// A remote tool failure or unreadable export yields an empty snapshot that
/// the caller caches like a successful fetch. Transport errors (channel or
/// read failures) are returned instead, so nothing is cached for them.
pub fn fetch_schema_snapshot<S>(
    session: &mut S,
    library: &str,
    fetched_at: Instant,
) -> Result<SchemaSnapshot>
where
    S: RemoteSession + ?Sized,
{
    let outcome = run_select_to_csv(session, &catalog_query(library), library)
        .context("schema metadata query could not run")?;

    match catalog_rows(outcome) {
        Ok(rows) => {
            tracing::info!(library, columns = rows.len(), "schema metadata fetched");
            Ok(SchemaSnapshot::from_rows(library, rows, fetched_at))
        }
        Err(error) => {
            tracing::warn!(library, error = %format!("{error:#}"), "schema metadata unavailable");
            Ok(SchemaSnapshot::empty(library, fetched_at))
        }
    }
}

fn catalog_rows(outcome: ExecutionOutcome) -> Result<Vec<(String, String, String)>> {
    match outcome {
        ExecutionOutcome::Rows(csv_text) => parse_catalog_csv(&csv_text),
        ExecutionOutcome::Failed { message, .. } => {
            Err(anyhow::anyhow!("catalog export failed: {message}"))
        }
        ExecutionOutcome::Status(status) => {
            Err(anyhow::anyhow!("unexpected catalog status: {status}"))
        }
    }
}

/// `(table, column, data_type)` triples from the exported catalog CSV.
/// Short rows are skipped; fields are unquoted and trimmed.
pub fn parse_catalog_csv(text: &str) -> Result<Vec<(String, String, String)>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("catalog export is not valid CSV")?;
        if record.len() < 3 {
            continue;
        }
        rows.push((
            record[0].to_ascii_uppercase(),
            record[1].to_ascii_uppercase(),
            record[2].to_ascii_uppercase(),
        ));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::{catalog_query, parse_catalog_csv};

    #[test]
    fn catalog_query_orders_by_ordinal_position() {
        let sql = catalog_query("raj20011");
        assert!(sql.contains("WHERE TABLE_SCHEMA = 'RAJ20011'"));
        assert!(sql.ends_with("ORDER BY TABLE_NAME, ORDINAL_POSITION"));
    }

    #[test]
    fn parses_quoted_padded_fields_and_skips_short_rows() {
        let csv_text = "\"CUSTOMERS \",\"ID\",\"INTEGER\"\r\n\"CUSTOMERS\",\"name \",\"varchar\"\r\n\"BROKEN\"\r\n";
        let rows = parse_catalog_csv(csv_text).expect("catalog csv should parse");
        assert_eq!(
            rows,
            vec![
                (
                    "CUSTOMERS".to_string(),
                    "ID".to_string(),
                    "INTEGER".to_string()
                ),
                (
                    "CUSTOMERS".to_string(),
                    "NAME".to_string(),
                    "VARCHAR".to_string()
                ),
            ]
        );
    }
}
