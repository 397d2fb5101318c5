pub mod extract;
pub mod fence;
pub mod header;
pub mod rewrite;
pub mod validate;

pub use extract::{PinnedTable, extract_bare_table, extract_qualified, extract_table_hints};
pub use fence::unwrap_sql_fence;
pub use header::add_header_if_select_star;
pub use rewrite::{
    RewriteContext, ensure_schema_qualified, fix_sql_for_ctas, force_from_table,
    rewrite_statement,
};
pub use validate::{
    RejectionReason, SqlRejection, StatementKind, classify_statement, validate_generated_sql,
};
