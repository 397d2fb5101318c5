use anyhow::{Result, anyhow};
use clap::Args;

use super::emit_response;
use crate::config::Settings;
use crate::models::{AskResponse, FailureKind};
use crate::pipeline::prepare_statement;
use crate::sql::{RewriteContext, extract_qualified};

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Statement (or model output with a ```sql fence) to check.
    #[arg(value_name = "SQL")]
    pub sql: String,

    #[arg(long, default_value_t = false)]
    pub write: bool,

    /// Treat the statement as answering a pinned `LIB.TABLE` question.
    #[arg(long, value_name = "LIB.TABLE")]
    pub pin: Option<String>,
}

pub fn run(args: &CheckArgs, settings: &Settings) -> Result<()> {
    let pinned = match args.pin.as_deref() {
        Some(raw) => Some(
            extract_qualified(raw)
                .ok_or_else(|| anyhow!("--pin must look like LIB.TABLE or LIB/TABLE: {raw}"))?,
        ),
        None => None,
    };
    let library = pinned
        .as_ref()
        .map_or(settings.library.as_str(), |pinned| pinned.library.as_str());

    let response = match prepare_statement(
        &args.sql,
        RewriteContext {
            library,
            pinned: pinned.as_ref(),
            write_mode: args.write,
        },
    ) {
        Ok(prepared) => AskResponse::ok(prepared.sql, ""),
        Err(rejected) => AskResponse::failure(
            FailureKind::Validation,
            rejected.sql,
            rejected.rejection.message(),
        ),
    };
    emit_response(response)
}
