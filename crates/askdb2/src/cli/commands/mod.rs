pub mod ask;
pub mod check;
pub mod response_schema;
pub mod schema;

use anyhow::{Context, Error, Result};

use crate::models::{AskCommandFailure, AskResponse};

/// Prints `response` as one JSON line; a failed response becomes an
/// `AskCommandFailure` so `main` can pick the exit code.
pub fn emit_response(response: AskResponse) -> Result<()> {
    let encoded = serde_json::to_string(&response).context("failed to encode response")?;
    println!("{encoded}");

    if response.is_ok() {
        Ok(())
    } else {
        Err(Error::new(AskCommandFailure::new(response)))
    }
}
