use std::time::Instant;

use anyhow::{Result, bail};
use clap::Args;

use crate::config::Settings;
use crate::pipeline::MISSING_CREDENTIALS_MESSAGE;
use crate::remote::{RemoteConnector, RemoteSession, SshConnector, fetch_schema_snapshot};
use crate::schema_cache::schema_text;

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    /// Render only this table (up to 30 columns).
    #[arg(long, value_name = "TABLE")]
    pub table: Option<String>,
}

pub fn run(args: &SchemaArgs, settings: &Settings) -> Result<()> {
    if !settings.has_credentials() {
        bail!(MISSING_CREDENTIALS_MESSAGE);
    }

    let connector = SshConnector::new(settings.clone());
    let mut session = connector.connect()?;
    let snapshot = fetch_schema_snapshot(&mut session, &settings.library, Instant::now());
    if let Err(error) = session.close() {
        tracing::debug!(error = %format!("{error:#}"), "remote session close failed");
    }
    let snapshot = snapshot?;

    println!(
        "{}",
        schema_text(&settings.library, args.table.as_deref(), &snapshot)
    );
    Ok(())
}
