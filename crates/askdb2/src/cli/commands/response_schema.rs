use anyhow::{Context, Result};

pub fn run() -> Result<()> {
    let schema = crate::models::json_schema();
    let encoded =
        serde_json::to_string_pretty(&schema).context("failed to encode response schema")?;
    println!("{encoded}");
    Ok(())
}
