use clap::{Args, Parser, Subcommand};

use super::commands::{ask::AskArgs, check::CheckArgs, schema::SchemaArgs};
use crate::config::SettingsOverrides;

#[derive(Debug, Parser)]
#[command(
    name = "askdb2",
    version,
    about = "Ask Db2 for i questions in plain language"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "HOST")]
    pub host: Option<String>,

    #[arg(long, global = true, value_name = "PORT")]
    pub port: Option<u16>,

    #[arg(long, global = true, value_name = "USER")]
    pub user: Option<String>,

    #[arg(long, global = true, value_name = "LIBRARY")]
    pub library: Option<String>,

    #[arg(long, global = true, value_name = "URL")]
    pub ollama_url: Option<String>,

    #[arg(long, global = true, value_name = "MODEL")]
    pub model: Option<String>,
}

impl RuntimeArgs {
    #[must_use]
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            library: self.library.clone(),
            ollama_url: self.ollama_url.clone(),
            ollama_model: self.model.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Turn a question into SQL, run it, print the JSON response.
    Ask(AskArgs),
    /// Print the schema text the model sees for the library.
    Schema(SchemaArgs),
    /// Rewrite and validate a statement offline.
    Check(CheckArgs),
    /// Print the JSON Schema of the response document.
    ResponseSchema,
}
