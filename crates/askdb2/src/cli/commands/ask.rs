use std::io;

use anyhow::{Error, Result, bail};
use clap::Args;

use super::emit_response;
use crate::config::Settings;
use crate::llm::OllamaClient;
use crate::models::{AskCommandFailure, AskResponse, FailureKind};
use crate::pipeline::AskPipeline;
use crate::remote::SshConnector;
use crate::schema_cache::SchemaCache;

#[derive(Debug, Clone, Args)]
pub struct AskArgs {
    /// Free text; prefix with `write:` to allow INSERT/UPDATE/DELETE.
    #[arg(
        value_name = "QUESTION",
        required_unless_present = "stdin",
        conflicts_with = "stdin"
    )]
    pub question: Option<String>,

    /// Read one question per line from stdin until EOF, sharing one schema
    /// cache across all of them.
    #[arg(long, default_value_t = false)]
    pub stdin: bool,
}

pub fn run(args: &AskArgs, settings: &Settings) -> Result<()> {
    let generator = match OllamaClient::new(&settings.ollama_url, &settings.ollama_model) {
        Ok(generator) => generator,
        Err(error) => {
            return emit_response(AskResponse::failure(
                FailureKind::Unclassified,
                "",
                format!("Server error: {error:#}"),
            ));
        }
    };
    let connector = SshConnector::new(settings.clone());
    let cache = SchemaCache::new();
    let pipeline = AskPipeline::new(settings, &cache, &connector, &generator);

    if args.stdin {
        let summary = pipeline.ask_lines(io::stdin().lock(), &mut io::stdout().lock())?;
        return match summary.first_failure {
            Some(response) => Err(Error::new(AskCommandFailure::new(response))),
            None => Ok(()),
        };
    }

    let Some(question) = args.question.as_deref() else {
        bail!("a QUESTION argument or --stdin is required");
    };
    emit_response(pipeline.ask(question))
}
