use std::io::{BufRead, Write};
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::Settings;
use crate::llm::{PromptInput, SqlGenerator, build_sql_prompt};
use crate::models::{AskResponse, FailureKind, SchemaSnapshot};
use crate::remote::{
    ExecutionOutcome, RemoteConnector, RemoteSession, execute_statement, fetch_schema_snapshot,
};
use crate::schema_cache::{Clock, SchemaCache, SystemClock, schema_text};
use crate::sql::{
    PinnedTable, RewriteContext, SqlRejection, StatementKind, add_header_if_select_star,
    classify_statement, extract_table_hints, rewrite_statement, unwrap_sql_fence,
    validate_generated_sql,
};

pub const EMPTY_QUESTION_MESSAGE: &str = "Please type something.";
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Missing IBM i credentials in env vars.";

/// A question with its `write:` prefix and table hints pulled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    pub question: String,
    pub write_mode: bool,
    pub library: String,
    pub table: Option<String>,
    pub pinned: Option<PinnedTable>,
}

#[must_use]
pub fn parse_question(raw: &str, default_library: &str) -> ParsedQuestion {
    let raw = raw.trim();
    let write_mode = write_prefix_regex().is_match(raw);
    let question = write_prefix_regex().replace(raw, "").trim().to_string();

    let (pinned, table) = extract_table_hints(&question);
    let library = pinned
        .as_ref()
        .map_or(default_library, |pinned| pinned.library.as_str())
        .to_ascii_uppercase();

    ParsedQuestion {
        question,
        write_mode,
        library,
        table,
        pinned,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    pub sql: String,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedStatement {
    pub sql: String,
    pub rejection: SqlRejection,
}

/// Model text to executable statement: unwrap, rewrite, validate.
pub fn prepare_statement(
    model_text: &str,
    context: RewriteContext<'_>,
) -> Result<PreparedStatement, RejectedStatement> {
    let unwrapped = unwrap_sql_fence(model_text);
    let rewritten = rewrite_statement(&unwrapped, context);
    tracing::debug!(generated = %unwrapped, rewritten = %rewritten, "statement rewritten");

    let sql = validate_generated_sql(&rewritten, context.write_mode).map_err(|rejection| {
        RejectedStatement {
            sql: rewritten.clone(),
            rejection,
        }
    })?;
    match classify_statement(&sql) {
        Some(kind) => Ok(PreparedStatement { sql, kind }),
        None => Err(RejectedStatement {
            sql,
            rejection: SqlRejection {
                reason: crate::sql::RejectionReason::Unsupported,
                detected_keyword: None,
            },
        }),
    }
}

/// Totals for one [`AskPipeline::ask_lines`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub answered: usize,
    pub failed: usize,
    pub first_failure: Option<AskResponse>,
}

#[derive(Debug)]
struct PipelineFailure {
    kind: FailureKind,
    sql: String,
    message: String,
}

impl PipelineFailure {
    fn new(kind: FailureKind, sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            sql: sql.into(),
            message: message.into(),
        }
    }
}

impl From<PipelineFailure> for AskResponse {
    fn from(failure: PipelineFailure) -> Self {
        AskResponse::failure(failure.kind, failure.sql, failure.message)
    }
}

/// Closes the wrapped session when dropped, on every exit path. A failed
/// close is logged and never replaces the request's own result.
struct SessionGuard<S: RemoteSession> {
    session: S,
}

impl<S: RemoteSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Err(error) = self.session.close() {
            tracing::debug!(error = %format!("{error:#}"), "remote session close failed");
        }
    }
}

/// One question in, one response out: generate, check and run a single
/// statement against the remote library.
pub struct AskPipeline<'a, R, G, C = SystemClock>
where
    C: Clock,
{
    settings: &'a Settings,
    cache: &'a SchemaCache<C>,
    connector: &'a R,
    generator: &'a G,
}

impl<'a, R, G, C> AskPipeline<'a, R, G, C>
where
    R: RemoteConnector,
    G: SqlGenerator,
    C: Clock,
{
    #[must_use]
    pub fn new(
        settings: &'a Settings,
        cache: &'a SchemaCache<C>,
        connector: &'a R,
        generator: &'a G,
    ) -> Self {
        Self {
            settings,
            cache,
            connector,
            generator,
        }
    }

    #[must_use]
    pub fn ask(&self, raw_question: &str) -> AskResponse {
        if raw_question.trim().is_empty() {
            return AskResponse::failure(FailureKind::Input, "", EMPTY_QUESTION_MESSAGE);
        }
        if !self.settings.has_credentials() {
            return AskResponse::failure(FailureKind::Input, "", MISSING_CREDENTIALS_MESSAGE);
        }

        let parsed = parse_question(raw_question, &self.settings.library);
        tracing::info!(
            library = %parsed.library,
            table = parsed.table.as_deref().unwrap_or("-"),
            pinned = parsed.pinned.is_some(),
            write_mode = parsed.write_mode,
            "question received"
        );

        let session = match self.connector.connect() {
            Ok(session) => session,
            Err(error) => {
                return AskResponse::failure(
                    FailureKind::Remote,
                    "",
                    format!("Remote error: {error:#}"),
                );
            }
        };
        let mut guard = SessionGuard { session };

        match self.answer(&mut guard.session, &parsed) {
            Ok(response) => response,
            Err(failure) => {
                tracing::info!(kind = failure.kind.as_str(), "question failed");
                failure.into()
            }
        }
    }

    /// Answers one question per non-blank input line and writes one JSON
    /// response line for each, flushing as it goes. Every line goes through
    /// the same schema cache.
    pub fn ask_lines<I, W>(&self, input: I, output: &mut W) -> Result<BatchSummary>
    where
        I: BufRead,
        W: Write,
    {
        let mut summary = BatchSummary::default();
        for line in input.lines() {
            let line = line.context("failed to read question from input")?;
            if line.trim().is_empty() {
                continue;
            }

            let response = self.ask(&line);
            let encoded = serde_json::to_string(&response).context("failed to encode response")?;
            writeln!(output, "{encoded}").context("failed to write response")?;
            output.flush().context("failed to flush response")?;

            summary.answered += 1;
            if !response.is_ok() {
                summary.failed += 1;
                summary.first_failure.get_or_insert(response);
            }
        }
        tracing::info!(
            answered = summary.answered,
            failed = summary.failed,
            "batch completed"
        );
        Ok(summary)
    }

    fn snapshot(
        &self,
        session: &mut R::Session,
        library: &str,
    ) -> Result<Arc<SchemaSnapshot>, PipelineFailure> {
        self.cache
            .get_or_fetch(library, |library, fetched_at| {
                fetch_schema_snapshot(session, library, fetched_at)
            })
            .map_err(|error| {
                PipelineFailure::new(FailureKind::Remote, "", format!("Remote error: {error:#}"))
            })
    }

    fn answer(
        &self,
        session: &mut R::Session,
        parsed: &ParsedQuestion,
    ) -> Result<AskResponse, PipelineFailure> {
        let snapshot = self.snapshot(session, &parsed.library)?;
        let schema = schema_text(&parsed.library, parsed.table.as_deref(), &snapshot);

        let prompt = build_sql_prompt(&PromptInput {
            question: &parsed.question,
            library: &parsed.library,
            schema_text: &schema,
            write_mode: parsed.write_mode,
        });
        let model_text = self.generator.generate(&prompt).map_err(|error| {
            PipelineFailure::new(
                FailureKind::Generation,
                "",
                format!("Ollama error: {error:#}"),
            )
        })?;

        let prepared = prepare_statement(
            &model_text,
            RewriteContext {
                library: &parsed.library,
                pinned: parsed.pinned.as_ref(),
                write_mode: parsed.write_mode,
            },
        )
        .map_err(|rejected| {
            tracing::info!(
                reason = rejected.rejection.reason.as_str(),
                sql = %rejected.sql,
                "statement rejected"
            );
            PipelineFailure::new(
                FailureKind::Validation,
                rejected.sql,
                rejected.rejection.message(),
            )
        })?;

        let outcome = execute_statement(session, &prepared.sql, &parsed.library, prepared.kind)
            .map_err(|error| {
                PipelineFailure::new(
                    FailureKind::Remote,
                    prepared.sql.clone(),
                    format!("Remote error: {error:#}"),
                )
            })?;

        match (outcome, prepared.kind) {
            (ExecutionOutcome::Rows(csv_text), StatementKind::Query) => {
                let result = add_header_if_select_star(&csv_text, &prepared.sql, &snapshot);
                tracing::info!(bytes = result.len(), "query completed");
                Ok(AskResponse::ok(prepared.sql, result))
            }
            (ExecutionOutcome::Status(status), StatementKind::Dml) => {
                tracing::info!(status = %status, "statement completed");
                Ok(AskResponse::ok(prepared.sql, status))
            }
            (ExecutionOutcome::Failed { tool, message }, _) => {
                tracing::info!(
                    tool = tool.map_or("-", |tool| tool.as_str()),
                    "remote execution failed"
                );
                Err(PipelineFailure::new(
                    FailureKind::Remote,
                    prepared.sql,
                    message,
                ))
            }
            (other, kind) => Err(PipelineFailure::new(
                FailureKind::Unclassified,
                prepared.sql,
                format!("Server error: unexpected {kind:?} outcome {other:?}"),
            )),
        }
    }
}

fn write_prefix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)^\s*write\s*:\s*").expect("write prefix regex should compile")
    })
}
