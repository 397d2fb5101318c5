use anyhow::{Context, Result};

use super::script::{ScriptMode, ScriptRequest, SessionTag, build_script};
use super::{RemoteOutput, RemoteSession};
use crate::sql::StatementKind;

pub const LOG_TAIL_LINES: usize = 20;
const ERROR_MARKER: &str = "ERROR:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteTool {
    Runsqlstm,
    Cpytoimpf,
}

impl RemoteTool {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Runsqlstm => "RUNSQLSTM",
            Self::Cpytoimpf => "CPYTOIMPF",
        }
    }

    fn from_marker_line(line: &str) -> Option<Self> {
        if line.contains(Self::Runsqlstm.as_str()) {
            Some(Self::Runsqlstm)
        } else if line.contains(Self::Cpytoimpf.as_str()) {
            Some(Self::Cpytoimpf)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Raw CSV from the export step, no header row.
    Rows(String),
    /// Short status token from a direct statement (`OK`).
    Status(String),
    Failed {
        tool: Option<RemoteTool>,
        message: String,
    },
}

/// Runs one validated statement: queries through the scratch-table export,
/// DML directly.
pub fn execute_statement<S>(
    session: &mut S,
    statement: &str,
    library: &str,
    kind: StatementKind,
) -> Result<ExecutionOutcome>
where
    S: RemoteSession + ?Sized,
{
    let mode = match kind {
        StatementKind::Query => ScriptMode::SelectToCsv,
        StatementKind::Dml => ScriptMode::Direct,
    };
    run_script(session, statement, library, mode)
}

pub fn run_select_to_csv<S>(session: &mut S, statement: &str, library: &str) -> Result<ExecutionOutcome>
where
    S: RemoteSession + ?Sized,
{
    run_script(session, statement, library, ScriptMode::SelectToCsv)
}

fn run_script<S>(
    session: &mut S,
    statement: &str,
    library: &str,
    mode: ScriptMode,
) -> Result<ExecutionOutcome>
where
    S: RemoteSession + ?Sized,
{
    let tag = SessionTag::generate();
    let script = build_script(
        &ScriptRequest {
            statement,
            library,
            mode,
        },
        &tag,
    );
    tracing::debug!(
        tag = tag.as_str(),
        scratch_table = script.scratch_table.as_deref().unwrap_or("-"),
        "running remote script"
    );

    let output = session
        .exec(&script.text)
        .with_context(|| format!("remote script {} failed to run", tag.as_str()))?;
    Ok(interpret_output(&output, mode))
}

/// Maps captured streams to an outcome. An `ERROR:` line on stdout or any
/// stderr text is a failure; the message keeps the marker line plus the
/// tail of the remote log that follows it.
#[must_use]
pub fn interpret_output(output: &RemoteOutput, mode: ScriptMode) -> ExecutionOutcome {
    let lines = output.stdout.lines().collect::<Vec<_>>();
    if let Some(index) = lines
        .iter()
        .position(|line| line.trim_start().starts_with(ERROR_MARKER))
    {
        let marker = lines[index].trim();
        let log = lines[index + 1..]
            .iter()
            .map(|line| line.trim_end())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>();
        let tail = &log[log.len().saturating_sub(LOG_TAIL_LINES)..];

        let mut message = marker.to_string();
        for line in tail {
            message.push('\n');
            message.push_str(line);
        }
        return ExecutionOutcome::Failed {
            tool: RemoteTool::from_marker_line(marker),
            message,
        };
    }

    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return ExecutionOutcome::Failed {
            tool: None,
            message: stderr.to_string(),
        };
    }

    match mode {
        ScriptMode::SelectToCsv => ExecutionOutcome::Rows(output.stdout.clone()),
        ScriptMode::Direct => ExecutionOutcome::Status(output.stdout.trim().to_string()),
    }
}
