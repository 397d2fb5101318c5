pub mod catalog;
pub mod executor;
pub mod script;
pub mod ssh;

use anyhow::Result;

pub use catalog::{catalog_query, fetch_schema_snapshot, parse_catalog_csv};
pub use executor::{
    ExecutionOutcome, LOG_TAIL_LINES, RemoteTool, execute_statement, interpret_output,
    run_select_to_csv,
};
pub use script::{
    RemoteScript, ScratchStage, ScriptMode, ScriptRequest, SessionTag, build_script,
};
pub use ssh::{SshConnector, SshSession};

/// Captured streams of one remote shell invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    #[must_use]
    pub fn from_bytes(stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            stdout: decode_ignoring_invalid(stdout),
            stderr: decode_ignoring_invalid(stderr),
        }
    }
}

/// An open command channel to the remote host, scoped to one request.
pub trait RemoteSession {
    fn exec(&mut self, script: &str) -> Result<RemoteOutput>;

    fn close(&mut self) -> Result<()>;
}

pub trait RemoteConnector {
    type Session: RemoteSession;

    fn connect(&self) -> Result<Self::Session>;
}

/// UTF-8 decode that drops undecodable bytes instead of replacing them.
#[must_use]
pub fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

#[cfg(test)]
mod tests {
    use super::decode_ignoring_invalid;

    #[test]
    fn drops_invalid_bytes() {
        assert_eq!(decode_ignoring_invalid(b"AB\xffC\xfe"), "ABC");
    }
}
