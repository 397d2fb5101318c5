use std::fmt::{Display, Formatter};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Input,
    Generation,
    Validation,
    Remote,
    Unclassified,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Generation => "generation",
            Self::Validation => "validation",
            Self::Remote => "remote",
            Self::Unclassified => "unclassified",
        }
    }
}

/// Outbound document for one question.
///
/// `error` non-empty means failure, and then `result` is always empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AskResponse {
    pub sql: String,
    pub result: String,
    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

impl AskResponse {
    #[must_use]
    pub fn ok(sql: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            result: result.into(),
            error: String::new(),
            error_kind: None,
        }
    }

    #[must_use]
    pub fn failure(kind: FailureKind, sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            result: String::new(),
            error: message.into(),
            error_kind: Some(kind),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AskCommandFailure {
    response: AskResponse,
}

impl AskCommandFailure {
    #[must_use]
    pub fn new(response: AskResponse) -> Self {
        Self { response }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.response
            .error_kind
            .unwrap_or(FailureKind::Unclassified)
    }
}

impl Display for AskCommandFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failure: {}", self.kind().as_str(), self.response.error)
    }
}

impl std::error::Error for AskCommandFailure {}

#[must_use]
pub fn json_schema() -> Value {
    let schema = schemars::schema_for!(AskResponse);
    match serde_json::to_value(schema) {
        Ok(value) => value,
        Err(error) => {
            panic!("failed to serialize generated response schema: {error}");
        }
    }
}
