use derive_new::new;
use uuid::Uuid;

/// Where and as whom a statement runs. Passed through to the service untouched.
#[derive(Clone, Debug, Eq, PartialEq, new)]
pub struct ExecutionContext {
    pub database: String,
    pub workgroup: String,
    pub secret_arn: String,
}

/// One submission attempt. Every request carries its own client token.
#[derive(Clone, Debug, new)]
pub struct StatementRequest {
    pub sql: String,
    pub context: ExecutionContext,
    #[new(value = "Uuid::new_v4()")]
    pub client_token: Uuid,
    #[new(default)]
    pub statement_name: Option<String>,
}

impl StatementRequest {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.statement_name = Some(name.into());
        self
    }
}

/// Service-allocated statement id
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct StatementHandle(pub String);

impl StatementHandle {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StatementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StatementState {
    Submitted,
    Picked,
    Started,
    Finished,
    Failed,
    Aborted,
    Unknown(String),
}

impl StatementState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Aborted)
    }
}

/// Point-in-time status of a submitted statement
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatementStatus {
    pub state: StatementState,
    pub error: Option<String>,
}

impl StatementStatus {
    pub fn new(state: StatementState) -> Self {
        Self {
            state,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: StatementState::Failed,
            error: Some(message.into()),
        }
    }
}
