use std::{collections::HashSet, sync::Arc, time::Duration};

use crate::errors::Error;

use super::{ExecutionContext, StatementHandle, StatementRequest, StatementService, StatementState};

/// Exact failure messages that mean the statement's effect is already in place
pub type IgnorableErrors = HashSet<String>;

const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// How long to keep asking for a statement's status
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Upper bound on status queries per statement
    pub max_attempts: u32,
    /// Sleep between two status queries
    pub poll_interval: Duration,
}

impl PollPolicy {
    /// Setup triggered by the deployment
    pub fn setup() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: Duration::from_millis(200),
        }
    }

    /// Setup triggered through the admin API
    pub fn admin() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::setup()
    }
}

/// SQL text plus the failures it may tolerate
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
    pub name: Option<String>,
    pub sql: String,
    pub ignorable_errors: IgnorableErrors,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    pub fn named(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(sql)
        }
    }

    pub fn ignoring(mut self, message: impl Into<String>) -> Self {
        self.ignorable_errors.insert(message.into());
        self
    }
}

/// Runs statements one at a time against a [`StatementService`].
///
/// A timeout only stops the waiting: the statement keeps running on the
/// service side and may still complete.
#[derive(Clone)]
pub struct StatementExecutor {
    service: Arc<dyn StatementService>,
    context: ExecutionContext,
    policy: PollPolicy,
}

impl StatementExecutor {
    pub fn new(
        service: Arc<dyn StatementService>,
        context: ExecutionContext,
        policy: PollPolicy,
    ) -> Self {
        Self {
            service,
            context,
            policy,
        }
    }

    /// A fresh request for `sql` in this executor's context
    pub fn request(&self, sql: impl Into<String>) -> StatementRequest {
        StatementRequest::new(sql.into(), self.context.clone())
    }

    /// Submits `sql` without waiting for it.
    pub async fn submit(&self, sql: &str) -> Result<StatementHandle, Error> {
        self.submit_request(self.request(sql)).await
    }

    pub async fn submit_request(&self, request: StatementRequest) -> Result<StatementHandle, Error> {
        if request.sql.trim().is_empty() {
            return Err(Error::Validation {
                message: "Statement SQL is empty".to_string(),
            });
        }

        let handle = self.service.execute_statement(&request).await?;

        tracing::debug!(
            "Submitted statement {} (client token {})",
            handle,
            request.client_token
        );

        Ok(handle)
    }

    /// Polls `handle` until it finishes, fails, or the attempt budget runs out.
    pub async fn await_completion(
        &self,
        handle: &StatementHandle,
        ignorable_errors: &IgnorableErrors,
    ) -> Result<(), Error> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let status = self.service.describe_statement(handle).await?;

            match status.state {
                StatementState::Finished => {
                    tracing::debug!("Statement {} finished after {} polls", handle, attempt);
                    return Ok(());
                }
                StatementState::Failed => {
                    let message = status.error.unwrap_or_default();
                    if ignorable_errors.contains(&message) {
                        tracing::info!("Statement {} failed with ignorable error: {}", handle, message);
                        return Ok(());
                    }
                    tracing::error!("Statement {} failed: {}", handle, message);
                    return Err(Error::StatementFailed { message });
                }
                StatementState::Aborted => {
                    let message = status.error.unwrap_or_else(|| "statement aborted".to_string());
                    tracing::error!("Statement {} aborted: {}", handle, message);
                    return Err(Error::StatementFailed { message });
                }
                _ => {}
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.poll_interval).await;
            }
        }

        tracing::warn!(
            "Statement {} not finished after {} polls, giving up",
            handle,
            max_attempts
        );

        Err(Error::StatementTimeout {
            id: handle.to_string(),
            attempts: max_attempts,
        })
    }

    /// Submits a statement and waits for it.
    pub async fn execute(&self, statement: &Statement) -> Result<(), Error> {
        let mut request = self.request(statement.sql.as_str());
        if let Some(name) = &statement.name {
            request = request.with_name(name.as_str());
        }

        let handle = self.submit_request(request).await?;
        self.await_completion(&handle, &statement.ignorable_errors).await
    }

    /// Executes statements in order and stops at the first failure.
    pub async fn run_sequential(&self, statements: &[Statement]) -> Result<(), Error> {
        for (index, statement) in statements.iter().enumerate() {
            let label = statement.name.as_deref().unwrap_or("unnamed");
            tracing::info!("Running statement {}/{}: {}", index + 1, statements.len(), label);

            self.execute(statement).await?;
        }

        Ok(())
    }
}
