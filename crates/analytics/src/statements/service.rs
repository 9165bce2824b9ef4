use async_trait::async_trait;
use aws_sdk_redshiftdata::{error::DisplayErrorContext, types::StatusString};

use crate::errors::Error;

use super::{StatementHandle, StatementRequest, StatementState, StatementStatus};

/// Asynchronous SQL execution service: accept a statement, report its status
#[async_trait]
pub trait StatementService: Send + Sync {
    async fn execute_statement(&self, request: &StatementRequest)
        -> Result<StatementHandle, Error>;

    async fn describe_statement(&self, handle: &StatementHandle)
        -> Result<StatementStatus, Error>;
}

/// Redshift Data API against a serverless workgroup
#[derive(Clone, Debug)]
pub struct RedshiftDataService {
    client: aws_sdk_redshiftdata::Client,
}

impl RedshiftDataService {
    pub fn new(client: aws_sdk_redshiftdata::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatementService for RedshiftDataService {
    async fn execute_statement(
        &self,
        request: &StatementRequest,
    ) -> Result<StatementHandle, Error> {
        let output = self
            .client
            .execute_statement()
            .sql(&request.sql)
            .database(&request.context.database)
            .workgroup_name(&request.context.workgroup)
            .secret_arn(&request.context.secret_arn)
            .with_event(true)
            .set_statement_name(request.statement_name.clone())
            .client_token(request.client_token.to_string())
            .send()
            .await
            .map_err(|e| Error::Submission {
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let id = output.id().ok_or_else(|| Error::Submission {
            message: "No statement id returned".to_string(),
        })?;

        Ok(StatementHandle(id.to_string()))
    }

    async fn describe_statement(
        &self,
        handle: &StatementHandle,
    ) -> Result<StatementStatus, Error> {
        let output = self
            .client
            .describe_statement()
            .id(handle.id())
            .send()
            .await
            .map_err(|e| Error::Describe {
                id: handle.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let state = output
            .status()
            .map(state_from_sdk)
            .unwrap_or(StatementState::Submitted);

        Ok(StatementStatus {
            state,
            error: output.error().map(str::to_string),
        })
    }
}

fn state_from_sdk(status: &StatusString) -> StatementState {
    match status {
        StatusString::Submitted => StatementState::Submitted,
        StatusString::Picked => StatementState::Picked,
        StatusString::Started => StatementState::Started,
        StatusString::Finished => StatementState::Finished,
        StatusString::Failed => StatementState::Failed,
        StatusString::Aborted => StatementState::Aborted,
        other => StatementState::Unknown(other.as_str().to_string()),
    }
}
