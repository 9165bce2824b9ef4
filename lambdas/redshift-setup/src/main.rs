use std::sync::Arc;

use analytics::{
    statements::{run_setup, PollPolicy, RedshiftDataService, StatementExecutor},
    RedshiftConfig,
};
use aws_config::BehaviorVersion;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = RedshiftConfig::from_env()?;
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let service = RedshiftDataService::new(aws_sdk_redshiftdata::Client::new(&aws_config));

    let executor = StatementExecutor::new(
        Arc::new(service),
        config.execution_context(),
        config.poll_policy(PollPolicy::setup()),
    );

    lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| async {
        handle(event.payload, &executor, &config).await
    }))
    .await
}

async fn handle(
    _event: Value,
    executor: &StatementExecutor,
    config: &RedshiftConfig,
) -> Result<Value, Error> {
    let statements = run_setup(executor, config).await.map_err(|e| {
        tracing::error!("Redshift setup failed: {}", e);
        e
    })?;

    Ok(serde_json::json!({ "Result": "OK", "Statements": statements }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::{
        statements::{fake::FakeStatementService, StatementState, StatementStatus},
        IngestMode,
    };
    use std::{path::PathBuf, time::Duration};

    fn config() -> RedshiftConfig {
        RedshiftConfig {
            secret_arn: "arn:secret".to_string(),
            workgroup_name: "wg".to_string(),
            database_name: "events".to_string(),
            role_arn: Some("arn:aws:iam::123:role/redshift".to_string()),
            stream_name: Some("game-events".to_string()),
            ingest_mode: IngestMode::RealTimeKds,
            poll_max_attempts: None,
            poll_interval: None,
            sql_dir: PathBuf::from("/nonexistent/sql"),
        }
    }

    fn executor(service: &Arc<FakeStatementService>, config: &RedshiftConfig) -> StatementExecutor {
        StatementExecutor::new(
            service.clone(),
            config.execution_context(),
            PollPolicy {
                max_attempts: 5,
                poll_interval: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn runs_schema_then_view() {
        let config = config();
        let service = Arc::new(
            FakeStatementService::new()
                .script(vec![
                    StatementStatus::new(StatementState::Started),
                    StatementStatus::new(StatementState::Finished),
                ])
                .script(vec![StatementStatus::new(StatementState::Finished)]),
        );

        let response = handle(Value::Null, &executor(&service, &config), &config)
            .await
            .unwrap();

        assert_eq!(response["Result"], "OK");
        assert_eq!(response["Statements"], 2);
        let sql = service.submitted_sql();
        assert!(sql[0].starts_with("CREATE EXTERNAL SCHEMA IF NOT EXISTS kds"));
        assert!(sql[1].starts_with("CREATE MATERIALIZED VIEW event_data"));
    }

    #[tokio::test]
    async fn schema_failure_skips_view() {
        let config = config();
        let service = Arc::new(
            FakeStatementService::new()
                .script(vec![StatementStatus::failed("permission denied")]),
        );

        let err = handle(Value::Null, &executor(&service, &config), &config)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "permission denied");
        assert_eq!(service.submitted().len(), 1);
    }
}
