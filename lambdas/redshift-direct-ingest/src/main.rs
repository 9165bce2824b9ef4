use std::sync::Arc;

use analytics::{
    statements::{InsertStatement, PollPolicy, RedshiftDataService, StatementExecutor},
    IngestMessage, MetricUnit, Metrics, RedshiftConfig,
};
use aws_config::BehaviorVersion;
use aws_lambda_events::sqs::{BatchItemFailure, SqsBatchResponse, SqsEvent, SqsMessage};
use lambda_runtime::{service_fn, Error, LambdaEvent};

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
    let metrics = Metrics::from_env("redshift-direct-ingest");

    lambda_runtime::run(service_fn(|event: LambdaEvent<SqsEvent>| async {
        handle(event.payload, &executor, &metrics).await
    }))
    .await
}

async fn handle(
    event: SqsEvent,
    executor: &StatementExecutor,
    metrics: &Metrics,
) -> Result<SqsBatchResponse, Error> {
    tracing::info!("Processing {} SQS records", event.records.len());

    let mut batch_item_failures = Vec::new();

    for record in event.records.iter() {
        let message_id = record.message_id.clone().unwrap_or_default();

        if let Err(e) = handle_record(record, executor, metrics).await {
            tracing::error!("Failed to ingest events from {}: {}", message_id, e);
            batch_item_failures.push(BatchItemFailure {
                item_identifier: message_id,
            });
        }
    }

    metrics.publish_stored_metrics();

    Ok(SqsBatchResponse { batch_item_failures })
}

async fn handle_record(
    record: &SqsMessage,
    executor: &StatementExecutor,
    metrics: &Metrics,
) -> Result<(), Error> {
    let body = record.body.as_deref().unwrap_or_default();
    if body.trim().is_empty() {
        return Ok(());
    }

    let message: IngestMessage = serde_json::from_str(body)?;

    let Some(insert) = InsertStatement::build(&message.application_id, message.events())? else {
        tracing::warn!("No events for {}", message.application_id);
        return Ok(());
    };

    let rows = insert.rows;
    executor.execute(&insert.into_statement()).await?;

    tracing::info!("Executed statement for {} events", rows);
    metrics.add_metric("RecordsReceived", MetricUnit::Count, rows as f64);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::{
        metrics::MemorySink,
        statements::{fake::FakeStatementService, ExecutionContext, StatementState, StatementStatus},
    };
    use std::time::Duration;

    const BODY: &str = r#"{
        "applicationId": "app-1",
        "body": {"events": [
            {"event_id":"e-1","event_type":"t","event_name":"login","event_version":"1","event_timestamp":1,"app_version":"1.0","event_data":{"a":1}},
            {"event_id":"e-2","event_type":"t","event_name":"logout","event_version":"1","event_timestamp":2,"app_version":"1.0","event_data":{}},
            {"event_id":"e-3","event_type":"t","event_name":"purchase","event_version":"1","event_timestamp":3,"app_version":"1.0","event_data":{"sku":"x"}}
        ]}
    }"#;

    fn message(id: &str, body: Option<&str>) -> SqsMessage {
        SqsMessage {
            message_id: Some(id.to_string()),
            body: body.map(str::to_string),
            ..Default::default()
        }
    }

    fn metrics() -> (Arc<MemorySink>, Metrics) {
        let sink = Arc::new(MemorySink::default());
        let metrics = Metrics::new("GameAnalytics", "redshift-direct-ingest", sink.clone());
        (sink, metrics)
    }

    fn executor(service: &Arc<FakeStatementService>) -> StatementExecutor {
        StatementExecutor::new(
            service.clone(),
            ExecutionContext::new("events".into(), "wg".into(), "arn:secret".into()),
            PollPolicy {
                max_attempts: 5,
                poll_interval: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn successful_insert_reports_no_failures() {
        let service = Arc::new(FakeStatementService::new().script(vec![
            StatementStatus::new(StatementState::Started),
            StatementStatus::new(StatementState::Finished),
        ]));
        let (sink, metrics) = metrics();
        let event = SqsEvent {
            records: vec![message("m-1", Some(BODY))],
        };

        let response = handle(event, &executor(&service), &metrics).await.unwrap();

        assert!(response.batch_item_failures.is_empty());
        let documents = sink.documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["RecordsReceived"], 3.0);
        let submitted = service.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].statement_name.as_deref(), Some("BatchIngest"));
        assert_eq!(submitted[0].sql.matches("'app-1'").count(), 3);
    }

    #[tokio::test]
    async fn failed_statement_fails_only_its_record() {
        let service = Arc::new(
            FakeStatementService::new()
                .script(vec![StatementStatus::failed("value too long for type character varying(64)")])
                .script(vec![StatementStatus::new(StatementState::Finished)]),
        );
        let (sink, metrics) = metrics();
        let event = SqsEvent {
            records: vec![message("m-1", Some(BODY)), message("m-2", Some(BODY))],
        };

        let response = handle(event, &executor(&service), &metrics).await.unwrap();

        assert_eq!(response.batch_item_failures.len(), 1);
        assert_eq!(response.batch_item_failures[0].item_identifier, "m-1");
        assert_eq!(service.submitted().len(), 2);
        assert_eq!(sink.documents()[0]["RecordsReceived"], 3.0);
    }

    #[tokio::test]
    async fn malformed_body_is_a_failure() {
        let service = Arc::new(FakeStatementService::new());
        let (_, metrics) = metrics();
        let event = SqsEvent {
            records: vec![message("m-1", Some("not json"))],
        };

        let response = handle(event, &executor(&service), &metrics).await.unwrap();

        assert_eq!(response.batch_item_failures[0].item_identifier, "m-1");
        assert!(service.submitted().is_empty());
    }

    #[tokio::test]
    async fn empty_records_are_acknowledged() {
        let service = Arc::new(FakeStatementService::new());
        let (sink, metrics) = metrics();
        let event = SqsEvent {
            records: vec![
                message("m-1", None),
                message("m-2", Some(r#"{"applicationId":"app-1","body":{"events":[]}}"#)),
            ],
        };

        let response = handle(event, &executor(&service), &metrics).await.unwrap();

        assert!(response.batch_item_failures.is_empty());
        assert!(service.submitted().is_empty());
        assert!(sink.documents().is_empty());
    }

    #[tokio::test]
    async fn blank_bodies_are_acknowledged() {
        let service = Arc::new(FakeStatementService::new());
        let (_, metrics) = metrics();
        let event = SqsEvent {
            records: vec![message("m-empty", Some("")), message("m-blank", Some("  \n"))],
        };

        let response = handle(event, &executor(&service), &metrics).await.unwrap();

        assert!(response.batch_item_failures.is_empty());
        assert!(service.submitted().is_empty());
    }

    #[tokio::test]
    async fn timeout_fails_the_record() {
        let service = Arc::new(
            FakeStatementService::new().script(vec![StatementStatus::new(StatementState::Picked)]),
        );
        let (sink, metrics) = metrics();
        let event = SqsEvent {
            records: vec![message("m-1", Some(BODY))],
        };

        let response = handle(event, &executor(&service), &metrics).await.unwrap();

        assert_eq!(response.batch_item_failures.len(), 1);
        assert_eq!(service.total_polls(), 5);
        assert!(sink.documents().is_empty());
    }
}
