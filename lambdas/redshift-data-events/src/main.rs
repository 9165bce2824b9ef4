use analytics::{
    statements::{RedshiftDataService, StatementHandle, StatementService},
    MetricUnit, Metrics,
};
use aws_config::BehaviorVersion;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::Deserialize;
use serde_json::Value;

/// `detail` of a Redshift Data API "Statement Status Change" event
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementStatusChange {
    statement_id: String,
    #[serde(default)]
    statement_name: Option<String>,
    state: String,
    #[serde(default)]
    rows: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let service = RedshiftDataService::new(aws_sdk_redshiftdata::Client::new(&config));
    let metrics = Metrics::from_env("redshift-data-events");

    lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| async {
        handle(event.payload, &service, &metrics).await
    }))
    .await
}

async fn handle(
    event: Value,
    service: &dyn StatementService,
    metrics: &Metrics,
) -> Result<(), Error> {
    let detail: StatementStatusChange =
        serde_json::from_value(event.get("detail").cloned().ok_or("Missing event detail")?)?;

    let name = detail.statement_name.as_deref().unwrap_or("unnamed");

    match detail.state.as_str() {
        "FINISHED" => {
            let rows = detail.rows.unwrap_or(0);
            tracing::info!("Statement {} ({}) ingested {} records", detail.statement_id, name, rows);
            metrics.add_metric("RecordsIngested", MetricUnit::Count, rows as f64);
        }
        "FAILED" => {
            let handle = StatementHandle(detail.statement_id.clone());
            let status = service.describe_statement(&handle).await?;
            tracing::error!(
                "Failed statement {} ({}): {}",
                handle,
                name,
                status.error.as_deref().unwrap_or("no error message")
            );
            metrics.add_metric("FailedBatches", MetricUnit::Count, 1.0);
        }
        other => {
            tracing::info!("Statement {} is {}", detail.statement_id, other);
        }
    }

    metrics.publish_stored_metrics();
    Ok(())
}
