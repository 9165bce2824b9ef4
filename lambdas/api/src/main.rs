use analytics::{
    statements::{run_setup, PollPolicy, RedshiftDataService, StatementExecutor},
    DataPlatformMode, RedshiftConfig,
};
use aws_config::BehaviorVersion;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
struct AppState {
    redshift: Option<Arc<Redshift>>,
}

struct Redshift {
    config: RedshiftConfig,
    executor: StatementExecutor,
}

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    // Redshift settings only exist when the pipeline was deployed with it.
    let redshift = match DataPlatformMode::from_env() {
        DataPlatformMode::Redshift => {
            let config = RedshiftConfig::from_env()?;
            let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            let service = RedshiftDataService::new(aws_sdk_redshiftdata::Client::new(&aws_config));
            let executor = StatementExecutor::new(
                Arc::new(service),
                config.execution_context(),
                config.poll_policy(PollPolicy::admin()),
            );
            Some(Arc::new(Redshift { config, executor }))
        }
        DataPlatformMode::Other => None,
    };

    let app = router(AppState { redshift });

    let app = tower::ServiceBuilder::new()
        .layer(axum_aws_lambda::LambdaLayer::default())
        .service(app);

    lambda_http::run(app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/admin/redshift/setup", post(setup_redshift))
        .with_state(state)
}

// Create the schema, materialized view and reporting views
async fn setup_redshift(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let redshift = state.redshift.ok_or((
        StatusCode::BAD_REQUEST,
        Json(json!({
            "code": 400,
            "error": "BadRequest",
            "message": "Redshift is not deployed and can not be configured.",
        })),
    ))?;

    run_setup(&redshift.executor, &redshift.config)
        .await
        .map_err(|e| {
            tracing::error!("Redshift setup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "code": 500,
                    "error": "InternalFailure",
                    "message": e.to_string(),
                })),
            )
        })?;

    Ok(Json(json!({ "Result": "OK" })))
}
