use std::{fs, path::Path};

use crate::{
    config::{IngestMode, RedshiftConfig},
    errors::Error,
};

use super::{Statement, StatementExecutor};

/// Failure message of the materialized view creation on a second setup run
pub const EVENT_DATA_EXISTS: &str = "relation \"event_data\" already exists";

pub const DIRECT_BATCH_SETUP_FILE: &str = "direct_batch_setup.sql";
pub const VIEWS_DIR: &str = "views";

/// Ordered statements that prepare Redshift for the configured ingest mode
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetupPlan {
    pub statements: Vec<Statement>,
}

impl SetupPlan {
    pub fn build(config: &RedshiftConfig) -> Result<Self, Error> {
        let mut statements = match config.ingest_mode {
            IngestMode::RealTimeKds => {
                let role_arn = config.role_arn.as_deref().ok_or_else(|| Error::Config {
                    key: "REDSHIFT_ROLE_ARN".to_string(),
                })?;
                let stream_name = config.stream_name.as_deref().ok_or_else(|| Error::Config {
                    key: "STREAM_NAME".to_string(),
                })?;
                real_time_statements(role_arn, stream_name)
            }
            IngestMode::DirectBatch => {
                let path = config.sql_dir.join(DIRECT_BATCH_SETUP_FILE);
                vec![Statement::named(DIRECT_BATCH_SETUP_FILE, read_sql(&path)?)]
            }
            IngestMode::None => Vec::new(),
        };

        statements.extend(load_statement_dir(&config.sql_dir.join(VIEWS_DIR))?);

        Ok(Self { statements })
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Builds the plan for `config` and runs it, stopping at the first failure.
/// Returns how many statements ran.
pub async fn run_setup(executor: &StatementExecutor, config: &RedshiftConfig) -> Result<usize, Error> {
    let plan = SetupPlan::build(config)?;
    tracing::info!(
        "Setting up Redshift for {:?}: {} statements",
        config.ingest_mode,
        plan.len()
    );

    executor.run_sequential(&plan.statements).await?;

    tracing::info!("Redshift setup complete");
    Ok(plan.len())
}

/// Kinesis external schema and the auto-refresh view over the event stream
pub fn real_time_statements(role_arn: &str, stream_name: &str) -> Vec<Statement> {
    let schema = format!(
        "CREATE EXTERNAL SCHEMA IF NOT EXISTS kds FROM KINESIS IAM_ROLE '{}';",
        role_arn
    );

    // Materialized views have no IF NOT EXISTS; a rerun fails with EVENT_DATA_EXISTS.
    let view = format!(
        r#"CREATE MATERIALIZED VIEW event_data AUTO REFRESH YES AS SELECT
    refresh_time,
    approximate_arrival_timestamp,
    partition_key,
    shard_id,
    sequence_number,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'event','event_id',true)::TEXT as event_id,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'event','event_type',true)::TEXT as event_type,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'event','event_name',true)::TEXT as event_name,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'event','event_version',true)::TEXT as event_version,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'event','event_timestamp',true)::BIGINT as event_timestamp,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'event','app_version',true)::TEXT as app_version,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'application_id',true)::TEXT as application_id,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'event','application_name',true)::TEXT as application_name,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'event','event_data',true)::TEXT as event_data,
    json_extract_path_text(from_varbyte(kinesis_data,'utf-8'),'event','metadata',true)::TEXT as metadata
FROM kds."{}";"#,
        stream_name
    );

    vec![
        Statement::named("kds_schema", schema),
        Statement::named("event_data_view", view).ignoring(EVENT_DATA_EXISTS),
    ]
}

/// One statement per file in `dir`, ordered by file name.
/// A missing directory yields no statements.
pub fn load_statement_dir(dir: &Path) -> Result<Vec<Statement>, Error> {
    if !dir.is_dir() {
        tracing::warn!("No statement directory at {}", dir.display());
        return Ok(Vec::new());
    }

    let mut paths = fs::read_dir(dir)
        .map_err(|source| io_error(dir, source))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| io_error(dir, source))?;
    paths.retain(|p| p.is_file());
    paths.sort();

    let mut statements = Vec::with_capacity(paths.len());
    for path in paths {
        let sql = read_sql(&path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if sql.trim().is_empty() {
            tracing::warn!("Skipping empty statement file {}", name);
            continue;
        }
        statements.push(Statement::named(name, sql));
    }

    Ok(statements)
}

fn read_sql(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.display().to_string(),
        source,
    }
}
