use std::{env, path::PathBuf, time::Duration};

use crate::{
    errors::Error,
    statements::{ExecutionContext, PollPolicy},
};

const DEFAULT_SQL_DIR: &str = "sql";

/// How events reach Redshift
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IngestMode {
    /// Streaming ingestion from Kinesis through an auto-refresh materialized view
    RealTimeKds,
    /// Batched INSERTs issued by the direct-ingest function
    DirectBatch,
    /// Redshift receives no events of its own
    None,
}

impl IngestMode {
    pub fn parse(value: &str) -> Self {
        match value {
            "REAL_TIME_KDS" => Self::RealTimeKds,
            "DIRECT_BATCH" => Self::DirectBatch,
            _ => Self::None,
        }
    }
}

/// Which analytics backend the pipeline was deployed with
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataPlatformMode {
    Redshift,
    Other,
}

impl DataPlatformMode {
    pub fn parse(value: &str) -> Self {
        match value {
            "REDSHIFT" => Self::Redshift,
            _ => Self::Other,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(&env::var("DATA_PLATFORM_MODE").unwrap_or_default())
    }
}

#[derive(Clone, Debug)]
pub struct RedshiftConfig {
    pub secret_arn: String,
    pub workgroup_name: String,
    pub database_name: String,
    pub role_arn: Option<String>,
    pub stream_name: Option<String>,
    pub ingest_mode: IngestMode,
    pub poll_max_attempts: Option<u32>,
    pub poll_interval: Option<Duration>,
    pub sql_dir: PathBuf,
}

impl RedshiftConfig {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &str| {
            optional(key).ok_or_else(|| Error::Config {
                key: key.to_string(),
            })
        };

        Ok(Self {
            secret_arn: required("SECRET_ARN")?,
            workgroup_name: required("WORKGROUP_NAME")?,
            database_name: required("DATABASE_NAME")?,
            role_arn: optional("REDSHIFT_ROLE_ARN"),
            stream_name: optional("STREAM_NAME"),
            ingest_mode: IngestMode::parse(&optional("INGEST_MODE").unwrap_or_default()),
            poll_max_attempts: optional("POLL_MAX_ATTEMPTS").and_then(|v| v.parse().ok()),
            poll_interval: optional("POLL_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
            sql_dir: optional("SQL_DIR")
                .unwrap_or(DEFAULT_SQL_DIR.to_string())
                .into(),
        })
    }

    pub fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::new(
            self.database_name.clone(),
            self.workgroup_name.clone(),
            self.secret_arn.clone(),
        )
    }

    /// Applies the environment overrides on top of a call site's default policy.
    pub fn poll_policy(&self, default: PollPolicy) -> PollPolicy {
        PollPolicy {
            max_attempts: self.poll_max_attempts.unwrap_or(default.max_attempts),
            poll_interval: self.poll_interval.unwrap_or(default.poll_interval),
        }
    }
}
