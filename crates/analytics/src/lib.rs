//! Game Analytics Redshift Integration

/// Environment configuration
pub mod config;

/// Errors
pub mod errors;

/// Game events as delivered by the ingest queue
pub mod event;

/// CloudWatch embedded metrics
pub mod metrics;

/// Redshift Data API statements
pub mod statements;

pub use config::{DataPlatformMode, IngestMode, RedshiftConfig};
pub use errors::Error;
pub use event::{GameEvent, IngestMessage};
pub use metrics::{MetricUnit, Metrics};
