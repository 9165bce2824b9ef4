//! CloudWatch metrics in the embedded metric format (EMF).
//!
//! Metrics are accumulated during an invocation and flushed as one JSON
//! document per [`Metrics::publish_stored_metrics`]. Lambda ships stdout to
//! CloudWatch Logs, which extracts the values into metrics.

use std::{
    collections::BTreeMap,
    env,
    io::Write,
    sync::{Arc, Mutex, PoisonError},
};

use serde::Serialize;
use serde_json::{json, Map, Value};

const DEFAULT_NAMESPACE: &str = "GameAnalyticsPipeline";
const SERVICE_DIMENSION: &str = "service";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum MetricUnit {
    Count,
}

/// Destination of finished EMF documents
pub trait MetricsSink: Send + Sync {
    fn emit(&self, document: &Value);
}

/// One line per document on stdout, where the Lambda log agent picks it up
pub struct StdoutSink;

impl MetricsSink for StdoutSink {
    fn emit(&self, document: &Value) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", document) {
            tracing::warn!("Failed to write metrics: {}", e);
        }
    }
}

pub struct Metrics {
    namespace: String,
    service: String,
    sink: Arc<dyn MetricsSink>,
    stored: Mutex<BTreeMap<String, (MetricUnit, f64)>>,
}

impl Metrics {
    pub fn new(namespace: impl Into<String>, service: impl Into<String>, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            namespace: namespace.into(),
            service: service.into(),
            sink,
            stored: Mutex::new(BTreeMap::new()),
        }
    }

    /// Namespace and service come from the Powertools variables the stack sets.
    pub fn from_env(default_service: &str) -> Self {
        let namespace = env::var("POWERTOOLS_METRICS_NAMESPACE")
            .unwrap_or(DEFAULT_NAMESPACE.to_string());
        let service = env::var("POWERTOOLS_SERVICE_NAME")
            .unwrap_or(default_service.to_string());

        Self::new(namespace, service, Arc::new(StdoutSink))
    }

    /// Adds to the stored value; repeated names are summed.
    pub fn add_metric(&self, name: &str, unit: MetricUnit, value: f64) {
        let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        stored
            .entry(name.to_string())
            .and_modify(|(_, total)| *total += value)
            .or_insert((unit, value));
    }

    /// Emits and clears the stored metrics. Nothing is emitted when none are stored.
    pub fn publish_stored_metrics(&self) {
        let stored = std::mem::take(
            &mut *self.stored.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if stored.is_empty() {
            return;
        }

        let definitions: Vec<Value> = stored
            .iter()
            .map(|(name, (unit, _))| json!({ "Name": name, "Unit": unit }))
            .collect();

        let mut document = Map::new();
        document.insert(
            "_aws".to_string(),
            json!({
                "Timestamp": chrono::Utc::now().timestamp_millis(),
                "CloudWatchMetrics": [{
                    "Namespace": self.namespace,
                    "Dimensions": [[SERVICE_DIMENSION]],
                    "Metrics": definitions,
                }],
            }),
        );
        document.insert(SERVICE_DIMENSION.to_string(), json!(self.service));
        for (name, (_, value)) in stored {
            document.insert(name, json!(value));
        }

        self.sink.emit(&Value::Object(document));
    }
}

/// Keeps emitted documents in memory
#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
pub struct MemorySink {
    documents: Mutex<Vec<Value>>,
}

#[cfg(any(test, feature = "test-util"))]
impl MemorySink {
    pub fn documents(&self) -> Vec<Value> {
        self.documents.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl MetricsSink for MemorySink {
    fn emit(&self, document: &Value) {
        self.documents.lock().unwrap().push(document.clone());
    }
}
