use crate::{errors::Error, event::GameEvent};

use super::Statement;

pub const STATEMENT_NAME: &str = "BatchIngest";

const INSERT_PREFIX: &str = "INSERT INTO event_data (event_id, event_type, event_name, event_version, event_timestamp, app_version, application_id, event_data) VALUES";

/// One multi-row INSERT covering every event of a queue message
#[derive(Clone, Debug, PartialEq)]
pub struct InsertStatement {
    pub sql: String,
    pub rows: usize,
}

impl InsertStatement {
    /// Returns `None` for an empty batch.
    pub fn build(application_id: &str, events: &[GameEvent]) -> Result<Option<Self>, Error> {
        if events.is_empty() {
            return Ok(None);
        }

        let values = events
            .iter()
            .map(|event| row(application_id, event))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");

        Ok(Some(Self {
            sql: format!("{} {};", INSERT_PREFIX, values),
            rows: events.len(),
        }))
    }

    pub fn into_statement(self) -> Statement {
        Statement::named(STATEMENT_NAME, self.sql)
    }
}

fn row(application_id: &str, event: &GameEvent) -> Result<String, Error> {
    let event_data = serde_json::to_string(&event.event_data)?;
    let timestamp = event.event_timestamp.to_string();

    let fields = [
        event.event_id.as_str(),
        event.event_type.as_str(),
        event.event_name.as_str(),
        event.event_version.as_str(),
        timestamp.as_str(),
        event.app_version.as_str(),
        application_id,
        event_data.as_str(),
    ];

    let quoted: Vec<String> = fields.iter().map(|f| literal(f)).collect();
    Ok(format!("({})", quoted.join(",")))
}

/// Quotes a value as a Redshift string literal.
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}
