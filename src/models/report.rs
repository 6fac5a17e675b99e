use chrono::{DateTime, Utc};
use rocket::serde::json::serde_json::{self, Value};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use thiserror::Error;
use validator::Validate;

pub const INVALID_REPORT_MESSAGE: &str = "Dados do relato inválidos ou em falta (lat/lng).";

/// Why an incoming report event was refused. Checked before any external call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Corpo do pedido não é JSON válido: {0}")]
    Malformed(String),
    #[error("{}", INVALID_REPORT_MESSAGE)]
    MissingRecord,
    #[error("{}", INVALID_REPORT_MESSAGE)]
    MissingCoordinate(&'static str),
    #[error("{}", INVALID_REPORT_MESSAGE)]
    NotNumeric(&'static str),
    #[error("{}", INVALID_REPORT_MESSAGE)]
    OutOfRange(&'static str),
}

/// A fire report as delivered by the database webhook when a row is inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct Report {
    pub id: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Documented shape of the webhook payload. Parsing goes through [`Report::from_event`].
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReportEvent {
    pub record: ReportRecord,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReportRecord {
    pub id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Validate a `{ "record": { ... } }` event. Extra fields are ignored.
    pub fn from_event(event: &Value) -> Result<Self, ValidationError> {
        let record = event.get("record").filter(|r| r.is_object()).ok_or(ValidationError::MissingRecord)?;

        let report = Report {
            id: record_id(record),
            lat: coordinate(record, "lat")?,
            lng: coordinate(record, "lng")?,
            created_at: record
                .get("created_at")
                .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v.clone()).ok()),
        };

        report.validate().map_err(|errors| {
            let field = if errors.field_errors().contains_key("lat") { "lat" } else { "lng" };
            ValidationError::OutOfRange(field)
        })?;

        Ok(report)
    }

    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("?")
    }
}

fn record_id(record: &Value) -> Option<String> {
    match record.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

fn coordinate(record: &Value, field: &'static str) -> Result<f64, ValidationError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingCoordinate(field)),
        Some(Value::Number(n)) => n.as_f64().ok_or(ValidationError::NotNumeric(field)),
        Some(_) => Err(ValidationError::NotNumeric(field)),
    }
}
