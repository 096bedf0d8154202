use serde_json::Value;
use thiserror::Error;

use crate::core::credentials::AuthError;

/// Fields every record must carry, in the column order they are written.
pub const REQUIRED_FIELDS: [&str; 3] = ["column1", "column2", "column3"];

/// One spreadsheet cell. Values are passed through untouched.
pub type Cell = Value;

/// One spreadsheet row, always `REQUIRED_FIELDS.len()` cells wide.
pub type Row = Vec<Cell>;

/// The full body returned by the source endpoint: an ordered list of records.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload(pub Vec<Value>);

impl Payload {
    /// Turns a decoded source body into a payload.
    ///
    /// `null`, `[]` and `{}` carry no data. Any other non-array body is a
    /// shape the mapper cannot handle.
    pub fn from_json(body: Value) -> Result<Self, FetchDegraded> {
        match body {
            Value::Null => Err(FetchDegraded::Empty),
            Value::Array(records) if records.is_empty() => Err(FetchDegraded::Empty),
            Value::Array(records) => Ok(Self(records)),
            Value::Object(map) if map.is_empty() => Err(FetchDegraded::Empty),
            other => Err(FetchDegraded::Shape(format!(
                "expected a JSON array of records, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn records(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Fixed destination of every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    pub spreadsheet_id: String,
    pub range: String,
}

/// Loop state threaded from one cycle to the next.
///
/// `snapshot` is the last payload that made it into the sheet. It only ever
/// advances after a successful push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub snapshot: Option<Payload>,
}

/// What a single cycle ended up doing.
#[allow(dead_code)]
#[derive(Debug)]
pub enum CycleOutcome {
    /// The source had nothing for us this time.
    NoData(FetchDegraded),
    /// Payload equals the snapshot; nothing pushed.
    Unchanged,
    /// Rows were written and the snapshot advanced.
    Synced { rows: usize },
    /// The cycle was abandoned; the snapshot was left alone.
    Skipped(SyncError),
}

// ============================================================================
// ERRORS
// ============================================================================

/// Reasons the source read produced no payload. None of these are fatal.
#[derive(Debug, Error)]
pub enum FetchDegraded {
    #[error("source returned status {0}")]
    Status(u16),

    #[error("source data is empty")]
    Empty,

    #[error("source request failed: {0}")]
    Transport(String),

    #[error("source body could not be decoded: {0}")]
    Shape(String),
}

/// A record that cannot be flattened into a row.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("record {index} is missing field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },
}

impl SchemaError {
    /// Name of the offending field, when the failure is a missing one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SchemaError::MissingField { field, .. } => Some(*field),
            SchemaError::NotAnObject { .. } => None,
        }
    }
}

/// The destination rejected or never received the write.
#[derive(Debug, Error)]
pub enum PushFailure {
    #[error("sheet update returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("sheet update request failed: {0}")]
    Transport(String),
}

/// Every way a cycle can go wrong after the fetch.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("error in data format: {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to update sheet: {0}")]
    Push(#[from] PushFailure),
}
