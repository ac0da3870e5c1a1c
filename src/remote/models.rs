use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::remote_error::RemoteError;
use crate::domain::Value;

// pipeline request
//  ├── baton            (null on the first request of a stream)
//  └── requests[]
//       ├── execute
//       │    └── stmt
//       │         ├── sql
//       │         ├── args[]   (positional values)
//       │         └── want_rows
//       └── close
//
// pipeline response
//  ├── baton            (pass back on the next request)
//  ├── base_url         (where the next request should go, if set)
//  └── results[]
//       ├── ok    → response { execute { result } | close }
//       └── error → error { message, code }

#[derive(Debug, Serialize)]
pub struct PipelineRequest<'a> {
    pub baton: Option<&'a str>,
    pub requests: Vec<StreamRequest>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRequest {
    Execute { stmt: Stmt },
    Close,
}

#[derive(Debug, Serialize)]
pub struct Stmt {
    pub sql: String,
    pub args: Vec<WireValue>,
    pub want_rows: bool,
}

/// A value as it travels on the wire. Integers are sent as decimal strings
/// so 64-bit values survive JSON number precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireValue {
    Null,
    Integer { value: String },
    Float { value: f64 },
    Text { value: String },
    Blob { base64: String },
}

impl From<&Value> for WireValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => WireValue::Null,
            Value::Integer(i) => WireValue::Integer {
                value: i.to_string(),
            },
            Value::Real(f) => WireValue::Float { value: *f },
            Value::Text(s) => WireValue::Text { value: s.clone() },
            Value::Blob(b) => WireValue::Blob {
                base64: STANDARD_NO_PAD.encode(b),
            },
        }
    }
}

impl TryFrom<WireValue> for Value {
    type Error = RemoteError;

    fn try_from(v: WireValue) -> Result<Self, Self::Error> {
        Ok(match v {
            WireValue::Null => Value::Null,
            WireValue::Integer { value } => Value::Integer(
                value
                    .parse()
                    .map_err(|e| RemoteError::Decode(format!("integer {value:?}: {e}")))?,
            ),
            WireValue::Float { value } => Value::Real(value),
            WireValue::Text { value } => Value::Text(value),
            WireValue::Blob { base64 } => Value::Blob(
                STANDARD_NO_PAD
                    .decode(base64.trim_end_matches('='))
                    .map_err(|e| RemoteError::Decode(format!("blob: {e}")))?,
            ),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PipelineResponse {
    pub baton: Option<String>,
    pub base_url: Option<String>,
    pub results: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: StreamError },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamResponse {
    Execute { result: StmtResult },
    Close,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct StmtResult {
    #[serde(default)]
    pub cols: Vec<Col>,
    #[serde(default)]
    pub rows: Vec<Vec<WireValue>>,
    #[serde(default)]
    pub affected_row_count: u64,
    pub last_insert_rowid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Col {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamError {
    pub message: String,
    pub code: Option<String>,
}
