//! JSON wire protocol shared by the server and the client.
//!
//! One request and one response per connection, each sent as a single
//! JSON object with no length prefix. The receiver performs one bounded
//! read of at most [`MAX_MESSAGE_SIZE`] bytes; anything beyond that is
//! truncated and will normally fail to decode.
//!
//! ```text
//! Request:  {"sexo":"M","edad":"30","altura":"1.75","peso":"70"}
//! Response: {"imc":22.86,"categoria":"Normal","mensaje":"...","sexo":"M","edad":30}
//!       or: {"error":"invalid message format"}
//! ```

use crate::bmi::Category;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::error::Category as JsonCategory;
use serde_json::{Map, Value};

/// Read budget for a single message, per direction.
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Error text sent back when a payload is not well-formed JSON.
pub const INVALID_FORMAT: &str = "invalid message format";

/// Wire keys of the request record.
pub const KEY_SEX: &str = "sexo";
pub const KEY_AGE: &str = "edad";
pub const KEY_HEIGHT: &str = "altura";
pub const KEY_MASS: &str = "peso";

/// Loosely-typed request as it arrives on the wire.
///
/// Every field is kept as the raw JSON value (normally a string) and may be
/// absent. Coercion into numbers happens in the processor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Request {
    #[serde(rename = "sexo", skip_serializing_if = "Option::is_none")]
    pub sex: Option<Value>,
    #[serde(rename = "edad", skip_serializing_if = "Option::is_none")]
    pub age: Option<Value>,
    #[serde(rename = "altura", skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(rename = "peso", skip_serializing_if = "Option::is_none")]
    pub mass: Option<Value>,
}

impl Request {
    /// Build a request the way the client sends it: every value as text.
    pub fn from_text(sex: &str, age: &str, height: &str, mass: &str) -> Self {
        Request {
            sex: Some(Value::String(sex.to_string())),
            age: Some(Value::String(age.to_string())),
            height: Some(Value::String(height.to_string())),
            mass: Some(Value::String(mass.to_string())),
        }
    }

    /// Pick the known keys out of a decoded object. Unknown keys are ignored.
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        Request {
            sex: fields.remove(KEY_SEX),
            age: fields.remove(KEY_AGE),
            height: fields.remove(KEY_HEIGHT),
            mass: fields.remove(KEY_MASS),
        }
    }
}

/// Successful BMI evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// BMI rounded to two decimals
    #[serde(rename = "imc")]
    pub bmi: f64,
    #[serde(rename = "categoria")]
    pub category: Category,
    #[serde(rename = "mensaje")]
    pub message: String,
    #[serde(rename = "sexo")]
    pub sex: String,
    #[serde(rename = "edad")]
    pub age: i64,
}

/// Response record. The two variants are told apart by the `error` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Error { error: String },
    Success(Report),
}

impl Response {
    /// Error-variant response with the given text.
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }

    /// Response sent for payloads that are not well-formed JSON.
    pub fn invalid_format() -> Self {
        Response::error(INVALID_FORMAT)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Error { .. } => "error",
            Response::Success(_) => "success",
        }
    }
}

/// Payload decoding errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not well-formed JSON: bad syntax, truncated input or invalid UTF-8.
    #[error("malformed payload: {0}")]
    Malformed(serde_json::Error),
    /// Well-formed JSON whose shape does not fit the expected record.
    #[error("unexpected message shape: {0}")]
    Shape(serde_json::Error),
    /// Well-formed JSON that is not an object.
    #[error("expected a JSON object, got {0}")]
    NotARecord(&'static str),
}

impl DecodeError {
    /// True when the payload itself could not be parsed.
    pub fn is_malformed(&self) -> bool {
        matches!(self, DecodeError::Malformed(_))
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            JsonCategory::Data => DecodeError::Shape(e),
            _ => DecodeError::Malformed(e),
        }
    }
}

/// Serialize a record into a single wire payload.
pub fn encode<T: Serialize>(message: &T) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(message).map(Bytes::from)
}

/// Deserialize a wire payload into a typed record.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Decode a request payload. The payload must be a JSON object; its known
/// keys are kept as raw values.
pub fn decode_request(payload: &[u8]) -> Result<Request, DecodeError> {
    match decode::<Value>(payload)? {
        Value::Object(fields) => Ok(Request::from_fields(fields)),
        other => Err(DecodeError::NotARecord(value_kind(&other))),
    }
}

/// JSON type name of a value, for diagnostics.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
