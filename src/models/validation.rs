//! Upsert payload validation, shared by the API handlers and the form controller.
//!
//! Works on raw `serde_json::Value` so that a wrongly-typed field still yields an
//! itemized field error instead of a whole-body deserialization failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::credential::CredentialInput;

pub const MAX_PORT: i64 = u16::MAX as i64;

/// One failed field, in wire naming (`databaseName`, not `database_name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a `{host, port, databaseName, username, password?}` body.
///
/// Every field is checked; all failures are returned together.
pub fn validate_payload(body: &Value) -> Result<CredentialInput, Vec<FieldError>> {
    let Some(obj) = body.as_object() else {
        return Err(vec![FieldError::new("body", "expected a JSON object")]);
    };

    let mut errors = Vec::new();

    let host = required_string(obj, "host", "Host", &mut errors);
    let port = match coerce_port(obj.get("port").unwrap_or(&Value::Null)) {
        Ok(p) => Some(p),
        Err(msg) => {
            errors.push(FieldError::new("port", msg));
            None
        }
    };
    let database_name = required_string(obj, "databaseName", "Database name", &mut errors);
    let username = required_string(obj, "username", "Username", &mut errors);
    let password = match obj.get("password") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new("password", "Password must be a string"));
            None
        }
    };

    match (host, port, database_name, username) {
        (Some(host), Some(port), Some(database_name), Some(username)) if errors.is_empty() => {
            Ok(CredentialInput {
                host,
                port,
                database_name,
                username,
                password,
            })
        }
        _ => Err(errors),
    }
}

fn required_string(
    obj: &Map<String, Value>,
    key: &str,
    label: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            errors.push(FieldError::new(key, format!("{} is required", label)));
            None
        }
        Some(_) => {
            errors.push(FieldError::new(key, format!("{} must be a string", label)));
            None
        }
    }
}

/// Coerce a JSON number or numeric string into a TCP port.
pub fn coerce_port(value: &Value) -> Result<u16, String> {
    let n = match value {
        Value::Null => return Err("Port is required".into()),
        Value::Number(num) => match num.as_i64() {
            Some(i) => i,
            None => integral(num.as_f64())?,
        },
        Value::String(s) => coerce_port_text(s)?,
        _ => return Err("Port must be a number".into()),
    };

    if n <= 0 {
        return Err("Port must be a positive integer".into());
    }
    if n > MAX_PORT {
        return Err(format!("Port must be at most {}", MAX_PORT));
    }
    Ok(n as u16)
}

fn coerce_port_text(raw: &str) -> Result<i64, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("Port is required".into());
    }
    if let Ok(i) = s.parse::<i64>() {
        return Ok(i);
    }
    match s.parse::<f64>() {
        Ok(f) => integral(Some(f)),
        Err(_) => Err("Port must be a number".into()),
    }
}

fn integral(f: Option<f64>) -> Result<i64, String> {
    match f {
        // huge magnitudes are clamped so the range checks report them
        Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f.clamp(-1e15, 1e15) as i64),
        Some(f) if f.is_finite() => Err("Port must be an integer".into()),
        _ => Err("Port must be a number".into()),
    }
}
