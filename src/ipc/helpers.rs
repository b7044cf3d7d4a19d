use chrono::NaiveDate;

use super::error::HandlerErr;

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Non-empty trimmed field required by a create/edit operation.
pub fn required_field(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if v.is_empty() {
        return Err(HandlerErr::new(
            "validation_failed",
            format!("{} is required", key),
        ));
    }
    Ok(v)
}

/// Calendar-day strings are exchanged as YYYY-MM-DD, never timestamps.
pub fn day_param(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let raw = required_str(params, key)?;
    if NaiveDate::parse_from_str(&raw, "%Y-%m-%d").is_err() {
        return Err(HandlerErr::new(
            "bad_params",
            format!("{} must be YYYY-MM-DD", key),
        ));
    }
    Ok(raw)
}

/// Optional day filter; empty string counts as absent.
pub fn optional_day(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match optional_str(params, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => {
            if NaiveDate::parse_from_str(&raw, "%Y-%m-%d").is_err() {
                return Err(HandlerErr::new(
                    "bad_params",
                    format!("{} must be YYYY-MM-DD", key),
                ));
            }
            Ok(Some(raw))
        }
    }
}
