//! Response envelope decoding
//!
//! The CRD service has wrapped payloads in `result` (current) and `data`
//! (legacy) over its history. Both are accepted here and nowhere else:
//! callers get the inner body and never branch on the wrapper again.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// A decoded response wrapper
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{"result": ...}`
    Modern(Value),
    /// `{"data": ...}`
    Legacy(Value),
}

impl Envelope {
    /// Classify a response body. `result` wins when both keys are present.
    pub fn decode(body: Value) -> Result<Self, ApiError> {
        let Value::Object(mut map) = body else {
            return Err(ApiError::Protocol(
                "response body is not a JSON object".to_string(),
            ));
        };

        match map.remove("result") {
            Some(inner) if !inner.is_null() => Ok(Self::Modern(inner)),
            _ => match map.remove("data") {
                Some(inner) if !inner.is_null() => Ok(Self::Legacy(inner)),
                _ => Err(ApiError::Protocol(
                    "response has neither `result` nor `data`".to_string(),
                )),
            },
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    pub fn into_body(self) -> Value {
        match self {
            Self::Modern(body) | Self::Legacy(body) => body,
        }
    }

    /// Decode the inner body into a typed value
    pub fn parse<T: DeserializeOwned>(self, what: &str) -> Result<T, ApiError> {
        serde_json::from_value(self.into_body())
            .map_err(|e| ApiError::Protocol(format!("malformed {what}: {e}")))
    }
}

/// `serviceEntityID` list carried by the list endpoint.
///
/// Unlike detail and create responses, a list response without a payload
/// (empty body, `{"result": null}`, a bare status object) means nothing is
/// listed.
pub fn entity_ids(body: Value) -> Result<Vec<i64>, ApiError> {
    if !has_payload(&body) {
        return Ok(Vec::new());
    }
    let inner = Envelope::decode(body)?.into_body();
    match inner.get("serviceEntityID") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(ids) => serde_json::from_value(ids.clone())
            .map_err(|e| ApiError::Protocol(format!("malformed serviceEntityID list: {e}"))),
    }
}

/// Id of a freshly created resource.
///
/// `result.id` is the canonical shape; the others are what older deploy
/// types have been observed to return.
pub fn created_id(body: &Value) -> Result<i64, ApiError> {
    const PATHS: [&[&str]; 6] = [
        &["result", "id"],
        &["result", "ID"],
        &["data", "id"],
        &["data", "ID"],
        &["ID"],
        &["id"],
    ];

    PATHS
        .iter()
        .find_map(|path| lookup(body, path).and_then(as_id))
        .ok_or_else(|| ApiError::Protocol(format!("no id in create response: {body}")))
}

fn has_payload(body: &Value) -> bool {
    match body {
        Value::Null => false,
        Value::Object(map) => ["result", "data"]
            .iter()
            .any(|key| map.get(*key).is_some_and(|inner| !inner.is_null())),
        // Anything else is malformed and left for `decode` to report
        _ => true,
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(key))
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
