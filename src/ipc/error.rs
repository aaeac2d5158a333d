use crate::error::ClearanceError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn fail(id: &str, e: &ClearanceError) -> serde_json::Value {
    if let ClearanceError::UpstreamUnavailable(_) = e {
        tracing::error!(request_id = id, error = %e, "record store failure");
    }
    err(id, e.code(), e.to_string(), e.details())
}

pub fn respond(id: &str, r: Result<serde_json::Value, ClearanceError>) -> serde_json::Value {
    match r {
        Ok(result) => ok(id, result),
        Err(e) => fail(id, &e),
    }
}
