use crate::db::SqliteStore;
use crate::error::{ClearanceError, Result};
use crate::identity::{self, RequestContext};
use crate::ipc::error::{err, respond};
use crate::ipc::types::{AppState, Request};
use crate::model::ItemKind;
use crate::store::RecordStore;
use serde_json::Value;

pub fn get_required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    match params.get(key).and_then(|v| v.as_str()).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ClearanceError::validation(format!("missing {}", key))),
    }
}

pub fn get_optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok(if s.is_empty() { None } else { Some(s) })
        }
        Some(_) => Err(ClearanceError::validation(format!("{} must be a string", key))),
    }
}

pub fn get_optional_bool(params: &Value, key: &str) -> Result<Option<bool>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ClearanceError::validation(format!("{} must be boolean", key))),
    }
}

pub fn get_optional_f64(params: &Value, key: &str) -> Result<Option<f64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| ClearanceError::validation(format!("{} must be a number", key))),
    }
}

pub fn get_optional_i64(params: &Value, key: &str) -> Result<Option<i64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| ClearanceError::validation(format!("{} must be an integer", key))),
    }
}

pub fn get_kind(params: &Value) -> Result<ItemKind> {
    let raw = get_required_str(params, "kind")?;
    ItemKind::parse(raw).ok_or_else(|| {
        ClearanceError::validation(format!("kind must be one of: book, material (got {:?})", raw))
    })
}

/// Caller-supplied id, or a fresh v4 uuid.
pub fn id_or_new(params: &Value, key: &str) -> Result<String> {
    Ok(get_optional_str(params, key)?
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()))
}

/// Resolves `params.authUid` against the store for this request only.
pub fn caller<S: RecordStore + ?Sized>(store: &S, params: &Value) -> Result<RequestContext> {
    let auth_uid = match params.get("authUid").and_then(|v| v.as_str()) {
        Some(s) => s,
        None => return Err(ClearanceError::Unauthorized("missing authUid".into())),
    };
    identity::resolve(store, auth_uid)
}

/// Runs `f` against a store over the open workspace and wraps the outcome.
pub fn with_store<F>(state: &mut AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&SqliteStore<'_>, &Value) -> Result<Value>,
{
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(&req.id, f(&SqliteStore::new(conn), &req.params))
}
