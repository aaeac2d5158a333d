use crate::calc::{AggregationStrategy, CalcConfig};
use crate::db;
use crate::error::ClearanceError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Clearance,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "clearance" => Some(Self::Clearance),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Clearance => "setup.clearance",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Clearance => json!({
            "aggregation": AggregationStrategy::default().as_str(),
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Clearance => match k.as_str() {
                "aggregation" => {
                    let s = v
                        .as_str()
                        .ok_or_else(|| format!("{} must be string", k))?;
                    let strategy = AggregationStrategy::parse(s.trim()).ok_or_else(|| {
                        "aggregation must be one of: itemWeighted, subjectAveraged".to_string()
                    })?;
                    obj.insert(k.clone(), Value::String(strategy.as_str().to_string()));
                }
                _ => return Err(format!("unknown clearance field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

/// Engine settings for one request.
pub fn load_calc_config(conn: &rusqlite::Connection) -> Result<CalcConfig, ClearanceError> {
    let section = load_section(conn, SetupSection::Clearance)
        .map_err(|e| ClearanceError::UpstreamUnavailable(e.to_string()))?;
    let aggregation = section
        .get("aggregation")
        .and_then(|v| v.as_str())
        .and_then(AggregationStrategy::parse)
        .unwrap_or_default();
    Ok(CalcConfig { aggregation })
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let clearance = match load_section(conn, SetupSection::Clearance) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "upstream_unavailable", e.to_string(), None),
    };
    ok(&req.id, json!({ "clearance": clearance }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "upstream_unavailable", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "upstream_unavailable", e.to_string(), None);
    }
    tracing::info!(section = section_raw, "setup updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
