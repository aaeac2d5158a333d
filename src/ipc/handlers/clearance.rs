use crate::calc::{with_student, ClearanceEngine};
use crate::db::SqliteStore;
use crate::error::{ClearanceError, Result};
use crate::ipc::handlers::setup::load_calc_config;
use crate::ipc::helpers::{get_required_str, with_store};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClearanceResult, ClearanceStatus};
use serde_json::{json, Value};

fn reading_json(student_id: &str, subject_id: Option<&str>, r: Option<ClearanceResult>) -> Value {
    let found = r.is_some();
    let r = r.unwrap_or(ClearanceResult {
        percentage: 0,
        status: ClearanceStatus::NotStarted,
    });
    let mut out = json!({
        "studentId": student_id,
        "found": found,
        "percentage": r.percentage,
        "status": r.status,
    });
    if let Some(s) = subject_id {
        out["subjectId"] = json!(s);
    }
    out
}

fn clearance_subject(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let student_id = get_required_str(params, "studentId")?;
    let subject_id = get_required_str(params, "subjectId")?;
    let engine = ClearanceEngine::new(store, load_calc_config(store.conn())?);
    let r = with_student(store, student_id, |s| engine.subject_clearance(s, subject_id))?;
    Ok(reading_json(student_id, Some(subject_id), r))
}

fn clearance_overall(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let student_id = get_required_str(params, "studentId")?;
    let config = load_calc_config(store.conn())?;
    let engine = ClearanceEngine::new(store, config);
    let r = with_student(store, student_id, |s| engine.overall_clearance(s))?;
    let mut out = reading_json(student_id, None, r);
    out["aggregation"] = json!(config.aggregation);
    Ok(out)
}

fn clearance_student(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let student_id = get_required_str(params, "studentId")?;
    let config = load_calc_config(store.conn())?;
    let engine = ClearanceEngine::new(store, config);
    match with_student(store, student_id, |s| engine.student_breakdown(s))? {
        Some(b) => {
            let mut out = serde_json::to_value(&b)
                .map_err(|e| ClearanceError::UpstreamUnavailable(e.to_string()))?;
            out["found"] = json!(true);
            Ok(out)
        }
        None => Ok(json!({
            "studentId": student_id,
            "found": false,
            "aggregation": config.aggregation,
            "subjects": [],
            "overall": { "percentage": 0, "status": ClearanceStatus::NotStarted },
        })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "clearance.subject" => Some(with_store(state, req, clearance_subject)),
        "clearance.overall" => Some(with_store(state, req, clearance_overall)),
        "clearance.student" => Some(with_store(state, req, clearance_student)),
        _ => None,
    }
}
