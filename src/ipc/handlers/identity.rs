use crate::calc::{require_student, ClearanceEngine};
use crate::db::SqliteStore;
use crate::error::Result;
use crate::identity::RequestContext;
use crate::ipc::handlers::{approvals, finance, hall, setup::load_calc_config};
use crate::ipc::helpers::{caller, with_store};
use crate::ipc::types::{AppState, Request};
use crate::model::Role;
use crate::store::RecordStore;
use serde_json::{json, Value};

fn identity_resolve(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    Ok(json!({ "context": ctx }))
}

fn student_dashboard(store: &SqliteStore<'_>, ctx: &RequestContext) -> Result<Value> {
    let student = require_student(store, &ctx.entity_id)?;
    let engine = ClearanceEngine::new(store, load_calc_config(store.conn())?);
    let breakdown = engine.student_breakdown(&student)?;
    Ok(json!({
        "clearance": breakdown,
        "usesApprovalWorkflow": student.uses_approval_workflow(),
        "books": store.get_books_for_student(&student.id)?,
        "materials": store.get_materials_for_student(&student.id)?,
        "financial": store.get_financial_overview(&student.id)?,
        "room": store.get_student_room(&student.id)?,
    }))
}

/// Role-specific landing data for whoever is calling right now.
fn dashboard_open(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    let data = match ctx.role {
        Role::Student => student_dashboard(store, &ctx)?,
        Role::Teacher | Role::Lab | Role::Coach => {
            json!({ "pending": approvals::pending_for(store, &ctx)? })
        }
        Role::Finance => finance::summary_json(store)?,
        Role::Hall => hall::hall_students_for(store, &ctx.entity_id)?,
    };
    tracing::debug!(role = ctx.role.as_str(), entity_id = %ctx.entity_id, "dashboard opened");
    Ok(json!({
        "dashboard": ctx.role.as_str(),
        "context": ctx,
        "data": data,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "identity.resolve" => Some(with_store(state, req, identity_resolve)),
        "dashboard.open" => Some(with_store(state, req, dashboard_open)),
        _ => None,
    }
}
