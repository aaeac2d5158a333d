use crate::db::SqliteStore;
use crate::error::{ClearanceError, Result};
use crate::finance::{self, FinancePatch};
use crate::ipc::helpers::{
    caller, get_optional_f64, get_optional_str, get_required_str, with_store,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Role;
use crate::store::RecordStore;
use serde_json::{json, Value};

fn finance_get(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    let student_id = match ctx.role {
        Role::Finance => get_required_str(params, "studentId")?.to_string(),
        Role::Student => {
            let requested = get_optional_str(params, "studentId")?;
            if requested.is_some_and(|s| s != ctx.entity_id) {
                return Err(ClearanceError::Forbidden(
                    "students may only read their own financial record".into(),
                ));
            }
            ctx.entity_id.clone()
        }
        other => {
            return Err(ClearanceError::Forbidden(format!(
                "role {} may not read financial records",
                other.as_str()
            )))
        }
    };
    let record = store
        .get_financial_overview(&student_id)?
        .ok_or_else(|| ClearanceError::not_found("financial record", student_id.as_str()))?;
    Ok(json!({ "record": record }))
}

fn finance_update(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    ctx.require_role(&[Role::Finance])?;
    let student_id = get_required_str(params, "studentId")?;
    let patch = FinancePatch {
        amount_paid: get_optional_f64(params, "amountPaid")?,
        balance: get_optional_f64(params, "balance")?,
        status: get_optional_str(params, "status")?.map(str::to_string),
    };

    let current = store
        .get_financial_overview(student_id)?
        .ok_or_else(|| ClearanceError::not_found("financial record", student_id))?;
    let next = finance::apply_update(&current, &patch)?;
    if !store.update_finance(&next)? {
        return Err(ClearanceError::not_found("financial record", student_id));
    }
    tracing::info!(
        student_id,
        amount_paid = next.amount_paid,
        balance = next.balance,
        status = %next.status,
        officer = %ctx.entity_id,
        "financial record updated"
    );
    Ok(json!({ "record": next }))
}

fn finance_list(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    ctx.require_role(&[Role::Finance])?;
    let rows: Vec<Value> = store
        .list_finance()?
        .into_iter()
        .map(|(record, student)| {
            json!({
                "displayName": student.display_name(),
                "studentId": student.id,
                "yearGroup": student.year_group,
                "record": record,
            })
        })
        .collect();
    Ok(json!({ "rows": rows }))
}

pub(crate) fn summary_json(store: &SqliteStore<'_>) -> Result<Value> {
    let rows = store.list_finance()?;
    let summary = finance::summarize(rows.iter().map(|(r, _)| r));
    Ok(json!({ "summary": summary, "recordCount": rows.len() }))
}

fn finance_summary(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    ctx.require_role(&[Role::Finance])?;
    summary_json(store)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "finance.get" => Some(with_store(state, req, finance_get)),
        "finance.update" => Some(with_store(state, req, finance_update)),
        "finance.list" => Some(with_store(state, req, finance_list)),
        "finance.summary" => Some(with_store(state, req, finance_summary)),
        _ => None,
    }
}
