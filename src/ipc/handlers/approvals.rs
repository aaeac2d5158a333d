use crate::db::SqliteStore;
use crate::error::{ClearanceError, Result};
use crate::identity::RequestContext;
use crate::ipc::helpers::{caller, get_kind, get_optional_str, get_required_str, with_store};
use crate::ipc::types::{AppState, Request};
use crate::model::{ItemKind, ItemRecord, Role, LAB_SUBJECT, SPORTS_SUBJECT};
use crate::store::RecordStore;
use crate::workflow::{self, ApprovalAction};
use serde_json::{json, Value};

fn submit_proof(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    ctx.require_role(&[Role::Student])?;
    let kind = get_kind(params)?;
    let item_id = get_required_str(params, "itemId")?;
    let proof_url = get_required_str(params, "proofUrl")?;

    let item = store
        .get_item(kind, item_id)?
        .ok_or_else(|| ClearanceError::not_found(kind.as_str(), item_id))?;
    if item.student_id() != ctx.entity_id {
        return Err(ClearanceError::Forbidden(format!(
            "{} {} belongs to another student",
            kind.as_str(),
            item_id
        )));
    }
    let out = workflow::submit_proof(store, kind, item_id, proof_url, &workflow::now_stamp())?;
    Ok(json!({ "item": out }))
}

/// Staff may act on an item only in their approver role; teachers further
/// need a class in the item's subject, matching their pending queue.
pub(crate) fn authorize_item_staff(
    store: &SqliteStore<'_>,
    ctx: &RequestContext,
    kind: ItemKind,
    item: &ItemRecord,
) -> Result<()> {
    ctx.require_role(&[workflow::approver_role(kind, item.subject_id())])?;
    if ctx.role == Role::Teacher && !store.teaches_subject(&ctx.entity_id, item.subject_id())? {
        return Err(ClearanceError::Forbidden(format!(
            "staff {} teaches no class in {}",
            ctx.entity_id,
            item.subject_id()
        )));
    }
    Ok(())
}

fn decide(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    let kind = get_kind(params)?;
    let item_id = get_required_str(params, "itemId")?;
    let action = ApprovalAction::parse(get_required_str(params, "action")?)?;
    let reason = get_optional_str(params, "reason")?;

    let item = store
        .get_item(kind, item_id)?
        .ok_or_else(|| ClearanceError::not_found(kind.as_str(), item_id))?;
    authorize_item_staff(store, &ctx, kind, &item)?;

    let out = workflow::decide(
        store,
        kind,
        item_id,
        &ctx.entity_id,
        action,
        reason,
        &workflow::now_stamp(),
    )?;
    Ok(json!({ "item": out }))
}

/// Items waiting on this staff member, by role.
pub(crate) fn pending_for(store: &SqliteStore<'_>, ctx: &RequestContext) -> Result<Value> {
    let staff_id = ctx.entity_id.as_str();
    match ctx.role {
        Role::Teacher => Ok(json!({
            "books": store.pending_books_for_teacher(staff_id)?,
            "materials": store.pending_materials_for_teacher(staff_id)?,
        })),
        Role::Lab => Ok(json!({
            "books": [],
            "materials": store.pending_materials_for_subject(LAB_SUBJECT)?,
        })),
        Role::Coach => Ok(json!({
            "books": [],
            "materials": store.pending_materials_for_subject(SPORTS_SUBJECT)?,
        })),
        other => Err(ClearanceError::Forbidden(format!(
            "role {} has no approval queue",
            other.as_str()
        ))),
    }
}

fn pending(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    pending_for(store, &ctx)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "approvals.submitProof" => Some(with_store(state, req, submit_proof)),
        "approvals.decide" => Some(with_store(state, req, decide)),
        "approvals.pending" => Some(with_store(state, req, pending)),
        _ => None,
    }
}
