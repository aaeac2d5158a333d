use crate::calc::ClearanceEngine;
use crate::db::SqliteStore;
use crate::error::{ClearanceError, Result};
use crate::hall::{self, InspectionPatch};
use crate::ipc::handlers::setup::load_calc_config;
use crate::ipc::helpers::{caller, get_optional_str, get_required_str, with_store};
use crate::ipc::types::{AppState, Request};
use crate::model::Role;
use serde_json::{json, Value};

pub(crate) fn hall_students_for(store: &SqliteStore<'_>, hall_id: &str) -> Result<Value> {
    let engine = ClearanceEngine::new(store, load_calc_config(store.conn())?);
    let rows = hall::hall_listing(&engine, store.hall_rooms(hall_id)?);
    let students: Vec<Value> = rows.iter().map(|r| r.to_json()).collect();
    Ok(json!({ "hallId": hall_id, "students": students }))
}

fn hall_students(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    ctx.require_role(&[Role::Hall])?;
    let mut out = hall_students_for(store, &ctx.entity_id)?;
    out["hallName"] = json!(ctx.hall_name);
    Ok(out)
}

fn hall_inspect(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    ctx.require_role(&[Role::Hall])?;
    let room_id = get_required_str(params, "roomNumber")?;
    let patch = InspectionPatch {
        room_status: get_optional_str(params, "roomStatus")?.map(str::to_string),
        hall_clearance_status: get_optional_str(params, "hallClearanceStatus")?.map(str::to_string),
    };

    let room = store
        .get_room(&ctx.entity_id, room_id)?
        .ok_or_else(|| ClearanceError::not_found("room", room_id))?;
    let (room_status, hall_status) = hall::apply_inspection(&room, &patch)?;
    if !store.update_room_status(&ctx.entity_id, room_id, &room_status, &hall_status)? {
        return Err(ClearanceError::not_found("room", room_id));
    }
    tracing::info!(
        hall_id = %ctx.entity_id,
        room_id,
        room_status = %room_status,
        hall_clearance_status = %hall_status,
        "room inspected"
    );
    Ok(json!({
        "roomNumber": room_id,
        "roomStatus": room_status,
        "hallClearanceStatus": hall_status,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "hall.students" => Some(with_store(state, req, hall_students)),
        "hall.inspect" => Some(with_store(state, req, hall_inspect)),
        _ => None,
    }
}
