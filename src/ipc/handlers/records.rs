use crate::db::SqliteStore;
use crate::error::{ClearanceError, Result};
use crate::finance;
use crate::hall::{DEFAULT_HALL_CLEARANCE_STATUS, DEFAULT_ROOM_STATUS};
use crate::ipc::handlers::approvals::authorize_item_staff;
use crate::ipc::helpers::{
    caller, get_kind, get_optional_bool, get_optional_f64, get_optional_i64, get_optional_str,
    get_required_str, id_or_new, with_store,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{FinancialOverview, ItemKind, Role, Room, Staff, Student, DEFAULT_YEAR_GROUP};
use crate::store::RecordStore;
use crate::workflow;
use serde_json::{json, Value};

const SEARCH_MIN_CHARS: usize = 2;
const SEARCH_DEFAULT_LIMIT: i64 = 50;

fn subjects_create(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let id = get_required_str(params, "subjectId")?;
    let name = get_required_str(params, "name")?;
    store.insert_subject(id, name)?;
    Ok(json!({ "subjectId": id }))
}

fn classes_create(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let id = id_or_new(params, "classId")?;
    let name = get_required_str(params, "name")?;
    let subject_id = get_required_str(params, "subjectId")?;
    let teacher_id = get_optional_str(params, "teacherId")?;
    let year_group = get_optional_i64(params, "yearGroup")?;
    let color_block = get_optional_str(params, "colorBlock")?;
    store.insert_class(&id, name, subject_id, teacher_id, year_group, color_block)?;
    Ok(json!({ "classId": id }))
}

fn students_create(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let year_group = get_optional_i64(params, "yearGroup")?.unwrap_or(DEFAULT_YEAR_GROUP);
    if year_group < 1 {
        return Err(ClearanceError::validation("yearGroup must be >= 1"));
    }
    let student = Student {
        id: id_or_new(params, "studentId")?,
        first_name: get_required_str(params, "firstName")?.to_string(),
        last_name: get_required_str(params, "lastName")?.to_string(),
        year_group,
        auth_uid: get_optional_str(params, "authUid")?.map(str::to_string),
    };
    store.insert_student(&student)?;
    Ok(json!({ "studentId": student.id }))
}

fn parse_role(params: &Value) -> Result<Role> {
    let raw = get_required_str(params, "role")?;
    match Role::parse(raw) {
        Some(Role::Student) | None => Err(ClearanceError::validation(format!(
            "role must be one of: teacher, finance, hall, lab, coach (got {:?})",
            raw
        ))),
        Some(r) => Ok(r),
    }
}

fn staff_create(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let staff = Staff {
        id: id_or_new(params, "staffId")?,
        auth_uid: get_optional_str(params, "authUid")?.map(str::to_string),
        role: parse_role(params)?,
        first_name: get_required_str(params, "firstName")?.to_string(),
        last_name: get_required_str(params, "lastName")?.to_string(),
        hall_name: get_optional_str(params, "hallName")?.map(str::to_string),
        specialization: get_optional_str(params, "specialization")?.map(str::to_string),
    };
    store.insert_staff(&staff)?;
    Ok(json!({ "staffId": staff.id }))
}

fn staff_set_role(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let staff_id = get_required_str(params, "staffId")?;
    let role = parse_role(params)?;
    if !store.set_staff_role(staff_id, role)? {
        return Err(ClearanceError::not_found("staff", staff_id));
    }
    tracing::info!(staff_id, role = role.as_str(), "staff role changed");
    Ok(json!({ "ok": true }))
}

fn enrollments_create(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let student_id = get_required_str(params, "studentId")?;
    let class_id = get_required_str(params, "classId")?;
    store.insert_enrollment(student_id, class_id)?;
    Ok(json!({ "ok": true }))
}

fn items_create(store: &SqliteStore<'_>, params: &Value, kind: ItemKind) -> Result<Value> {
    let (id_key, label_key) = match kind {
        ItemKind::Book => ("bookId", "title"),
        ItemKind::Material => ("materialId", "name"),
    };
    let id = id_or_new(params, id_key)?;
    let student_id = get_required_str(params, "studentId")?;
    let subject_id = get_required_str(params, "subjectId")?;
    let label = get_required_str(params, label_key)?;
    let returned = get_optional_bool(params, "returned")?.unwrap_or(false);
    store.insert_item(kind, &id, student_id, subject_id, label, returned)?;
    let mut out = serde_json::Map::new();
    out.insert(id_key.to_string(), Value::String(id));
    Ok(Value::Object(out))
}

fn rooms_create(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let room = Room {
        id: get_required_str(params, "roomNumber")?.to_string(),
        hall_id: get_required_str(params, "hallId")?.to_string(),
        student_id: get_optional_str(params, "studentId")?.map(str::to_string),
        room_status: DEFAULT_ROOM_STATUS.to_string(),
        hall_clearance_status: DEFAULT_HALL_CLEARANCE_STATUS.to_string(),
    };
    store.insert_room(&room)?;
    Ok(json!({ "roomNumber": room.id, "hallId": room.hall_id }))
}

fn finance_create(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let student_id = get_required_str(params, "studentId")?;
    let tuition_due = get_optional_f64(params, "tuitionDue")?
        .ok_or_else(|| ClearanceError::validation("missing tuitionDue"))?;
    let amount_paid = get_optional_f64(params, "amountPaid")?.unwrap_or(0.0);
    if !tuition_due.is_finite() || tuition_due < 0.0 || !amount_paid.is_finite() || amount_paid < 0.0 {
        return Err(ClearanceError::validation(
            "tuitionDue and amountPaid must be non-negative numbers",
        ));
    }
    let mut record = FinancialOverview {
        student_id: student_id.to_string(),
        tuition_due,
        amount_paid,
        balance: tuition_due - amount_paid,
        status: String::new(),
    };
    record.status = finance::derive_status(&record).to_string();
    store.insert_finance(&record)?;
    Ok(json!({ "record": record }))
}

fn books_list(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let books = store.list_books(
        get_optional_str(params, "studentId")?,
        get_optional_str(params, "subjectId")?,
    )?;
    Ok(json!({ "books": books }))
}

fn materials_list(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let materials = store.list_materials(
        get_optional_str(params, "studentId")?,
        get_optional_str(params, "subjectId")?,
    )?;
    Ok(json!({ "materials": materials }))
}

fn students_search(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let q = get_optional_str(params, "q")?.unwrap_or("");
    if q.chars().count() < SEARCH_MIN_CHARS {
        return Ok(json!({ "students": [] }));
    }
    let limit = get_optional_i64(params, "limit")?
        .unwrap_or(SEARCH_DEFAULT_LIMIT)
        .clamp(1, 500);
    let rows: Vec<Value> = store
        .search_students(q, limit)?
        .into_iter()
        .map(|s| {
            json!({
                "displayName": s.display_name(),
                "id": s.id,
                "yearGroup": s.year_group,
            })
        })
        .collect();
    Ok(json!({ "students": rows }))
}

/// Staff record a physical return. Same authority as deciding the item.
fn items_set_returned(store: &SqliteStore<'_>, params: &Value) -> Result<Value> {
    let ctx = caller(store, params)?;
    let kind = get_kind(params)?;
    let item_id = get_required_str(params, "itemId")?;
    let returned = get_optional_bool(params, "returned")?
        .ok_or_else(|| ClearanceError::validation("missing returned"))?;
    let item = store
        .get_item(kind, item_id)?
        .ok_or_else(|| ClearanceError::not_found(kind.as_str(), item_id))?;
    authorize_item_staff(store, &ctx, kind, &item)?;

    let out = workflow::set_returned(store, kind, item_id, returned)?;
    tracing::info!(
        kind = kind.as_str(),
        item_id,
        returned,
        staff_id = %ctx.entity_id,
        "item return recorded"
    );
    Ok(json!({ "item": out }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.create" => Some(with_store(state, req, subjects_create)),
        "classes.create" => Some(with_store(state, req, classes_create)),
        "students.create" => Some(with_store(state, req, students_create)),
        "staff.create" => Some(with_store(state, req, staff_create)),
        "staff.setRole" => Some(with_store(state, req, staff_set_role)),
        "enrollments.create" => Some(with_store(state, req, enrollments_create)),
        "books.create" => Some(with_store(state, req, |s, p| items_create(s, p, ItemKind::Book))),
        "materials.create" => Some(with_store(state, req, |s, p| {
            items_create(s, p, ItemKind::Material)
        })),
        "rooms.create" => Some(with_store(state, req, rooms_create)),
        "finance.create" => Some(with_store(state, req, finance_create)),
        "books.list" => Some(with_store(state, req, books_list)),
        "materials.list" => Some(with_store(state, req, materials_list)),
        "students.search" => Some(with_store(state, req, students_search)),
        "items.setReturned" => Some(with_store(state, req, items_set_returned)),
        _ => None,
    }
}
