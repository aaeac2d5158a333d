use crate::calc::{ClearanceEngine, ClearanceReading};
use crate::error::{ClearanceError, Result};
use crate::model::{Room, Student};
use crate::store::RecordStore;

pub const ROOM_STATUSES: &[&str] = &["pending_inspection", "inspected", "damaged", "cleared"];
pub const HALL_CLEARANCE_STATUSES: &[&str] = &["pending", "approved", "rejected"];

pub const DEFAULT_ROOM_STATUS: &str = "pending_inspection";
pub const DEFAULT_HALL_CLEARANCE_STATUS: &str = "pending";

/// One occupied room in a hall listing.
#[derive(Debug, Clone, PartialEq)]
pub struct HallStudent {
    pub room: Room,
    pub student: Student,
    pub overall: ClearanceReading,
}

impl HallStudent {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "studentId": self.student.id,
            "displayName": self.student.display_name(),
            "yearGroup": self.student.year_group,
            "roomNumber": self.room.id,
            "roomStatus": self.room.room_status,
            "hallClearanceStatus": self.room.hall_clearance_status,
            "overall": self.overall.to_json(),
        })
    }
}

/// Attaches each occupant's overall reading. One failing student yields an
/// `Unknown` row; the rest of the listing is unaffected.
pub fn hall_listing<S: RecordStore + ?Sized>(
    engine: &ClearanceEngine<'_, S>,
    rows: Vec<(Room, Student)>,
) -> Vec<HallStudent> {
    rows.into_iter()
        .map(|(room, student)| {
            let overall = ClearanceReading::from_result(engine.overall_clearance(&student));
            HallStudent {
                room,
                student,
                overall,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionPatch {
    pub room_status: Option<String>,
    pub hall_clearance_status: Option<String>,
}

fn check_value(field: &str, value: &str, allowed: &[&str]) -> Result<String> {
    let v = value.trim();
    if allowed.contains(&v) {
        Ok(v.to_string())
    } else {
        Err(ClearanceError::validation(format!(
            "{} must be one of: {} (got {:?})",
            field,
            allowed.join(", "),
            value
        )))
    }
}

/// Resolves the statuses to write; omitted fields keep the room's values.
pub fn apply_inspection(room: &Room, patch: &InspectionPatch) -> Result<(String, String)> {
    if patch.room_status.is_none() && patch.hall_clearance_status.is_none() {
        return Err(ClearanceError::validation("no valid updates provided"));
    }
    if room.student_id.is_none() {
        return Err(ClearanceError::validation(format!(
            "room {} has no assigned student",
            room.id
        )));
    }
    let room_status = match patch.room_status.as_deref() {
        Some(v) => check_value("roomStatus", v, ROOM_STATUSES)?,
        None => room.room_status.clone(),
    };
    let hall_status = match patch.hall_clearance_status.as_deref() {
        Some(v) => check_value("hallClearanceStatus", v, HALL_CLEARANCE_STATUSES)?,
        None => room.hall_clearance_status.clone(),
    };
    Ok((room_status, hall_status))
}
