//! Photo-proof approval for Year 1 returns.
//!
//! `none -> pending -> {approved, rejected}` and `rejected -> pending` on
//! resubmission. Decisions keep `returned` in step with the status so that a
//! direct return recorded by staff and an approved proof read the same way.

use crate::error::{ClearanceError, Result};
use crate::model::{ApprovalStatus, ItemKind, ItemRecord, Role, Student, LAB_SUBJECT, SPORTS_SUBJECT};
use crate::store::{ApprovalUpdate, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(ClearanceError::validation(format!(
                "action must be one of: approve, reject (got {:?})",
                other
            ))),
        }
    }
}

/// Which staff role signs off items of this kind and subject.
pub fn approver_role(kind: ItemKind, subject_id: &str) -> Role {
    match kind {
        ItemKind::Book => Role::Teacher,
        ItemKind::Material if subject_id == LAB_SUBJECT => Role::Lab,
        ItemKind::Material if subject_id == SPORTS_SUBJECT => Role::Coach,
        ItemKind::Material => Role::Teacher,
    }
}

pub fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn load_item<S: RecordStore + ?Sized>(store: &S, kind: ItemKind, item_id: &str) -> Result<ItemRecord> {
    store
        .get_item(kind, item_id)?
        .ok_or_else(|| ClearanceError::not_found(kind.as_str(), item_id))
}

fn write_decision<S: RecordStore + ?Sized>(
    store: &S,
    kind: ItemKind,
    item_id: &str,
    update: &ApprovalUpdate,
) -> Result<ItemRecord> {
    let written = match kind {
        ItemKind::Book => store.set_book_approval(item_id, update)?.map(ItemRecord::Book),
        ItemKind::Material => store
            .set_material_approval(item_id, update)?
            .map(ItemRecord::Material),
    };
    written.ok_or_else(|| ClearanceError::not_found(kind.as_str(), item_id))
}

/// Student hands in a photo of the returned item.
pub fn submit_proof<S: RecordStore + ?Sized>(
    store: &S,
    kind: ItemKind,
    item_id: &str,
    proof_url: &str,
    submitted_at: &str,
) -> Result<ItemRecord> {
    let proof_url = proof_url.trim();
    if proof_url.is_empty() {
        return Err(ClearanceError::validation("proof url must not be empty"));
    }
    let item = load_item(store, kind, item_id)?;
    let owner: Student = store
        .get_student(item.student_id())?
        .ok_or_else(|| ClearanceError::not_found("student", item.student_id()))?;
    if !owner.uses_approval_workflow() {
        return Err(ClearanceError::validation(format!(
            "photo proof is only used for year 1 students (year group {})",
            owner.year_group
        )));
    }
    if item.approval().status == ApprovalStatus::Approved {
        return Err(ClearanceError::validation(format!(
            "{} {} is already approved",
            kind.as_str(),
            item_id
        )));
    }

    let out = store
        .record_proof_submission(kind, item_id, proof_url, submitted_at)?
        .ok_or_else(|| ClearanceError::not_found(kind.as_str(), item_id))?;
    tracing::info!(kind = kind.as_str(), item_id, student_id = out.student_id(), "proof submitted");
    Ok(out)
}

/// Approving an approved item is allowed and only re-stamps the approver.
pub fn approve_item<S: RecordStore + ?Sized>(
    store: &S,
    kind: ItemKind,
    item_id: &str,
    staff_id: &str,
    at: &str,
) -> Result<ItemRecord> {
    let item = load_item(store, kind, item_id)?;
    match item.approval().status {
        ApprovalStatus::Pending | ApprovalStatus::Approved => {}
        other => {
            return Err(ClearanceError::validation(format!(
                "cannot approve {} {} from status {}",
                kind.as_str(),
                item_id,
                other.as_str()
            )))
        }
    }
    let update = ApprovalUpdate {
        status: ApprovalStatus::Approved,
        returned: true,
        rejection_reason: None,
        approved_by: staff_id.to_string(),
        approved_at: at.to_string(),
    };
    let out = write_decision(store, kind, item_id, &update)?;
    tracing::info!(kind = kind.as_str(), item_id, staff_id, "item approved");
    Ok(out)
}

pub fn reject_item<S: RecordStore + ?Sized>(
    store: &S,
    kind: ItemKind,
    item_id: &str,
    staff_id: &str,
    reason: Option<&str>,
    at: &str,
) -> Result<ItemRecord> {
    let reason = reason.map(str::trim).unwrap_or("");
    if reason.is_empty() {
        return Err(ClearanceError::validation("rejection reason is required"));
    }
    let item = load_item(store, kind, item_id)?;
    match item.approval().status {
        ApprovalStatus::Pending | ApprovalStatus::Rejected => {}
        other => {
            return Err(ClearanceError::validation(format!(
                "cannot reject {} {} from status {}",
                kind.as_str(),
                item_id,
                other.as_str()
            )))
        }
    }
    let update = ApprovalUpdate {
        status: ApprovalStatus::Rejected,
        returned: false,
        rejection_reason: Some(reason.to_string()),
        approved_by: staff_id.to_string(),
        approved_at: at.to_string(),
    };
    let out = write_decision(store, kind, item_id, &update)?;
    tracing::info!(kind = kind.as_str(), item_id, staff_id, reason, "item rejected");
    Ok(out)
}

pub fn decide<S: RecordStore + ?Sized>(
    store: &S,
    kind: ItemKind,
    item_id: &str,
    staff_id: &str,
    action: ApprovalAction,
    reason: Option<&str>,
    at: &str,
) -> Result<ItemRecord> {
    match action {
        ApprovalAction::Approve => approve_item(store, kind, item_id, staff_id, at),
        ApprovalAction::Reject => reject_item(store, kind, item_id, staff_id, reason, at),
    }
}

/// Staff-recorded physical return. A rejected item that comes back in person
/// drops out of the workflow (`none`) so `returned` never sits beside
/// `rejected`. Un-returning an approved item withdraws the approval the same
/// way, since approval implies the item is back.
pub fn set_returned<S: RecordStore + ?Sized>(
    store: &S,
    kind: ItemKind,
    item_id: &str,
    returned: bool,
) -> Result<ItemRecord> {
    let item = load_item(store, kind, item_id)?;
    let current = item.approval().status;
    let status = match (returned, current) {
        (true, ApprovalStatus::Rejected) | (false, ApprovalStatus::Approved) => ApprovalStatus::None,
        _ => current,
    };
    store
        .set_item_returned(kind, item_id, returned, status)?
        .ok_or_else(|| ClearanceError::not_found(kind.as_str(), item_id))
}
