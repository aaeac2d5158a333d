use crate::error::{ClearanceError, Result};
use crate::model::Role;
use crate::store::RecordStore;
use serde::Serialize;

/// Who is asking, resolved for one request and dropped with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub auth_uid: String,
    pub role: Role,
    /// Student id or staff id, depending on `role`.
    pub entity_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_group: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hall_name: Option<String>,
}

impl RequestContext {
    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        Err(ClearanceError::Forbidden(format!(
            "role {} may not perform this action",
            self.role.as_str()
        )))
    }
}

/// Students are checked before staff; an id found in neither is unauthorized.
pub fn resolve<S: RecordStore + ?Sized>(store: &S, auth_uid: &str) -> Result<RequestContext> {
    let auth_uid = auth_uid.trim();
    if auth_uid.is_empty() {
        return Err(ClearanceError::Unauthorized("missing authUid".into()));
    }

    if let Some(s) = store.get_student_by_auth_uid(auth_uid)? {
        let ctx = RequestContext {
            auth_uid: auth_uid.to_string(),
            role: Role::Student,
            display_name: s.display_name(),
            entity_id: s.id,
            year_group: Some(s.year_group),
            hall_name: None,
        };
        tracing::debug!(auth_uid, role = ctx.role.as_str(), entity_id = %ctx.entity_id, "identity resolved");
        return Ok(ctx);
    }

    if let Some(st) = store.get_staff_by_auth_uid(auth_uid)? {
        let ctx = RequestContext {
            auth_uid: auth_uid.to_string(),
            role: st.role,
            display_name: format!("{}, {}", st.last_name, st.first_name),
            entity_id: st.id,
            year_group: None,
            hall_name: st.hall_name,
        };
        tracing::debug!(auth_uid, role = ctx.role.as_str(), entity_id = %ctx.entity_id, "identity resolved");
        return Ok(ctx);
    }

    tracing::warn!(auth_uid, "authenticated id not found in any role table");
    Err(ClearanceError::Unauthorized(
        "user not found in system".into(),
    ))
}
