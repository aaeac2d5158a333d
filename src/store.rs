use crate::error::Result;
use crate::model::{
    ApprovalStatus, Book, Enrollment, FinancialOverview, ItemKind, ItemRecord, Material, Staff,
    Student,
};

/// Workflow fields written together by an approve/reject decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalUpdate {
    pub status: ApprovalStatus,
    pub returned: bool,
    pub rejection_reason: Option<String>,
    pub approved_by: String,
    pub approved_at: String,
}

/// Read/filter/update access to clearance records.
///
/// Implementations must apply each `set_*` call as a single record write so
/// that a decision never leaves `approval_status`, `returned` and
/// `rejection_reason` out of step.
pub trait RecordStore {
    fn get_student(&self, student_id: &str) -> Result<Option<Student>>;
    fn get_staff_by_auth_uid(&self, auth_uid: &str) -> Result<Option<Staff>>;
    fn get_student_by_auth_uid(&self, auth_uid: &str) -> Result<Option<Student>>;

    fn get_books_for_student(&self, student_id: &str) -> Result<Vec<Book>>;
    fn get_materials_for_student(&self, student_id: &str) -> Result<Vec<Material>>;
    fn get_financial_overview(&self, student_id: &str) -> Result<Option<FinancialOverview>>;
    fn get_enrollments(&self, student_id: &str) -> Result<Vec<Enrollment>>;

    fn get_book(&self, book_id: &str) -> Result<Option<Book>>;
    fn get_material(&self, material_id: &str) -> Result<Option<Material>>;

    fn set_book_approval(&self, book_id: &str, update: &ApprovalUpdate) -> Result<Option<Book>>;
    fn set_material_approval(
        &self,
        material_id: &str,
        update: &ApprovalUpdate,
    ) -> Result<Option<Material>>;

    /// Moves the item to `pending` with the given proof.
    fn record_proof_submission(
        &self,
        kind: ItemKind,
        item_id: &str,
        proof_url: &str,
        submitted_at: &str,
    ) -> Result<Option<ItemRecord>>;

    /// Direct physical-return toggle. `status` is written alongside `returned`.
    fn set_item_returned(
        &self,
        kind: ItemKind,
        item_id: &str,
        returned: bool,
        status: ApprovalStatus,
    ) -> Result<Option<ItemRecord>>;

    fn get_item(&self, kind: ItemKind, item_id: &str) -> Result<Option<ItemRecord>> {
        Ok(match kind {
            ItemKind::Book => self.get_book(item_id)?.map(ItemRecord::Book),
            ItemKind::Material => self.get_material(item_id)?.map(ItemRecord::Material),
        })
    }
}
