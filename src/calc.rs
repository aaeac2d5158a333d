use crate::error::{ClearanceError, Result};
use crate::model::{
    ApprovalStatus, Book, ClearanceResult, ClearanceStatus, FinancialOverview, Material, Student,
};
use crate::store::RecordStore;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;

/// Balances within half a cent of zero count as settled.
pub const SETTLED_EPSILON: f64 = 0.005;

/// How per-item state is folded into the overall percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AggregationStrategy {
    /// All books, all materials and one financial item in a single ratio.
    #[default]
    #[serde(rename = "itemWeighted")]
    ItemWeighted,
    /// Mean of the per-subject percentages over enrolled subjects.
    /// Superseded by `ItemWeighted`; kept so the older numbers stay reproducible.
    #[serde(rename = "subjectAveraged")]
    SubjectAveraged,
}

impl AggregationStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "itemWeighted" => Some(Self::ItemWeighted),
            "subjectAveraged" => Some(Self::SubjectAveraged),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ItemWeighted => "itemWeighted",
            Self::SubjectAveraged => "subjectAveraged",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalcConfig {
    pub aggregation: AggregationStrategy,
}

/// `100 * num / den` rounded half to even, computed exactly on integers.
///
/// `den == 0` is the caller's business; it yields 100 here so an empty set
/// never blocks clearance.
pub fn round_percent(num: u64, den: u64) -> u8 {
    if den == 0 {
        return 100;
    }
    round_half_even(num.saturating_mul(100), den).min(100) as u8
}

/// `num / den` rounded half to even. `den` must be non-zero.
fn round_half_even(num: u64, den: u64) -> u64 {
    let q = num / den;
    let twice = (num % den) * 2;
    if twice > den || (twice == den && q % 2 == 1) {
        q + 1
    } else {
        q
    }
}

/// Arithmetic mean of percentages with the same rounding as `round_percent`.
pub fn mean_percent(values: &[u8]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let sum: u64 = values.iter().map(|v| *v as u64).sum();
    round_half_even(sum, values.len() as u64).min(100) as u8
}

/// Year 1 books clear on staff approval or on direct return; the return
/// fallback lets staff record a physical hand-in without the photo step.
pub fn book_cleared(year_group: i64, book: &Book) -> bool {
    if year_group == 1 {
        book.approval.status == ApprovalStatus::Approved || book.returned
    } else {
        book.returned
    }
}

/// Materials only ever clear on physical return, whatever the year group.
pub fn material_cleared(material: &Material) -> bool {
    material.returned
}

pub fn financial_cleared(record: &FinancialOverview) -> bool {
    record.balance <= SETTLED_EPSILON
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tally {
    cleared: u64,
    total: u64,
}

impl Tally {
    fn percent(self) -> u8 {
        round_percent(self.cleared, self.total)
    }
}

fn tally_items<'b, 'm>(
    year_group: i64,
    books: impl IntoIterator<Item = &'b Book>,
    materials: impl IntoIterator<Item = &'m Material>,
) -> Tally {
    let mut t = Tally {
        cleared: 0,
        total: 0,
    };
    for b in books {
        t.total += 1;
        if book_cleared(year_group, b) {
            t.cleared += 1;
        }
    }
    for m in materials {
        t.total += 1;
        if material_cleared(m) {
            t.cleared += 1;
        }
    }
    t
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectClearance {
    pub subject_id: String,
    pub subject_name: String,
    pub class_id: String,
    pub class_name: String,
    pub percentage: u8,
    pub status: ClearanceStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentClearance {
    pub student_id: String,
    pub display_name: String,
    pub year_group: i64,
    pub aggregation: AggregationStrategy,
    pub subjects: Vec<SubjectClearance>,
    pub overall: ClearanceResult,
}

/// A clearance value for listings, where one unreachable row must not be
/// shown as "0%".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearanceReading {
    Known(ClearanceResult),
    Unknown,
}

impl ClearanceReading {
    pub fn from_result(r: Result<ClearanceResult>) -> Self {
        match r {
            Ok(v) => Self::Known(v),
            Err(e) => {
                tracing::warn!(error = %e, "clearance reading unavailable");
                Self::Unknown
            }
        }
    }

    pub fn to_json(self) -> serde_json::Value {
        match self {
            Self::Known(r) => json!({ "percentage": r.percentage, "status": r.status }),
            Self::Unknown => json!({ "percentage": null, "status": "unknown" }),
        }
    }
}

/// Derives clearance from whatever the store holds right now. Holds no
/// results between calls.
pub struct ClearanceEngine<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    config: CalcConfig,
}

impl<'a, S: RecordStore + ?Sized> ClearanceEngine<'a, S> {
    pub fn new(store: &'a S, config: CalcConfig) -> Self {
        Self { store, config }
    }

    pub fn subject_clearance_percentage(&self, student: &Student, subject_id: &str) -> Result<u8> {
        let books = self.store.get_books_for_student(&student.id)?;
        let materials = self.store.get_materials_for_student(&student.id)?;
        let t = tally_items(
            student.year_group,
            books.iter().filter(|b| b.subject_id == subject_id),
            materials.iter().filter(|m| m.subject_id == subject_id),
        );
        tracing::debug!(
            student_id = %student.id,
            subject_id,
            cleared = t.cleared,
            total = t.total,
            "subject clearance"
        );
        Ok(t.percent())
    }

    pub fn subject_clearance_status(
        &self,
        student: &Student,
        subject_id: &str,
    ) -> Result<ClearanceStatus> {
        Ok(ClearanceStatus::from_percentage(
            self.subject_clearance_percentage(student, subject_id)?,
        ))
    }

    pub fn subject_clearance(&self, student: &Student, subject_id: &str) -> Result<ClearanceResult> {
        Ok(ClearanceResult::from_percentage(
            self.subject_clearance_percentage(student, subject_id)?,
        ))
    }

    pub fn overall_clearance_percentage(&self, student: &Student) -> Result<u8> {
        match self.config.aggregation {
            AggregationStrategy::ItemWeighted => self.item_weighted_percentage(student),
            AggregationStrategy::SubjectAveraged => self.subject_averaged_percentage(student),
        }
    }

    pub fn overall_clearance_status(&self, student: &Student) -> Result<ClearanceStatus> {
        Ok(ClearanceStatus::from_percentage(
            self.overall_clearance_percentage(student)?,
        ))
    }

    pub fn overall_clearance(&self, student: &Student) -> Result<ClearanceResult> {
        Ok(ClearanceResult::from_percentage(
            self.overall_clearance_percentage(student)?,
        ))
    }

    fn item_weighted_percentage(&self, student: &Student) -> Result<u8> {
        let books = self.store.get_books_for_student(&student.id)?;
        let materials = self.store.get_materials_for_student(&student.id)?;
        let financial = self.store.get_financial_overview(&student.id)?;

        let mut t = tally_items(student.year_group, books.iter(), materials.iter());
        if let Some(f) = financial.as_ref() {
            t.total += 1;
            if financial_cleared(f) {
                t.cleared += 1;
            }
        }
        tracing::debug!(
            student_id = %student.id,
            books = books.len(),
            materials = materials.len(),
            financial = financial.is_some(),
            cleared = t.cleared,
            total = t.total,
            "overall clearance (item weighted)"
        );
        Ok(t.percent())
    }

    fn subject_averaged_percentage(&self, student: &Student) -> Result<u8> {
        let enrollments = self.store.get_enrollments(&student.id)?;
        let books = self.store.get_books_for_student(&student.id)?;
        let materials = self.store.get_materials_for_student(&student.id)?;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut per_subject: Vec<u8> = Vec::new();
        for e in &enrollments {
            if !seen.insert(e.subject_id.as_str()) {
                continue;
            }
            let t = tally_items(
                student.year_group,
                books.iter().filter(|b| b.subject_id == e.subject_id),
                materials.iter().filter(|m| m.subject_id == e.subject_id),
            );
            per_subject.push(t.percent());
        }
        tracing::debug!(
            student_id = %student.id,
            subjects = per_subject.len(),
            "overall clearance (subject averaged)"
        );
        Ok(mean_percent(&per_subject))
    }

    /// Per enrolled subject results plus the overall figure.
    pub fn student_breakdown(&self, student: &Student) -> Result<StudentClearance> {
        let enrollments = self.store.get_enrollments(&student.id)?;
        let mut subjects = Vec::with_capacity(enrollments.len());
        for e in enrollments {
            let r = self.subject_clearance(student, &e.subject_id)?;
            subjects.push(SubjectClearance {
                subject_id: e.subject_id,
                subject_name: e.subject_name,
                class_id: e.class_id,
                class_name: e.class_name,
                percentage: r.percentage,
                status: r.status,
            });
        }
        Ok(StudentClearance {
            student_id: student.id.clone(),
            display_name: student.display_name(),
            year_group: student.year_group,
            aggregation: self.config.aggregation,
            subjects,
            overall: self.overall_clearance(student)?,
        })
    }
}

/// Looks the student up and computes with `f`. An unknown student reads as
/// `not-started` at 0% (`found = false`); store failures still propagate.
pub fn with_student<S, T, F>(store: &S, student_id: &str, f: F) -> Result<Option<T>>
where
    S: RecordStore + ?Sized,
    F: FnOnce(&Student) -> Result<T>,
{
    match store.get_student(student_id)? {
        Some(student) => f(&student).map(Some),
        None => {
            tracing::info!(student_id, "clearance requested for unknown student");
            Ok(None)
        }
    }
}

pub fn require_student<S: RecordStore + ?Sized>(store: &S, student_id: &str) -> Result<Student> {
    store
        .get_student(student_id)?
        .ok_or_else(|| ClearanceError::not_found("student", student_id))
}
