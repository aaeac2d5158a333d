use crate::calc::SETTLED_EPSILON;
use crate::error::{ClearanceError, Result};
use crate::model::FinancialOverview;
use serde::Serialize;

pub const STATUS_PAID: &str = "Paid";
pub const STATUS_PARTIAL: &str = "Partial";
pub const STATUS_OUTSTANDING: &str = "Outstanding";

/// Fields a finance officer may change. Anything else is ignored upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancePatch {
    pub amount_paid: Option<f64>,
    pub balance: Option<f64>,
    pub status: Option<String>,
}

impl FinancePatch {
    pub fn is_empty(&self) -> bool {
        self.amount_paid.is_none() && self.balance.is_none() && self.status.is_none()
    }
}

pub fn derive_status(record: &FinancialOverview) -> &'static str {
    if record.balance <= SETTLED_EPSILON {
        STATUS_PAID
    } else if record.amount_paid > 0.0 {
        STATUS_PARTIAL
    } else {
        STATUS_OUTSTANDING
    }
}

/// Applies a patch, keeping `balance == tuition_due - amount_paid`.
///
/// `amount_paid` wins when both amounts are given. A balance-only patch is a
/// manual adjustment and back-computes `amount_paid`.
pub fn apply_update(current: &FinancialOverview, patch: &FinancePatch) -> Result<FinancialOverview> {
    if patch.is_empty() {
        return Err(ClearanceError::validation("no valid updates provided"));
    }
    let mut next = current.clone();

    if let Some(paid) = patch.amount_paid {
        if !paid.is_finite() || paid < 0.0 {
            return Err(ClearanceError::validation("amountPaid must be a non-negative number"));
        }
        next.amount_paid = paid;
        next.balance = next.tuition_due - paid;
    } else if let Some(balance) = patch.balance {
        if !balance.is_finite() {
            return Err(ClearanceError::validation("balance must be a number"));
        }
        next.balance = balance;
        next.amount_paid = next.tuition_due - balance;
    }

    next.status = match patch.status.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => derive_status(&next).to_string(),
    };
    Ok(next)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub total_tuition: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
    pub paid_count: usize,
    pub partial_count: usize,
    pub outstanding_count: usize,
}

pub fn summarize<'a, I>(records: I) -> FinanceSummary
where
    I: IntoIterator<Item = &'a FinancialOverview>,
{
    let mut s = FinanceSummary::default();
    for r in records {
        s.total_tuition += r.tuition_due;
        s.total_paid += r.amount_paid;
        s.total_outstanding += r.balance;
        match r.status.as_str() {
            STATUS_PAID => s.paid_count += 1,
            STATUS_PARTIAL => s.partial_count += 1,
            STATUS_OUTSTANDING => s.outstanding_count += 1,
            _ => {}
        }
    }
    s
}
