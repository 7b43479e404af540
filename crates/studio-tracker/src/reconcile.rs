//! Reference-date reconciliation for financial records
//!
//! Paid items count when the cash actually moved; unpaid items count when
//! they are expected to move. A record without a usable due date is left out
//! of every period-based figure.

use chrono::{Datelike, NaiveDate};

use crate::finance::FinanceStatus;

/// Common view over receivables and expenses
pub trait LedgerEntry {
    fn value(&self) -> f64;
    fn status(&self) -> FinanceStatus;
    fn due_date(&self) -> Option<NaiveDate>;
    fn payment_date(&self) -> Option<NaiveDate>;
}

/// A ledger entry with its resolved reference date
#[derive(Debug, Clone, Copy)]
pub struct Dated<'a, T> {
    pub entry: &'a T,
    pub reference: NaiveDate,
}

impl<T: LedgerEntry> Dated<'_, T> {
    pub fn is_paid(&self) -> bool {
        self.entry.status() == FinanceStatus::Paid
    }

    pub fn is_pending(&self) -> bool {
        self.entry.status() == FinanceStatus::Pending
    }

    /// Year-month bucket, e.g. `2024-03`
    pub fn month(&self) -> String {
        self.reference.format("%Y-%m").to_string()
    }
}

/// Resolve the reference date of a record.
///
/// Returns `None` when the due date is missing: such records are a data
/// quality failure and are excluded, even if a payment date exists.
pub fn reference_date<T: LedgerEntry>(entry: &T) -> Option<NaiveDate> {
    let due = entry.due_date()?;
    match (entry.status(), entry.payment_date()) {
        (FinanceStatus::Paid, Some(paid)) => Some(paid),
        _ => Some(due),
    }
}

/// Entries whose reference date falls in `year` (the attribution year)
pub fn in_year<T: LedgerEntry>(entries: &[T], year: i32) -> Vec<Dated<'_, T>> {
    entries
        .iter()
        .filter_map(|entry| {
            let reference = reference_date(entry)?;
            (reference.year() == year).then_some(Dated { entry, reference })
        })
        .collect()
}
