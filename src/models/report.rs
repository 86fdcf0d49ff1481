//! CSV export of the loan table

use chrono::{DateTime, Utc};
use std::io::Write;

use super::loan::{Loan, DATE_FORMAT};
use crate::error::{AppError, AppResult};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Suggested download name for the export
pub const EXPORT_FILENAME: &str = "lab_equipment_loans.csv";

pub const HEADER: [&str; 22] = [
    "ID",
    "Created At",
    "Updated At",
    "Borrower Name",
    "Borrower Phone",
    "Item Name",
    "Lab Location",
    "Quantity Borrowed",
    "Expected Return Date",
    "Purpose",
    "Photo Filename",
    "Status",
    "Approval Status",
    "Approved By",
    "Approved At",
    "Denied At",
    "Return Requested",
    "Return Approval Status",
    "Return Requested At",
    "Days Since Borrowed",
    "Is Overdue",
    "Days Overdue",
];

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// Age and lateness of a loan at export time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanAge {
    pub days_since_borrowed: i64,
    pub is_overdue: bool,
    pub days_overdue: i64,
}

impl LoanAge {
    pub fn at(loan: &Loan, now: DateTime<Utc>) -> Self {
        let due = loan.expected_return_at();
        let is_overdue = now > due;
        Self {
            days_since_borrowed: (now - loan.created_at).num_days(),
            is_overdue,
            days_overdue: if is_overdue { (now - due).num_days() } else { 0 },
        }
    }
}

/// One CSV record, in `HEADER` order
pub fn record(loan: &Loan, now: DateTime<Utc>) -> [String; 22] {
    let age = LoanAge::at(loan, now);
    let state = &loan.state;
    [
        loan.id.to_string(),
        timestamp(Some(loan.created_at)),
        timestamp(Some(loan.updated_at)),
        loan.borrower_name.clone(),
        loan.borrower_phone.clone(),
        loan.item_name.clone(),
        loan.lab_location.clone(),
        loan.quantity_borrowed.to_string(),
        loan.expected_return_date.format(DATE_FORMAT).to_string(),
        loan.purpose.clone(),
        loan.photo_filename.clone().unwrap_or_default(),
        state.status().as_str().to_string(),
        state.approval_status().as_str().to_string(),
        loan.approved_by.clone().unwrap_or_default(),
        timestamp(loan.approved_at),
        timestamp(state.denied_at()),
        state.return_requested().to_string(),
        state.return_approval_status().as_str().to_string(),
        timestamp(state.return_requested_at()),
        age.days_since_borrowed.to_string(),
        age.is_overdue.to_string(),
        age.days_overdue.to_string(),
    ]
}

/// Write the header and one row per loan
pub fn write_csv<W: Write>(writer: W, loans: &[Loan], now: DateTime<Utc>) -> AppResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER).map_err(csv_error)?;
    for loan in loans {
        csv_writer.write_record(record(loan, now)).map_err(csv_error)?;
    }
    csv_writer
        .flush()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV export: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("Failed to write CSV export: {}", e))
}
