//! Loan model and lifecycle state machine
//!
//! A loan moves through `LoanState` only via [`Loan::apply`]. The legacy
//! status columns (`status`, `approval_status`, `return_requested`,
//! `return_approval_status`) are derived from the state when a loan is
//! rendered, so contradictory combinations cannot be stored.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Format of `expected_return_date` on the wire and in reports
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Legacy status fields (serialization boundary only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Active,
    Returned,
    Denied,
    NotFound,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
            LoanStatus::Denied => "denied",
            LoanStatus::NotFound => "not_found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnApprovalStatus {
    NotRequested,
    Pending,
    Approved,
    NotFound,
}

impl ReturnApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnApprovalStatus::NotRequested => "not_requested",
            ReturnApprovalStatus::Pending => "pending",
            ReturnApprovalStatus::Approved => "approved",
            ReturnApprovalStatus::NotFound => "not_found",
        }
    }
}

// ---------------------------------------------------------------------------
// LoanState
// ---------------------------------------------------------------------------

/// Lifecycle state of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanState {
    /// Submitted, waiting for an admin decision
    Pending,
    /// Approved and in the borrower's hands
    Active,
    Denied { denied_at: DateTime<Utc> },
    /// Borrower asked to return; waiting for an admin to check the item in
    ReturnPending { requested_at: DateTime<Utc> },
    Returned { requested_at: DateTime<Utc> },
    /// Return was reviewed but the item could not be located
    NotFound { requested_at: DateTime<Utc> },
}

impl LoanState {
    /// Value stored in the `loans.state` column
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanState::Pending => "pending",
            LoanState::Active => "active",
            LoanState::Denied { .. } => "denied",
            LoanState::ReturnPending { .. } => "return_pending",
            LoanState::Returned { .. } => "returned",
            LoanState::NotFound { .. } => "not_found",
        }
    }

    /// Rebuild a state from its stored column values
    pub fn from_columns(
        state: &str,
        denied_at: Option<DateTime<Utc>>,
        return_requested_at: Option<DateTime<Utc>>,
    ) -> Result<Self, String> {
        let requested_at = || {
            return_requested_at
                .ok_or_else(|| format!("loan in state '{}' has no return_requested_at", state))
        };

        match state {
            "pending" => Ok(LoanState::Pending),
            "active" => Ok(LoanState::Active),
            "denied" => denied_at
                .map(|denied_at| LoanState::Denied { denied_at })
                .ok_or_else(|| "denied loan has no denied_at".to_string()),
            "return_pending" => Ok(LoanState::ReturnPending { requested_at: requested_at()? }),
            "returned" => Ok(LoanState::Returned { requested_at: requested_at()? }),
            "not_found" => Ok(LoanState::NotFound { requested_at: requested_at()? }),
            other => Err(format!("unknown loan state '{}'", other)),
        }
    }

    pub fn status(&self) -> LoanStatus {
        match self {
            LoanState::Pending => LoanStatus::Pending,
            LoanState::Active | LoanState::ReturnPending { .. } => LoanStatus::Active,
            LoanState::Denied { .. } => LoanStatus::Denied,
            LoanState::Returned { .. } => LoanStatus::Returned,
            LoanState::NotFound { .. } => LoanStatus::NotFound,
        }
    }

    pub fn approval_status(&self) -> ApprovalStatus {
        match self {
            LoanState::Pending => ApprovalStatus::Pending,
            LoanState::Denied { .. } => ApprovalStatus::Denied,
            _ => ApprovalStatus::Approved,
        }
    }

    pub fn return_requested(&self) -> bool {
        self.return_requested_at().is_some()
    }

    pub fn return_approval_status(&self) -> ReturnApprovalStatus {
        match self {
            LoanState::ReturnPending { .. } => ReturnApprovalStatus::Pending,
            LoanState::Returned { .. } => ReturnApprovalStatus::Approved,
            LoanState::NotFound { .. } => ReturnApprovalStatus::NotFound,
            _ => ReturnApprovalStatus::NotRequested,
        }
    }

    pub fn denied_at(&self) -> Option<DateTime<Utc>> {
        match self {
            LoanState::Denied { denied_at } => Some(*denied_at),
            _ => None,
        }
    }

    pub fn return_requested_at(&self) -> Option<DateTime<Utc>> {
        match self {
            LoanState::ReturnPending { requested_at }
            | LoanState::Returned { requested_at }
            | LoanState::NotFound { requested_at } => Some(*requested_at),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Admin decision on a pending borrow request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Deny,
}

/// Admin decision on a pending return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnOutcome {
    Approved,
    NotFound,
}

/// A requested change to an existing loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Approve { admin: String },
    Deny { admin: String },
    Extend { days: i64, hours: i64 },
    RequestReturn,
    ReviewReturn { outcome: ReturnOutcome, admin: String },
    MarkFound { admin: String },
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Approve { .. } => "approve",
            Transition::Deny { .. } => "deny",
            Transition::Extend { .. } => "extend",
            Transition::RequestReturn => "request-return",
            Transition::ReviewReturn { .. } => "approve-return",
            Transition::MarkFound { .. } => "mark-found",
        }
    }

    pub fn decision(action: ApprovalAction, admin: String) -> Self {
        match action {
            ApprovalAction::Approve => Transition::Approve { admin },
            ApprovalAction::Deny => Transition::Deny { admin },
        }
    }
}

// ---------------------------------------------------------------------------
// Loan
// ---------------------------------------------------------------------------

/// One physical borrowing event
#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    pub id: i32,
    pub borrower_name: String,
    pub borrower_phone: String,
    pub item_name: String,
    pub lab_location: String,
    pub quantity_borrowed: i32,
    pub expected_return_date: NaiveDate,
    pub purpose: String,
    pub photo_filename: Option<String>,
    pub state: LoanState,
    /// Admin behind the last decision on this loan
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Apply a transition, returning the updated loan.
    ///
    /// Fails with `InvalidTransition` when the current state does not allow
    /// it; `self` is never modified.
    pub fn apply(&self, transition: &Transition, now: DateTime<Utc>) -> AppResult<Loan> {
        let mut next = self.clone();

        match transition {
            Transition::Approve { admin } => {
                self.require_pending_approval()?;
                next.state = LoanState::Active;
                next.record_decision(admin, now);
            }
            Transition::Deny { admin } => {
                self.require_pending_approval()?;
                next.state = LoanState::Denied { denied_at: now };
                next.record_decision(admin, now);
            }
            Transition::Extend { days, hours } => {
                next.expected_return_date =
                    extend_date(self.expected_return_date, *days, *hours)?;
            }
            Transition::RequestReturn => {
                match self.state {
                    LoanState::Active => {}
                    LoanState::Returned { .. } => {
                        return Err(AppError::invalid_transition(
                            self.state,
                            "Item has already been returned",
                        ))
                    }
                    LoanState::ReturnPending { .. } | LoanState::NotFound { .. } => {
                        return Err(AppError::invalid_transition(
                            self.state,
                            "Return request already submitted for this item",
                        ))
                    }
                    LoanState::Pending | LoanState::Denied { .. } => {
                        return Err(AppError::invalid_transition(
                            self.state,
                            "Cannot return an item that hasn't been approved for borrowing",
                        ))
                    }
                }
                next.state = LoanState::ReturnPending { requested_at: now };
            }
            Transition::ReviewReturn { outcome, admin } => {
                let requested_at = match self.state {
                    LoanState::ReturnPending { requested_at } => requested_at,
                    LoanState::Pending | LoanState::Active | LoanState::Denied { .. } => {
                        return Err(AppError::invalid_transition(
                            self.state,
                            "No return request has been made for this loan",
                        ))
                    }
                    _ => {
                        return Err(AppError::invalid_transition(
                            self.state,
                            format!(
                                "Return request is not pending (current status: {})",
                                self.state.return_approval_status().as_str()
                            ),
                        ))
                    }
                };
                next.state = match outcome {
                    ReturnOutcome::Approved => LoanState::Returned { requested_at },
                    ReturnOutcome::NotFound => LoanState::NotFound { requested_at },
                };
                next.record_decision(admin, now);
            }
            Transition::MarkFound { admin } => {
                if !matches!(self.state, LoanState::NotFound { .. }) {
                    return Err(AppError::invalid_transition(
                        self.state,
                        "Item is not marked as not found",
                    ));
                }
                next.state = LoanState::Active;
                next.record_decision(admin, now);
            }
        }

        next.updated_at = now;
        Ok(next)
    }

    fn require_pending_approval(&self) -> AppResult<()> {
        if self.state == LoanState::Pending {
            Ok(())
        } else {
            Err(AppError::invalid_transition(
                self.state,
                format!(
                    "Loan is not pending approval (approval status: {})",
                    self.state.approval_status().as_str()
                ),
            ))
        }
    }

    fn record_decision(&mut self, admin: &str, now: DateTime<Utc>) {
        self.approved_by = Some(admin.to_string());
        self.approved_at = Some(now);
    }

    /// Approved, still out, and due before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.state.status() == LoanStatus::Active
            && self.state.approval_status() == ApprovalStatus::Approved
            && self.expected_return_date < today
    }

    /// Denied before `cutoff`, and therefore eligible for deletion
    pub fn is_purgeable(&self, cutoff: DateTime<Utc>) -> bool {
        matches!(self.state, LoanState::Denied { denied_at } if denied_at < cutoff)
    }

    /// Midnight UTC at the start of the expected return date
    pub fn expected_return_at(&self) -> DateTime<Utc> {
        self.expected_return_date.and_time(NaiveTime::MIN).and_utc()
    }
}

/// Push a date forward by whole days, then by hours, keeping only the date
pub fn extend_date(date: NaiveDate, days: i64, hours: i64) -> AppResult<NaiveDate> {
    let start = date.and_time(NaiveTime::MIN);
    Duration::try_days(days)
        .and_then(|d| start.checked_add_signed(d))
        .and_then(|dt| Duration::try_hours(hours).and_then(|h| dt.checked_add_signed(h)))
        .map(|dt| dt.date())
        .ok_or_else(|| AppError::Validation("Extension is out of range".to_string()))
}

/// Parse a return date given as `YYYY-MM-DD` or as an RFC 3339 timestamp
pub fn parse_return_date(value: &str) -> AppResult<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| {
            AppError::Validation(format!(
                "Invalid expected return date '{}', expected YYYY-MM-DD",
                value
            ))
        })
}

// ---------------------------------------------------------------------------
// Database row
// ---------------------------------------------------------------------------

/// Raw `loans` row
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    pub id: i32,
    pub borrower_name: String,
    pub borrower_phone: String,
    pub item_name: String,
    pub lab_location: String,
    pub quantity_borrowed: i32,
    pub expected_return_date: NaiveDate,
    pub purpose: String,
    pub photo_filename: Option<String>,
    pub state: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub denied_at: Option<DateTime<Utc>>,
    pub return_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LoanRow> for Loan {
    type Error = AppError;

    fn try_from(row: LoanRow) -> Result<Self, Self::Error> {
        let state = LoanState::from_columns(&row.state, row.denied_at, row.return_requested_at)
            .map_err(|e| AppError::Internal(format!("Corrupt loan {}: {}", row.id, e)))?;

        Ok(Loan {
            id: row.id,
            borrower_name: row.borrower_name,
            borrower_phone: row.borrower_phone,
            item_name: row.item_name,
            lab_location: row.lab_location,
            quantity_borrowed: row.quantity_borrowed,
            expected_return_date: row.expected_return_date,
            purpose: row.purpose,
            photo_filename: row.photo_filename,
            state,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// API shapes
// ---------------------------------------------------------------------------

/// Loan as rendered to clients, with the legacy status fields
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanView {
    pub id: i32,
    pub borrower_name: String,
    pub borrower_phone: String,
    pub item_name: String,
    pub lab_location: String,
    pub quantity_borrowed: i32,
    /// Expected return date (YYYY-MM-DD)
    pub expected_return_date: NaiveDate,
    pub purpose: String,
    pub photo_filename: Option<String>,
    pub status: LoanStatus,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub denied_at: Option<DateTime<Utc>>,
    pub return_requested: bool,
    pub return_approval_status: ReturnApprovalStatus,
    pub return_requested_at: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanView {
    pub fn new(loan: &Loan, today: NaiveDate) -> Self {
        Self {
            id: loan.id,
            borrower_name: loan.borrower_name.clone(),
            borrower_phone: loan.borrower_phone.clone(),
            item_name: loan.item_name.clone(),
            lab_location: loan.lab_location.clone(),
            quantity_borrowed: loan.quantity_borrowed,
            expected_return_date: loan.expected_return_date,
            purpose: loan.purpose.clone(),
            photo_filename: loan.photo_filename.clone(),
            status: loan.state.status(),
            approval_status: loan.state.approval_status(),
            approved_by: loan.approved_by.clone(),
            approved_at: loan.approved_at,
            denied_at: loan.state.denied_at(),
            return_requested: loan.state.return_requested(),
            return_approval_status: loan.state.return_approval_status(),
            return_requested_at: loan.state.return_requested_at(),
            is_overdue: loan.is_overdue(today),
            created_at: loan.created_at,
            updated_at: loan.updated_at,
        }
    }
}

/// Validated borrow request, ready to be stored
#[derive(Debug, Clone, Validate)]
pub struct NewLoan {
    #[validate(length(min = 1, message = "Borrower name is required"))]
    pub borrower_name: String,
    #[validate(length(min = 1, message = "Borrower phone is required"))]
    pub borrower_phone: String,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub item_name: String,
    #[validate(length(min = 1, message = "Lab location is required"))]
    pub lab_location: String,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity_borrowed: i32,
    pub expected_return_date: NaiveDate,
    #[validate(length(min = 1, message = "Purpose is required"))]
    pub purpose: String,
    pub photo_filename: Option<String>,
}

/// Text fields of the borrow form, as received
#[derive(Debug, Clone, Default)]
pub struct BorrowForm {
    pub borrower_name: Option<String>,
    pub borrower_phone: Option<String>,
    pub item_name: Option<String>,
    pub lab_location: Option<String>,
    pub quantity_borrowed: Option<String>,
    pub expected_return_date: Option<String>,
    pub purpose: Option<String>,
}

impl BorrowForm {
    /// Store a form field by name; unknown fields are ignored
    pub fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "borrower_name" => &mut self.borrower_name,
            "borrower_phone" => &mut self.borrower_phone,
            "item_name" => &mut self.item_name,
            "lab_location" => &mut self.lab_location,
            "quantity_borrowed" => &mut self.quantity_borrowed,
            "expected_return_date" => &mut self.expected_return_date,
            "purpose" => &mut self.purpose,
            _ => return,
        };
        *slot = Some(value);
    }

    /// Check required fields and build a `NewLoan`
    pub fn into_new_loan(self) -> AppResult<NewLoan> {
        fn required(value: Option<String>) -> AppResult<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Validation("All fields are required".to_string()))
        }

        let borrower_name = required(self.borrower_name)?;
        let borrower_phone = required(self.borrower_phone)?;
        let item_name = required(self.item_name)?;
        let lab_location = required(self.lab_location)?;
        let purpose = required(self.purpose)?;
        let expected_return_date = parse_return_date(&required(self.expected_return_date)?)?;
        let quantity_borrowed = required(self.quantity_borrowed)?
            .parse::<i32>()
            .map_err(|_| AppError::Validation("Quantity must be a whole number".to_string()))?;

        let loan = NewLoan {
            borrower_name,
            borrower_phone,
            item_name,
            lab_location,
            quantity_borrowed,
            expected_return_date,
            purpose,
            photo_filename: None,
        };
        loan.validate()?;
        Ok(loan)
    }
}

/// Body of `POST /admin/loans/{id}/approve`
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApprovalRequest {
    pub action: ApprovalAction,
    /// Name recorded as approver; defaults to the logged-in admin
    pub admin_name: Option<String>,
}

/// Body of `POST /admin/loans/{id}/extend`
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExtendRequest {
    #[serde(default)]
    #[validate(range(min = 0, max = 3650, message = "extend_days must be between 0 and 3650"))]
    pub extend_days: i64,
    #[serde(default)]
    #[validate(range(min = 0, max = 87600, message = "extend_hours must be between 0 and 87600"))]
    pub extend_hours: i64,
    pub admin_name: Option<String>,
}

/// Body of `POST /admin/loans/{id}/approve-return`
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnApprovalRequest {
    pub action: ReturnOutcome,
    pub admin_name: Option<String>,
}

/// Body of `POST /admin/loans/{id}/mark-found`
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MarkFoundRequest {
    pub admin_name: Option<String>,
}

#[cfg(test)]
pub(crate) fn test_loan(id: i32, state: LoanState, expected_return_date: NaiveDate) -> Loan {
    let created_at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 1, 1, 9, 30, 0).unwrap();
    Loan {
        id,
        borrower_name: "Ada Lovelace".to_string(),
        borrower_phone: "555-0100".to_string(),
        item_name: "Oscilloscope".to_string(),
        lab_location: "Robotics Lab".to_string(),
        quantity_borrowed: 1,
        expected_return_date,
        purpose: "Motor driver debugging".to_string(),
        photo_filename: None,
        state,
        approved_by: None,
        approved_at: None,
        created_at,
        updated_at: created_at,
    }
}
