//! Dashboard views over the loan set
//!
//! Every view is a pure function of the candidate loans and the current
//! time. The repository narrows candidates with coarse SQL predicates; the
//! exact filter and the ordering live here.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::cmp::Reverse;
use utoipa::IntoParams;

use super::loan::{ApprovalStatus, Loan, LoanState, LoanStatus};

/// Returned loans older than this move from the dashboard to the archive
pub const ARCHIVE_AFTER_DAYS: i64 = 14;

/// Status filter of the per-lab dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Borrowed,
    Pending,
    Rejected,
    Returned,
    NotFound,
}

impl StatusFilter {
    /// Parse a query value; anything unrecognised means `All`
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("borrowed") => StatusFilter::Borrowed,
            Some("pending") => StatusFilter::Pending,
            Some("rejected") => StatusFilter::Rejected,
            Some("returned") => StatusFilter::Returned,
            Some("not_found") => StatusFilter::NotFound,
            _ => StatusFilter::All,
        }
    }

    pub fn matches(&self, loan: &Loan, now: DateTime<Utc>) -> bool {
        let state = &loan.state;
        match self {
            StatusFilter::Borrowed => {
                state.approval_status() == ApprovalStatus::Approved
                    && state.status() == LoanStatus::Active
            }
            StatusFilter::Rejected => state.approval_status() == ApprovalStatus::Denied,
            StatusFilter::Returned => {
                state.status() == LoanStatus::Returned && !is_archived(loan, now)
            }
            StatusFilter::Pending => state.approval_status() == ApprovalStatus::Pending,
            StatusFilter::NotFound => state.status() == LoanStatus::NotFound,
            StatusFilter::All => state.status() != LoanStatus::Returned || !is_archived(loan, now),
        }
    }
}

/// Query string of the per-lab dashboard
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// all, borrowed, pending, rejected, returned or not_found
    pub status: Option<String>,
}

/// Returned loans last updated at or before this instant are archived
pub fn archive_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(ARCHIVE_AFTER_DAYS)
}

/// Returned long enough ago to leave the dashboard
pub fn is_archived(loan: &Loan, now: DateTime<Utc>) -> bool {
    loan.state.status() == LoanStatus::Returned && loan.updated_at <= archive_cutoff(now)
}

/// Sort rank on the lab dashboard: overdue first, denied last
pub fn dashboard_rank(loan: &Loan, today: NaiveDate) -> u8 {
    if loan.state.approval_status() == ApprovalStatus::Denied {
        4
    } else if loan.state.status() == LoanStatus::NotFound {
        3
    } else if loan.is_overdue(today) {
        1
    } else {
        2
    }
}

/// Loans of one lab matching `filter`, in dashboard order
pub fn lab_dashboard(loans: Vec<Loan>, lab: &str, filter: StatusFilter, now: DateTime<Utc>) -> Vec<Loan> {
    let today = now.date_naive();
    let mut view: Vec<Loan> = loans
        .into_iter()
        .filter(|loan| loan.lab_location == lab && filter.matches(loan, now))
        .collect();
    view.sort_by_key(|loan| (dashboard_rank(loan, today), loan.expected_return_date));
    view
}

/// Global list of items out on loan; lost items come first, then newest
pub fn active_loans(loans: Vec<Loan>) -> Vec<Loan> {
    let mut view: Vec<Loan> = loans
        .into_iter()
        .filter(|loan| matches!(loan.state.status(), LoanStatus::Active | LoanStatus::NotFound))
        .collect();
    view.sort_by_key(|loan| {
        (
            loan.state.status() != LoanStatus::NotFound,
            Reverse(loan.created_at),
        )
    });
    view
}

/// Requests waiting for an approve/deny decision, newest first
pub fn pending_requests(loans: Vec<Loan>) -> Vec<Loan> {
    let mut view: Vec<Loan> = loans
        .into_iter()
        .filter(|loan| loan.state == LoanState::Pending)
        .collect();
    view.sort_by_key(|loan| Reverse(loan.created_at));
    view
}

/// Returns waiting for an admin to check the item in, oldest request first
pub fn pending_returns(loans: Vec<Loan>) -> Vec<Loan> {
    let mut view: Vec<Loan> = loans
        .into_iter()
        .filter(|loan| matches!(loan.state, LoanState::ReturnPending { .. }))
        .collect();
    view.sort_by_key(|loan| loan.state.return_requested_at());
    view
}

/// Items reported missing plus returns not yet checked in
pub fn lost_missing(loans: Vec<Loan>) -> Vec<Loan> {
    loans
        .into_iter()
        .filter(|loan| {
            matches!(
                loan.state,
                LoanState::NotFound { .. } | LoanState::ReturnPending { .. }
            )
        })
        .collect()
}

/// Returned loans older than the dashboard window, newest first
pub fn archive(loans: Vec<Loan>, now: DateTime<Utc>) -> Vec<Loan> {
    let mut view: Vec<Loan> = loans
        .into_iter()
        .filter(|loan| is_archived(loan, now))
        .collect();
    view.sort_by_key(|loan| Reverse(loan.updated_at));
    view
}
