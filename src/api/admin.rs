//! Admin endpoints: login, approvals, dashboards, export and cleanup

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        admin::AdminInfo,
        dashboard::{DashboardQuery, StatusFilter},
        loan::{
            ApprovalRequest, ExtendRequest, LoanView, MarkFoundRequest, ReturnApprovalRequest,
            Transition,
        },
        report::EXPORT_FILENAME,
    },
    AppState,
};

use super::AuthenticatedAdmin;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response with JWT token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// JWT access token
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    pub admin: AdminInfo,
}

/// Result of a manual denied-loan cleanup
#[derive(Serialize, ToSchema)]
pub struct CleanupResponse {
    pub message: String,
    pub deleted_count: u64,
}

/// Authenticate an admin and get a JWT token
#[utoipa::path(
    post,
    path = "/admin/login",
    tag = "admin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, admin) = state
        .services
        .auth
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        admin: AdminInfo::from(&admin),
    }))
}

/// Borrow requests waiting for a decision
#[utoipa::path(
    get,
    path = "/admin/loans/pending",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests, newest first", body = Vec<LoanView>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn pending_loans(
    State(state): State<AppState>,
    AuthenticatedAdmin(_claims): AuthenticatedAdmin,
) -> AppResult<Json<Vec<LoanView>>> {
    Ok(Json(state.services.loans.pending_requests().await?))
}

/// Dashboard for one lab
#[utoipa::path(
    get,
    path = "/admin/loans/by-lab/{lab}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("lab" = String, Path, description = "Lab location"),
        DashboardQuery
    ),
    responses(
        (status = 200, description = "Loans of the lab, most urgent first", body = Vec<LoanView>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn loans_by_lab(
    State(state): State<AppState>,
    AuthenticatedAdmin(_claims): AuthenticatedAdmin,
    Path(lab): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Vec<LoanView>>> {
    let filter = StatusFilter::parse(query.status.as_deref());
    Ok(Json(state.services.loans.lab_dashboard(&lab, filter).await?))
}

/// Approve or deny a borrow request
#[utoipa::path(
    post,
    path = "/admin/loans/{id}/approve",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Decision recorded", body = LoanView),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not pending")
    )
)]
pub async fn approve_loan(
    State(state): State<AppState>,
    AuthenticatedAdmin(claims): AuthenticatedAdmin,
    Path(id): Path<i32>,
    Json(request): Json<ApprovalRequest>,
) -> AppResult<Json<LoanView>> {
    let transition = Transition::decision(request.action, claims.approver(request.admin_name));
    Ok(Json(state.services.loans.transition(id, transition).await?))
}

/// Push back the expected return date
#[utoipa::path(
    post,
    path = "/admin/loans/{id}/extend",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ExtendRequest,
    responses(
        (status = 200, description = "Loan extended", body = LoanView),
        (status = 400, description = "Invalid extension"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn extend_loan(
    State(state): State<AppState>,
    AuthenticatedAdmin(claims): AuthenticatedAdmin,
    Path(id): Path<i32>,
    Json(request): Json<ExtendRequest>,
) -> AppResult<Json<LoanView>> {
    request.validate()?;

    let loan = state
        .services
        .loans
        .transition(
            id,
            Transition::Extend {
                days: request.extend_days,
                hours: request.extend_hours,
            },
        )
        .await?;

    tracing::info!(
        "Loan {} extended by {}d {}h by {}",
        id,
        request.extend_days,
        request.extend_hours,
        claims.approver(request.admin_name)
    );
    Ok(Json(loan))
}

/// Confirm a return, or record the item as not found
#[utoipa::path(
    post,
    path = "/admin/loans/{id}/approve-return",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ReturnApprovalRequest,
    responses(
        (status = 200, description = "Return reviewed", body = LoanView),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "No return pending")
    )
)]
pub async fn approve_return(
    State(state): State<AppState>,
    AuthenticatedAdmin(claims): AuthenticatedAdmin,
    Path(id): Path<i32>,
    Json(request): Json<ReturnApprovalRequest>,
) -> AppResult<Json<LoanView>> {
    let transition = Transition::ReviewReturn {
        outcome: request.action,
        admin: claims.approver(request.admin_name),
    };
    Ok(Json(state.services.loans.transition(id, transition).await?))
}

/// A missing item turned up; the loan goes back to borrowed
#[utoipa::path(
    post,
    path = "/admin/loans/{id}/mark-found",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = MarkFoundRequest,
    responses(
        (status = 200, description = "Item marked as found", body = LoanView),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not lost")
    )
)]
pub async fn mark_found(
    State(state): State<AppState>,
    AuthenticatedAdmin(claims): AuthenticatedAdmin,
    Path(id): Path<i32>,
    request: Option<Json<MarkFoundRequest>>,
) -> AppResult<Json<LoanView>> {
    let admin_name = request.and_then(|Json(body)| body.admin_name);
    let transition = Transition::MarkFound {
        admin: claims.approver(admin_name),
    };
    Ok(Json(state.services.loans.transition(id, transition).await?))
}

/// Returns waiting for admin review
#[utoipa::path(
    get,
    path = "/admin/loans/pending-returns",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending returns, oldest request first", body = Vec<LoanView>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn pending_returns(
    State(state): State<AppState>,
    AuthenticatedAdmin(_claims): AuthenticatedAdmin,
) -> AppResult<Json<Vec<LoanView>>> {
    Ok(Json(state.services.loans.pending_returns().await?))
}

/// Items recorded as not found, plus those awaiting return review
#[utoipa::path(
    get,
    path = "/admin/loans/lost-missing",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Lost and missing items", body = Vec<LoanView>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn lost_missing(
    State(state): State<AppState>,
    AuthenticatedAdmin(_claims): AuthenticatedAdmin,
) -> AppResult<Json<Vec<LoanView>>> {
    Ok(Json(state.services.loans.lost_missing().await?))
}

/// Returned loans older than the dashboard window
#[utoipa::path(
    get,
    path = "/admin/loans/archived",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Archived loans", body = Vec<LoanView>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn archived_loans(
    State(state): State<AppState>,
    AuthenticatedAdmin(_claims): AuthenticatedAdmin,
) -> AppResult<Json<Vec<LoanView>>> {
    Ok(Json(state.services.loans.archive().await?))
}

/// Download every loan as CSV
#[utoipa::path(
    get,
    path = "/admin/export-csv",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn export_csv(
    State(state): State<AppState>,
    AuthenticatedAdmin(_claims): AuthenticatedAdmin,
) -> AppResult<impl IntoResponse> {
    let body = state.services.loans.export_csv().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        body,
    ))
}

/// Purge denied requests past the retention window now
#[utoipa::path(
    post,
    path = "/admin/cleanup-denied",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cleanup done", body = CleanupResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn cleanup_denied(
    State(state): State<AppState>,
    AuthenticatedAdmin(claims): AuthenticatedAdmin,
) -> AppResult<Json<CleanupResponse>> {
    let deleted_count = state.services.loans.cleanup_denied().await?;
    tracing::info!("Admin {} purged {} denied loans", claims.sub, deleted_count);

    Ok(Json(CleanupResponse {
        message: format!("Removed {} denied loan(s)", deleted_count),
        deleted_count,
    }))
}
