//! Borrower-facing loan endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::loan::{BorrowForm, LoanView},
    services::loans::PhotoUpload,
    AppState,
};

/// Multipart field carrying the optional item photo
const PHOTO_FIELD: &str = "item_photo";

/// Borrow form, as documented; the handler reads it from multipart fields
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct BorrowRequest {
    pub borrower_name: String,
    pub borrower_phone: String,
    pub item_name: String,
    pub lab_location: String,
    pub quantity_borrowed: i32,
    /// YYYY-MM-DD or RFC 3339
    pub expected_return_date: String,
    pub purpose: String,
    /// Optional photo of the item (max 10 MiB)
    #[schema(format = Binary)]
    pub item_photo: Option<String>,
}

/// Borrow request accepted
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    pub loan_id: i32,
}

fn form_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid form data: {}", e))
}

/// Items currently out on loan or missing
#[utoipa::path(
    get,
    path = "/loans/active",
    tag = "loans",
    responses(
        (status = 200, description = "Active loans, most urgent first", body = Vec<LoanView>)
    )
)]
pub async fn active_loans(State(state): State<AppState>) -> AppResult<Json<Vec<LoanView>>> {
    let loans = state.services.loans.active_loans().await?;
    Ok(Json(loans))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanView),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanView>> {
    let loan = state.services.loans.get(id).await?;
    Ok(Json(loan))
}

/// Submit a borrow request
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "loans",
    request_body(content = BorrowRequest, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Borrow request submitted", body = BorrowResponse),
        (status = 400, description = "Missing field, bad date or rejected photo")
    )
)]
pub async fn borrow(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let mut form = BorrowForm::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == PHOTO_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(form_error)?;
            // Browsers send an empty part when no file is chosen
            if !filename.is_empty() && !data.is_empty() {
                photo = Some(PhotoUpload {
                    filename,
                    data: data.to_vec(),
                });
            }
        } else {
            let value = field.text().await.map_err(form_error)?;
            form.set(&name, value);
        }
    }

    let loan = state.services.loans.submit(form, photo).await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            message: "Borrow request submitted and awaiting approval".to_string(),
            loan_id: loan.id,
        }),
    ))
}

/// Ask to return a borrowed item
#[utoipa::path(
    post,
    path = "/return/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Return requested", body = LoanView),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not active")
    )
)]
pub async fn request_return(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanView>> {
    let loan = state.services.loans.request_return(id).await?;
    Ok(Json(loan))
}
