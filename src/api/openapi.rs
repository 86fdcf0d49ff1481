//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, health, items, loans};

/// Registers the JWT scheme referenced by `bearer_auth`
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lab Loan API",
        version = "1.0.0",
        description = "Lab equipment borrowing, approval and return tracking"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Items
        items::list_items,
        items::get_item,
        items::create_item,
        // Loans
        loans::active_loans,
        loans::get_loan,
        loans::borrow,
        loans::request_return,
        // Admin
        admin::login,
        admin::pending_loans,
        admin::loans_by_lab,
        admin::approve_loan,
        admin::extend_loan,
        admin::approve_return,
        admin::mark_found,
        admin::pending_returns,
        admin::lost_missing,
        admin::archived_loans,
        admin::export_csv,
        admin::cleanup_denied,
    ),
    components(
        schemas(
            // Items
            crate::models::item::Item,
            crate::models::item::CreateItem,
            // Loans
            crate::models::loan::LoanView,
            crate::models::loan::LoanStatus,
            crate::models::loan::ApprovalStatus,
            crate::models::loan::ReturnApprovalStatus,
            crate::models::loan::ApprovalAction,
            crate::models::loan::ReturnOutcome,
            crate::models::loan::ApprovalRequest,
            crate::models::loan::ExtendRequest,
            crate::models::loan::ReturnApprovalRequest,
            crate::models::loan::MarkFoundRequest,
            loans::BorrowRequest,
            loans::BorrowResponse,
            // Admin
            crate::models::admin::AdminInfo,
            admin::LoginRequest,
            admin::LoginResponse,
            admin::CleanupResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Equipment catalog"),
        (name = "loans", description = "Borrow requests and returns"),
        (name = "admin", description = "Approvals, dashboards, export and cleanup")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_admin_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/admin/loans/{id}/approve"));
        assert!(doc.paths.paths.contains_key("/borrow"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
