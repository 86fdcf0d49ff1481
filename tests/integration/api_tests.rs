//! API integration tests
//!
//! Need a running server and an admin created with
//! `provision-admin --username labadmin --password labadmin-pass`.

use reqwest::{multipart, Client};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api";

fn admin_credentials() -> (String, String) {
    (
        std::env::var("LABLOAN_TEST_ADMIN").unwrap_or_else(|_| "labadmin".to_string()),
        std::env::var("LABLOAN_TEST_PASSWORD").unwrap_or_else(|_| "labadmin-pass".to_string()),
    )
}

/// Helper to get an admin token
async fn get_auth_token(client: &Client) -> String {
    let (username, password) = admin_credentials();
    let response = client
        .post(format!("{}/admin/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

fn borrow_form(borrower: &str) -> multipart::Form {
    multipart::Form::new()
        .text("borrower_name", borrower.to_string())
        .text("borrower_phone", "555-0199")
        .text("item_name", "Logic Analyzer")
        .text("lab_location", "Integration Lab")
        .text("quantity_borrowed", "1")
        .text("expected_return_date", "2031-06-30")
        .text("purpose", "Bus timing capture")
}

/// Submit a borrow request and return its id
async fn submit_borrow(client: &Client, borrower: &str) -> i64 {
    let response = client
        .post(format!("{}/borrow", BASE_URL))
        .multipart(borrow_form(borrower))
        .send()
        .await
        .expect("Failed to send borrow request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["loan_id"].as_i64().expect("No loan_id in response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();
    let (username, password) = admin_credentials();

    let response = client
        .post(format!("{}/admin/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["admin"]["username"], username);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let (username, _) = admin_credentials();

    let response = client
        .post(format!("{}/admin/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "wrong-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_admin_routes_require_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/admin/loans/pending", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
#[ignore]
async fn test_borrow_missing_field() {
    let client = Client::new();

    let form = multipart::Form::new()
        .text("borrower_name", "Grace Hopper")
        .text("item_name", "Soldering Station");

    let response = client
        .post(format!("{}/borrow", BASE_URL))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_borrow_rejects_unsupported_photo() {
    let client = Client::new();

    let photo = multipart::Part::bytes(b"MZ not an image".to_vec()).file_name("payload.exe");
    let form = borrow_form("Photo Tester").part("item_photo", photo);

    let response = client
        .post(format!("{}/borrow", BASE_URL))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_full_loan_lifecycle() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let loan_id = submit_borrow(&client, "Lifecycle Tester").await;

    // Pending requests include the new loan
    let pending: Value = client
        .get(format!("{}/admin/loans/pending", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(pending
        .as_array()
        .expect("array")
        .iter()
        .any(|loan| loan["id"] == loan_id));

    // Approve
    let response = client
        .post(format!("{}/admin/loans/{}/approve", BASE_URL, loan_id))
        .bearer_auth(&token)
        .json(&json!({ "action": "approve", "admin_name": "Dr. Integration" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["status"], "active");
    assert_eq!(loan["approval_status"], "approved");
    assert_eq!(loan["approved_by"], "Dr. Integration");

    // Request return
    let response = client
        .post(format!("{}/return/{}", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["return_requested"], true);
    assert_eq!(loan["return_approval_status"], "pending");

    // A second request is refused
    let response = client
        .post(format!("{}/return/{}", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Approve the return
    let response = client
        .post(format!("{}/admin/loans/{}/approve-return", BASE_URL, loan_id))
        .bearer_auth(&token)
        .json(&json!({ "action": "approved" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["status"], "returned");
    assert_eq!(loan["return_approval_status"], "approved");
}

#[tokio::test]
#[ignore]
async fn test_lost_item_found_again() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let loan_id = submit_borrow(&client, "Lost Item Tester").await;

    for (path, body) in [
        ("approve", json!({ "action": "approve" })),
        ("approve-return", json!({ "action": "not_found" })),
    ] {
        if path == "approve-return" {
            client
                .post(format!("{}/return/{}", BASE_URL, loan_id))
                .send()
                .await
                .expect("Failed to send request");
        }
        let response = client
            .post(format!("{}/admin/loans/{}/{}", BASE_URL, loan_id, path))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success(), "{} failed", path);
    }

    let lost: Value = client
        .get(format!("{}/admin/loans/lost-missing", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(lost
        .as_array()
        .expect("array")
        .iter()
        .any(|loan| loan["id"] == loan_id && loan["status"] == "not_found"));

    let response = client
        .post(format!("{}/admin/loans/{}/mark-found", BASE_URL, loan_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["status"], "active");
    assert_eq!(loan["return_requested"], false);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_approvals_have_one_winner() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let loan_id = submit_borrow(&client, "Race Tester").await;

    let approve = |admin: &'static str| {
        client
            .post(format!("{}/admin/loans/{}/approve", BASE_URL, loan_id))
            .bearer_auth(&token)
            .json(&json!({ "action": "approve", "admin_name": admin }))
            .send()
    };

    // Both requests are in flight at the same time
    let (first, second) = tokio::join!(approve("First Admin"), approve("Second Admin"));
    let first = first.expect("Failed to send request");
    let second = second.expect("Failed to send request");

    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 409]);

    let (winner, loser) = if first.status() == 200 {
        ("First Admin", second)
    } else {
        ("Second Admin", first)
    };
    let conflict: Value = loser.json().await.expect("Failed to parse response");
    assert_eq!(conflict["error"], "InvalidTransition");

    let loan: Value = client
        .get(format!("{}/loans/{}", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(loan["status"], "active");
    assert_eq!(loan["approved_by"], winner);
}

#[tokio::test]
#[ignore]
async fn test_extend_loan() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let loan_id = submit_borrow(&client, "Extend Tester").await;

    let response = client
        .post(format!("{}/admin/loans/{}/extend", BASE_URL, loan_id))
        .bearer_auth(&token)
        .json(&json!({ "extend_days": 3, "extend_hours": 24 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let loan: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loan["expected_return_date"], "2031-07-04");

    let response = client
        .post(format!("{}/admin/loans/{}/extend", BASE_URL, loan_id))
        .bearer_auth(&token)
        .json(&json!({ "extend_days": -1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_lab_dashboard_filter() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let loan_id = submit_borrow(&client, "Dashboard Tester").await;

    let pending: Value = client
        .get(format!("{}/admin/loans/by-lab/Integration%20Lab?status=pending", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let loans = pending.as_array().expect("array");
    assert!(loans.iter().any(|loan| loan["id"] == loan_id));
    assert!(loans.iter().all(|loan| loan["approval_status"] == "pending"));
}

#[tokio::test]
#[ignore]
async fn test_export_csv() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/admin/export-csv", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("lab_equipment_loans.csv"));

    let body = response.text().await.expect("Failed to read body");
    assert!(body.starts_with("ID,Created At,Updated At,Borrower Name"));
}

#[tokio::test]
#[ignore]
async fn test_cleanup_denied() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/admin/cleanup-denied", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["deleted_count"].is_u64());
}

/// Needs `DATABASE_URL` pointing at the server's database
#[tokio::test]
#[ignore]
async fn test_lab_dashboard_candidates_skip_archived_returns() {
    use chrono::{Duration, Utc};
    use labloan_server::{models::dashboard::archive_cutoff, repository::Repository};

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("Failed to connect to database");

    let lab = format!("Archive Lab {}", uuid::Uuid::new_v4());
    let now = Utc::now();

    async fn insert_returned(
        pool: &sqlx::PgPool,
        lab: &str,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> i32 {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO loans (
                borrower_name, borrower_phone, item_name, lab_location, quantity_borrowed,
                expected_return_date, purpose, state, approved_by, approved_at,
                return_requested_at, created_at, updated_at
            )
            VALUES ('Archive Tester', '555-0100', 'Multimeter', $1, 1,
                    $2, 'Calibration', 'returned', 'Lab Admin', $3, $3, $3, $3)
            RETURNING id
            "#,
        )
        .bind(lab)
        .bind(updated_at.date_naive())
        .bind(updated_at)
        .fetch_one(pool)
        .await
        .expect("Failed to insert loan")
    }

    let archived = insert_returned(&pool, &lab, now - Duration::days(20)).await;
    let recent = insert_returned(&pool, &lab, now - Duration::days(10)).await;

    let candidates = Repository::new(pool.clone())
        .loans
        .list_lab_dashboard(&lab, archive_cutoff(now))
        .await
        .expect("Failed to list candidates");
    let ids: Vec<i32> = candidates.iter().map(|loan| loan.id).collect();

    assert!(ids.contains(&recent));
    assert!(!ids.contains(&archived));

    sqlx::query("DELETE FROM loans WHERE lab_location = $1")
        .bind(&lab)
        .execute(&pool)
        .await
        .expect("Failed to clean up");
}
