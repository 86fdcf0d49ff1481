//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanRow, NewLoan, Transition},
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

fn into_loans(rows: Vec<LoanRow>) -> AppResult<Vec<Loan>> {
    rows.into_iter().map(Loan::try_from).collect()
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?
            .try_into()
    }

    /// Store a new borrow request in the pending state
    pub async fn create(&self, loan: &NewLoan) -> AppResult<Loan> {
        let row = sqlx::query_as::<_, LoanRow>(
            r#"
            INSERT INTO loans (
                borrower_name, borrower_phone, item_name, lab_location,
                quantity_borrowed, expected_return_date, purpose, photo_filename, state
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
            RETURNING *
            "#,
        )
        .bind(&loan.borrower_name)
        .bind(&loan.borrower_phone)
        .bind(&loan.item_name)
        .bind(&loan.lab_location)
        .bind(loan.quantity_borrowed)
        .bind(loan.expected_return_date)
        .bind(&loan.purpose)
        .bind(&loan.photo_filename)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Every loan, oldest first
    pub async fn list_all(&self) -> AppResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, LoanRow>("SELECT * FROM loans ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        into_loans(rows)
    }

    /// Dashboard candidates of one lab: everything except returned loans
    /// last updated at or before `archive_cutoff`
    pub async fn list_lab_dashboard(
        &self,
        lab: &str,
        archive_cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, LoanRow>(
            r#"
            SELECT * FROM loans
            WHERE lab_location = $1
              AND (state <> 'returned' OR updated_at > $2)
            ORDER BY id
            "#,
        )
        .bind(lab)
        .bind(archive_cutoff)
        .fetch_all(&self.pool)
        .await?;
        into_loans(rows)
    }

    /// Loans whose stored state is one of `states`
    pub async fn list_in_states(&self, states: &[&str]) -> AppResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, LoanRow>(
            "SELECT * FROM loans WHERE state = ANY($1) ORDER BY id",
        )
        .bind(states)
        .fetch_all(&self.pool)
        .await?;
        into_loans(rows)
    }

    /// Returned loans last touched at or before `cutoff`, newest first
    pub async fn list_returned_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, LoanRow>(
            r#"
            SELECT * FROM loans
            WHERE state = 'returned' AND updated_at <= $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        into_loans(rows)
    }

    /// Apply a lifecycle transition atomically.
    ///
    /// The row is locked for the duration of the transaction, so concurrent
    /// transitions on the same loan are serialized and each one validates
    /// against the state left by the previous one. A rejected transition
    /// rolls back without writing.
    pub async fn apply_transition(
        &self,
        id: i32,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let current: Loan = sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?
            .try_into()?;

        let next = current.apply(transition, now)?;

        let row = sqlx::query_as::<_, LoanRow>(
            r#"
            UPDATE loans
            SET expected_return_date = $2,
                state = $3,
                approved_by = $4,
                approved_at = $5,
                denied_at = $6,
                return_requested_at = $7,
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next.expected_return_date)
        .bind(next.state.as_str())
        .bind(&next.approved_by)
        .bind(next.approved_at)
        .bind(next.state.denied_at())
        .bind(next.state.return_requested_at())
        .bind(next.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// Delete loans denied before `cutoff`; returns the number removed
    pub async fn delete_denied_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM loans WHERE state = 'denied' AND denied_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
