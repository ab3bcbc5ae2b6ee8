//! Loans repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;

use super::PgTx;
use crate::{
    error::AppResult,
    models::loan::{Loan, LoanExtension, NewLoan, NewLoanExtension},
};

const LOAN_COLUMNS: &str = "id, copy_id, item_id, member_id, staff_id, loan_type, start_date, \
                            due_date, return_date, status, is_late, nb_extensions";

#[async_trait]
pub trait LoanStore: Send {
    /// Fetch and lock a loan
    async fn get_loan(&mut self, loan_id: i32) -> AppResult<Option<Loan>>;

    async fn open_loan_for_copy(&mut self, copy_id: i32) -> AppResult<Option<Loan>>;

    async fn count_open_loans(&mut self, member_id: i32) -> AppResult<i64>;

    /// All open loans, earliest due date first
    async fn list_open_loans(&mut self) -> AppResult<Vec<Loan>>;

    async fn list_member_loans(&mut self, member_id: i32, open_only: bool) -> AppResult<Vec<Loan>>;

    /// Open loans due before `today` whose late flag is not set yet (locked)
    async fn unflagged_overdue_loans(&mut self, today: NaiveDate) -> AppResult<Vec<Loan>>;

    /// Open loans due in `[from, to]`
    async fn loans_due_between(&mut self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<Loan>>;

    async fn insert_loan(&mut self, loan: &NewLoan) -> AppResult<Loan>;

    /// Persist the mutable fields of a loan
    async fn update_loan(&mut self, loan: &Loan) -> AppResult<()>;

    async fn insert_extension(&mut self, extension: &NewLoanExtension) -> AppResult<LoanExtension>;

    /// Extensions requested by a member in `[from, to]`
    async fn count_extensions(&mut self, member_id: i32, from: NaiveDate, to: NaiveDate) -> AppResult<i64>;
}

#[async_trait]
impl LoanStore for PgTx {
    async fn get_loan(&mut self, loan_id: i32) -> AppResult<Option<Loan>> {
        let query = format!("SELECT {} FROM loans WHERE id = $1 FOR UPDATE", LOAN_COLUMNS);
        let loan = sqlx::query_as::<_, Loan>(&query)
            .bind(loan_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(loan)
    }

    async fn open_loan_for_copy(&mut self, copy_id: i32) -> AppResult<Option<Loan>> {
        let query = format!(
            "SELECT {} FROM loans WHERE copy_id = $1 AND status = 'open'",
            LOAN_COLUMNS
        );
        let loan = sqlx::query_as::<_, Loan>(&query)
            .bind(copy_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(loan)
    }

    async fn count_open_loans(&mut self, member_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE member_id = $1 AND status = 'open'",
        )
        .bind(member_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn list_open_loans(&mut self) -> AppResult<Vec<Loan>> {
        let query = format!(
            "SELECT {} FROM loans WHERE status = 'open' ORDER BY due_date, id",
            LOAN_COLUMNS
        );
        let loans = sqlx::query_as::<_, Loan>(&query)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(loans)
    }

    async fn list_member_loans(&mut self, member_id: i32, open_only: bool) -> AppResult<Vec<Loan>> {
        let query = format!(
            "SELECT {} FROM loans WHERE member_id = $1 AND ($2 = FALSE OR status = 'open') \
             ORDER BY start_date DESC, id DESC",
            LOAN_COLUMNS
        );
        let loans = sqlx::query_as::<_, Loan>(&query)
            .bind(member_id)
            .bind(open_only)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(loans)
    }

    async fn unflagged_overdue_loans(&mut self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        let query = format!(
            "SELECT {} FROM loans \
             WHERE status = 'open' AND is_late = FALSE AND due_date < $1 \
             ORDER BY due_date, id \
             FOR UPDATE",
            LOAN_COLUMNS
        );
        let loans = sqlx::query_as::<_, Loan>(&query)
            .bind(today)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(loans)
    }

    async fn loans_due_between(&mut self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<Loan>> {
        let query = format!(
            "SELECT {} FROM loans \
             WHERE status = 'open' AND due_date BETWEEN $1 AND $2 \
             ORDER BY due_date, id",
            LOAN_COLUMNS
        );
        let loans = sqlx::query_as::<_, Loan>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(loans)
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> AppResult<Loan> {
        let query = format!(
            r#"
            INSERT INTO loans (copy_id, item_id, member_id, staff_id, loan_type,
                               start_date, due_date, status, is_late, nb_extensions)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'open', FALSE, 0)
            RETURNING {}
            "#,
            LOAN_COLUMNS
        );
        let created = sqlx::query_as::<_, Loan>(&query)
            .bind(loan.copy_id)
            .bind(loan.item_id)
            .bind(loan.member_id)
            .bind(loan.staff_id)
            .bind(loan.loan_type)
            .bind(loan.start_date)
            .bind(loan.due_date)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(created)
    }

    async fn update_loan(&mut self, loan: &Loan) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE loans
            SET due_date = $2, return_date = $3, status = $4, is_late = $5, nb_extensions = $6
            WHERE id = $1
            "#,
        )
        .bind(loan.id)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.status)
        .bind(loan.is_late)
        .bind(loan.nb_extensions)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_extension(&mut self, extension: &NewLoanExtension) -> AppResult<LoanExtension> {
        let created = sqlx::query_as::<_, LoanExtension>(
            r#"
            INSERT INTO loan_extensions (loan_id, member_id, requested_on, new_due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, loan_id, member_id, requested_on, new_due_date, status
            "#,
        )
        .bind(extension.loan_id)
        .bind(extension.member_id)
        .bind(extension.requested_on)
        .bind(extension.new_due_date)
        .bind(extension.status)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(created)
    }

    async fn count_extensions(&mut self, member_id: i32, from: NaiveDate, to: NaiveDate) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM loan_extensions
            WHERE member_id = $1 AND requested_on BETWEEN $2 AND $3
            "#,
        )
        .bind(member_id)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }
}
