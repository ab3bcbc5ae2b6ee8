//! Penalty ledger

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult, TransitionError},
    models::{
        add_days,
        loan::Loan,
        penalty::{NewPenalty, Penalty, PenaltyStatus, PenaltyTotals},
        settings::LendingSettings,
    },
    repository::Repository,
};

/// Days a return falls past `due + grace`; zero while inside the grace period
pub fn days_late(due_date: NaiveDate, grace_period_days: i32, return_date: NaiveDate) -> AppResult<i64> {
    let limit = add_days(due_date, i64::from(grace_period_days))?;
    Ok((return_date - limit).num_days().max(0))
}

/// Penalty owed for returning `loan` on `return_date`, if any.
///
/// `amount = min(days_late * rate, cap)`; the member is blocked for as many
/// days as the return was late, starting on the return date.
pub fn compute_late_penalty(
    loan: &Loan,
    return_date: NaiveDate,
    settings: &LendingSettings,
) -> AppResult<Option<NewPenalty>> {
    let days = days_late(loan.due_date, settings.grace_period_days, return_date)?;
    if days == 0 {
        return Ok(None);
    }

    let amount = (Decimal::from(days) * settings.daily_penalty_rate).min(settings.penalty_cap);
    Ok(Some(NewPenalty {
        member_id: loan.member_id,
        loan_id: Some(loan.id),
        start_date: return_date,
        end_date: add_days(return_date, days)?,
        amount,
        reason: format!("Late return of loan #{}: {} day(s) late", loan.id, days),
    }))
}

#[derive(Clone)]
pub struct PenaltiesService {
    repository: Repository,
}

impl PenaltiesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_penalty(&self, penalty_id: i32) -> AppResult<Penalty> {
        let mut tx = self.repository.begin().await?;
        tx.get_penalty(penalty_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Penalty with id {} not found", penalty_id)))
    }

    /// Settle an active penalty
    pub async fn mark_paid(&self, penalty_id: i32) -> AppResult<Penalty> {
        self.close(penalty_id, PenaltyStatus::Paid).await
    }

    /// Waive an active penalty
    pub async fn cancel(&self, penalty_id: i32) -> AppResult<Penalty> {
        self.close(penalty_id, PenaltyStatus::Cancelled).await
    }

    async fn close(&self, penalty_id: i32, target: PenaltyStatus) -> AppResult<Penalty> {
        let mut tx = self.repository.begin().await?;
        let mut penalty = tx
            .get_penalty(penalty_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Penalty with id {} not found", penalty_id)))?;

        match penalty.status {
            PenaltyStatus::Active => {}
            PenaltyStatus::Paid => return Err(TransitionError::AlreadyPaid(penalty_id).into()),
            PenaltyStatus::Cancelled => {
                return Err(TransitionError::CannotModifyCancelled(penalty_id).into())
            }
        }

        tx.set_penalty_status(penalty_id, target).await?;
        tx.commit().await?;

        penalty.status = target;
        tracing::info!("Penalty {} of member {} is now {}", penalty_id, penalty.member_id, target);
        Ok(penalty)
    }

    /// Sum of active penalties, for one member or everybody
    pub async fn active_total(&self, member_id: Option<i32>) -> AppResult<Decimal> {
        let mut tx = self.repository.begin().await?;
        tx.penalty_total(PenaltyStatus::Active, member_id).await
    }

    pub async fn paid_total(&self) -> AppResult<Decimal> {
        let mut tx = self.repository.begin().await?;
        tx.penalty_total(PenaltyStatus::Paid, None).await
    }

    pub async fn totals(&self) -> AppResult<PenaltyTotals> {
        let mut tx = self.repository.begin().await?;
        let active = tx.penalty_total(PenaltyStatus::Active, None).await?;
        let paid = tx.penalty_total(PenaltyStatus::Paid, None).await?;
        Ok(PenaltyTotals { active, paid })
    }

    pub async fn list(&self, status: Option<PenaltyStatus>) -> AppResult<Vec<Penalty>> {
        let mut tx = self.repository.begin().await?;
        tx.list_penalties(status).await
    }

    /// Penalties currently blocking a member
    pub async fn active_for_member(&self, member_id: i32, as_of: NaiveDate) -> AppResult<Vec<Penalty>> {
        let mut tx = self.repository.begin().await?;
        tx.blocking_penalties(member_id, as_of).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{enums::LoanType, loan::LoanStatus};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loan(due_date: NaiveDate) -> Loan {
        Loan {
            id: 42,
            copy_id: 7,
            item_id: 3,
            member_id: 1,
            staff_id: 100,
            loan_type: LoanType::Home,
            start_date: date(2023, 12, 27),
            due_date,
            return_date: None,
            status: LoanStatus::Open,
            is_late: false,
            nb_extensions: 0,
        }
    }

    fn settings(rate: Decimal, cap: Decimal, grace: i32) -> LendingSettings {
        LendingSettings {
            daily_penalty_rate: rate,
            penalty_cap: cap,
            grace_period_days: grace,
            ..LendingSettings::default()
        }
    }

    #[test]
    fn test_three_days_after_grace() {
        let settings = settings(dec!(1.50), dec!(20.00), 2);
        let penalty = compute_late_penalty(&loan(date(2024, 1, 10)), date(2024, 1, 15), &settings).unwrap().unwrap();

        assert_eq!(penalty.amount, dec!(4.50));
        assert_eq!(penalty.start_date, date(2024, 1, 15));
        assert_eq!(penalty.end_date, date(2024, 1, 18));
        assert_eq!(penalty.loan_id, Some(42));
        assert_eq!(penalty.reason, "Late return of loan #42: 3 day(s) late");
    }

    #[rstest]
    #[case::before_due(date(2024, 1, 8))]
    #[case::on_due(date(2024, 1, 10))]
    #[case::last_grace_day(date(2024, 1, 12))]
    fn test_no_penalty_within_grace(#[case] returned: NaiveDate) {
        let settings = settings(dec!(1.50), dec!(20.00), 2);
        assert!(compute_late_penalty(&loan(date(2024, 1, 10)), returned, &settings).unwrap().is_none());
    }

    #[rstest]
    #[case::first_late_day(date(2024, 1, 13), dec!(0.50))]
    #[case::reaches_cap(date(2024, 2, 21), dec!(20.00))]
    #[case::capped(date(2024, 3, 30), dec!(20.00))]
    fn test_amount_is_capped(#[case] returned: NaiveDate, #[case] expected: Decimal) {
        let settings = settings(dec!(0.50), dec!(20.00), 2);
        let penalty = compute_late_penalty(&loan(date(2024, 1, 10)), returned, &settings).unwrap().unwrap();
        assert_eq!(penalty.amount, expected);
    }

    #[test]
    fn test_zero_grace() {
        assert_eq!(days_late(date(2024, 1, 10), 0, date(2024, 1, 11)).unwrap(), 1);
        assert_eq!(days_late(date(2024, 1, 10), 0, date(2024, 1, 10)).unwrap(), 0);
    }

    #[test]
    fn test_grace_past_the_calendar_is_rejected() {
        let settings = settings(dec!(0.50), dec!(20.00), i32::MAX);
        let result = compute_late_penalty(&loan(date(2024, 1, 10)), date(2024, 1, 15), &settings);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
