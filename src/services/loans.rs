//! Loan management service

use chrono::NaiveDate;
use std::sync::Arc;

use super::{eligibility, notifications::NotificationSink, penalties, reservations};
use crate::{
    error::{AppError, AppResult, IneligibleReason, PolicyViolation, TransitionError, Unavailable},
    models::{
        add_days,
        loan::{CreateLoan, ExtensionStatus, Loan, LoanStatus, NewLoan, NewLoanExtension, ReturnOutcome},
        notification::Notification,
        settings::LendingSettings,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    notifier: Arc<dyn NotificationSink>,
}

impl LoansService {
    pub fn new(repository: Repository, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { repository, notifier }
    }

    /// Create a new loan (borrow a copy)
    pub async fn create_loan(
        &self,
        settings: &LendingSettings,
        request: CreateLoan,
        today: NaiveDate,
    ) -> AppResult<Loan> {
        let duration = request.duration_days.unwrap_or(settings.default_loan_days);
        if duration < 0 {
            return Err(AppError::Validation(format!(
                "Loan duration must not be negative (got {})",
                duration
            )));
        }

        let due_date = add_days(today, i64::from(duration))?;

        let mut tx = self.repository.begin().await?;
        eligibility::require(tx.as_mut(), settings, request.member_id, today).await?;

        let copy = tx
            .get_copy(request.copy_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", request.copy_id)))?;
        if !copy.is_circulating() || tx.open_loan_for_copy(copy.id).await?.is_some() {
            return Err(Unavailable::CopyUnavailable(copy.id).into());
        }

        let loan = tx
            .insert_loan(&NewLoan {
                copy_id: copy.id,
                item_id: copy.item_id,
                member_id: request.member_id,
                staff_id: request.staff_id,
                loan_type: request.loan_type,
                start_date: today,
                due_date,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Loan {} created: copy {} to member {}, due {}",
            loan.id,
            loan.copy_id,
            loan.member_id,
            loan.due_date
        );
        Ok(loan)
    }

    /// Return a borrowed copy.
    ///
    /// Closes the borrower's own hold on the copy, charges a penalty for a
    /// return past the grace period and hands the copy to the oldest pending
    /// reservation on the item. Notifications go out once everything is
    /// committed: penalty first, then hold-ready.
    pub async fn return_loan(
        &self,
        settings: &LendingSettings,
        loan_id: i32,
        return_date: NaiveDate,
    ) -> AppResult<ReturnOutcome> {
        let mut tx = self.repository.begin().await?;
        let mut loan = tx
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if !loan.is_open() {
            return Err(TransitionError::AlreadyReturned(loan_id).into());
        }
        if return_date < loan.start_date {
            return Err(AppError::Validation(format!(
                "Return date {} is before the loan start {}",
                return_date, loan.start_date
            )));
        }

        loan.return_date = Some(return_date);
        loan.status = LoanStatus::Returned;
        loan.is_late = return_date > loan.grace_limit(settings.grace_period_days)?;
        tx.update_loan(&loan).await?;

        let released = reservations::release_for_return(tx.as_mut(), loan.copy_id, loan.member_id).await?;

        let penalty = match penalties::compute_late_penalty(&loan, return_date, settings)? {
            Some(new_penalty) => Some(tx.insert_penalty(&new_penalty).await?),
            None => None,
        };

        let fulfilled = reservations::fulfil_next(tx.as_mut(), loan.item_id).await?;
        tx.commit().await?;

        tracing::info!("Loan {} returned on {}", loan.id, return_date);
        if let Some(penalty) = &penalty {
            tracing::info!(
                "Penalty {} of {} issued to member {} for loan {}",
                penalty.id,
                penalty.amount,
                penalty.member_id,
                loan.id
            );
            self.notifier.send(Notification::penalty(penalty));
        }
        if let Some(reservation) = &fulfilled {
            tracing::info!(
                "Reservation {} fulfilled for member {}",
                reservation.id,
                reservation.member_id
            );
            self.notifier.send(Notification::hold_ready(reservation));
        }

        Ok(ReturnOutcome {
            loan,
            penalty,
            released,
            fulfilled,
        })
    }

    /// Push the due date of an open loan back by `extra_days`
    pub async fn extend_loan(
        &self,
        settings: &LendingSettings,
        loan_id: i32,
        extra_days: i32,
        today: NaiveDate,
    ) -> AppResult<Loan> {
        let mut tx = self.repository.begin().await?;
        let mut loan = tx
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if !loan.is_open() {
            return Err(TransitionError::AlreadyReturned(loan_id).into());
        }
        if extra_days < 1 {
            return Err(AppError::Validation(format!(
                "Extension must be at least one day (got {})",
                extra_days
            )));
        }
        if extra_days > settings.max_extension_days {
            return Err(PolicyViolation::ExtensionTooLong {
                requested: extra_days,
                max: settings.max_extension_days,
            }
            .into());
        }

        let member = eligibility::require(tx.as_mut(), settings, loan.member_id, today).await?;
        let subscription = tx
            .latest_subscription(member.id)
            .await?
            .ok_or(AppError::Ineligible(IneligibleReason::InactiveMembership))?;

        let used = tx
            .count_extensions(member.id, subscription.start_date, subscription.end_date)
            .await?;
        let quota = settings.quotas.for_tier(member.tier);
        if used >= quota {
            return Err(PolicyViolation::ExtensionQuotaExceeded { used, quota }.into());
        }

        let new_due_date = add_days(loan.due_date, i64::from(extra_days))?;
        if new_due_date > subscription.end_date {
            return Err(PolicyViolation::SubscriptionExpiresBeforeNewDueDate {
                new_due_date,
                subscription_end: subscription.end_date,
            }
            .into());
        }

        loan.due_date = new_due_date;
        loan.nb_extensions += 1;
        tx.update_loan(&loan).await?;
        tx.insert_extension(&NewLoanExtension {
            loan_id: loan.id,
            member_id: member.id,
            requested_on: today,
            new_due_date,
            status: ExtensionStatus::Approved,
        })
        .await?;
        tx.commit().await?;

        tracing::info!("Loan {} extended to {}", loan.id, new_due_date);
        Ok(loan)
    }

    /// Flag open loans past their due date and send one late notice each.
    /// Already flagged loans are left alone.
    pub async fn mark_overdue(&self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        let mut tx = self.repository.begin().await?;
        let mut loans = tx.unflagged_overdue_loans(today).await?;
        for loan in &mut loans {
            loan.is_late = true;
            tx.update_loan(loan).await?;
        }
        tx.commit().await?;

        for loan in &loans {
            self.notifier.send(Notification::late(loan));
        }
        if !loans.is_empty() {
            tracing::info!("Flagged {} overdue loan(s)", loans.len());
        }
        Ok(loans)
    }

    /// Remind borrowers of loans due within `lead_days`
    pub async fn send_reminders(&self, today: NaiveDate, lead_days: i32) -> AppResult<usize> {
        let until = add_days(today, i64::from(lead_days))?;
        let mut tx = self.repository.begin().await?;
        let loans = tx.loans_due_between(today, until).await?;
        tx.commit().await?;

        for loan in &loans {
            self.notifier.send(Notification::reminder(loan));
        }
        tracing::info!("Sent {} loan reminder(s)", loans.len());
        Ok(loans.len())
    }

    pub async fn get_loan(&self, loan_id: i32) -> AppResult<Loan> {
        let mut tx = self.repository.begin().await?;
        tx.get_loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// Get loans for a member
    pub async fn member_loans(&self, member_id: i32, open_only: bool) -> AppResult<Vec<Loan>> {
        let mut tx = self.repository.begin().await?;
        tx.list_member_loans(member_id, open_only).await
    }

    pub async fn open_loans(&self) -> AppResult<Vec<Loan>> {
        let mut tx = self.repository.begin().await?;
        tx.list_open_loans().await
    }

    /// Open loans flagged late by the overdue sweep
    pub async fn late_loans(&self) -> AppResult<Vec<Loan>> {
        let mut tx = self.repository.begin().await?;
        let loans = tx.list_open_loans().await?;
        Ok(loans.into_iter().filter(|l| l.is_late).collect())
    }
}
