//! Eligibility gate shared by loan creation, reservation creation and
//! loan extension

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult, BlockingPenalty, IneligibleReason},
    models::{
        member::{Member, Subscription},
        penalty::Penalty,
        settings::LendingSettings,
    },
    repository::{LendingTx, Repository},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Allow,
    Deny(IneligibleReason),
}

impl Eligibility {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Eligibility::Allow)
    }
}

/// Apply the rules in order: blocking penalties, then subscription, then quota
pub fn evaluate(
    blocking: &[Penalty],
    subscription: Option<&Subscription>,
    open_loans: i64,
    quota: i64,
    as_of: NaiveDate,
) -> Eligibility {
    let blocking: Vec<BlockingPenalty> = blocking
        .iter()
        .filter(|p| p.blocks_on(as_of))
        .map(|p| BlockingPenalty {
            id: p.id,
            amount: p.amount,
            start_date: p.start_date,
            end_date: p.end_date,
        })
        .collect();
    if !blocking.is_empty() {
        return Eligibility::Deny(IneligibleReason::ActivePenalty(blocking));
    }

    if !subscription.is_some_and(|s| s.covers(as_of)) {
        return Eligibility::Deny(IneligibleReason::InactiveMembership);
    }

    if open_loans >= quota {
        return Eligibility::Deny(IneligibleReason::QuotaExceeded { open: open_loans, quota });
    }

    Eligibility::Allow
}

/// Lock the member row and evaluate the gate inside `tx`
pub(crate) async fn check(
    tx: &mut dyn LendingTx,
    settings: &LendingSettings,
    member_id: i32,
    as_of: NaiveDate,
) -> AppResult<(Member, Eligibility)> {
    let member = tx
        .lock_member(member_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", member_id)))?;

    let blocking = tx.blocking_penalties(member_id, as_of).await?;
    let subscription = tx.latest_subscription(member_id).await?;
    let open_loans = tx.count_open_loans(member_id).await?;
    let quota = settings.quotas.for_tier(member.tier);

    let eligibility = evaluate(&blocking, subscription.as_ref(), open_loans, quota, as_of);
    Ok((member, eligibility))
}

/// Like [`check`], turning a denial into [`AppError::Ineligible`]
pub(crate) async fn require(
    tx: &mut dyn LendingTx,
    settings: &LendingSettings,
    member_id: i32,
    as_of: NaiveDate,
) -> AppResult<Member> {
    match check(tx, settings, member_id, as_of).await? {
        (member, Eligibility::Allow) => Ok(member),
        (_, Eligibility::Deny(reason)) => {
            tracing::info!("Member {} is not eligible: {}", member_id, reason);
            Err(reason.into())
        }
    }
}

/// Eligibility verdict as exposed over the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EligibilityReport {
    pub member_id: i32,
    pub as_of: NaiveDate,
    pub eligible: bool,
    /// Human readable denial reason
    pub reason: Option<String>,
    /// Penalties blocking the member, if that is the reason
    pub penalties: Vec<BlockingPenalty>,
}

impl EligibilityReport {
    fn new(member_id: i32, as_of: NaiveDate, eligibility: Eligibility) -> Self {
        match eligibility {
            Eligibility::Allow => Self {
                member_id,
                as_of,
                eligible: true,
                reason: None,
                penalties: Vec::new(),
            },
            Eligibility::Deny(reason) => {
                let penalties = match &reason {
                    IneligibleReason::ActivePenalty(p) => p.clone(),
                    _ => Vec::new(),
                };
                Self {
                    member_id,
                    as_of,
                    eligible: false,
                    reason: Some(reason.to_string()),
                    penalties,
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct EligibilityService {
    repository: Repository,
}

impl EligibilityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn check(
        &self,
        settings: &LendingSettings,
        member_id: i32,
        as_of: NaiveDate,
    ) -> AppResult<Eligibility> {
        let mut tx = self.repository.begin().await?;
        let (_, eligibility) = check(tx.as_mut(), settings, member_id, as_of).await?;
        Ok(eligibility)
    }

    pub async fn report(
        &self,
        settings: &LendingSettings,
        member_id: i32,
        as_of: NaiveDate,
    ) -> AppResult<EligibilityReport> {
        let eligibility = self.check(settings, member_id, as_of).await?;
        Ok(EligibilityReport::new(member_id, as_of, eligibility))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::penalty::PenaltyStatus;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn subscription() -> Subscription {
        Subscription {
            member_id: 1,
            start_date: date(2024, 1, 1),
            end_date: date(2024, 12, 31),
        }
    }

    fn penalty(status: PenaltyStatus) -> Penalty {
        Penalty {
            id: 9,
            member_id: 1,
            loan_id: Some(3),
            start_date: date(2024, 3, 1),
            end_date: date(2024, 3, 4),
            amount: dec!(1.50),
            reason: "Late return of loan #3: 3 day(s) late".into(),
            status,
        }
    }

    #[rstest]
    #[case::first_day(date(2024, 3, 1), false)]
    #[case::last_day(date(2024, 3, 3), false)]
    #[case::end_is_exclusive(date(2024, 3, 4), true)]
    #[case::before_window(date(2024, 2, 29), true)]
    fn test_penalty_window(#[case] as_of: NaiveDate, #[case] allowed: bool) {
        let penalties = [penalty(PenaltyStatus::Active)];
        let result = evaluate(&penalties, Some(&subscription()), 0, 3, as_of);
        assert_eq!(result.is_allowed(), allowed);
    }

    #[test]
    fn test_paid_penalty_does_not_block() {
        let penalties = [penalty(PenaltyStatus::Paid)];
        let result = evaluate(&penalties, Some(&subscription()), 0, 3, date(2024, 3, 2));
        assert_eq!(result, Eligibility::Allow);
    }

    #[test]
    fn test_penalty_is_checked_before_subscription() {
        let penalties = [penalty(PenaltyStatus::Active)];
        let result = evaluate(&penalties, None, 10, 3, date(2024, 3, 2));
        assert!(matches!(
            result,
            Eligibility::Deny(IneligibleReason::ActivePenalty(ref p)) if p.len() == 1 && p[0].amount == dec!(1.50)
        ));
    }

    #[rstest]
    #[case::missing(None, date(2024, 6, 1))]
    #[case::expired(Some(subscription()), date(2025, 1, 1))]
    #[case::not_started(Some(subscription()), date(2023, 12, 31))]
    fn test_inactive_membership(#[case] subscription: Option<Subscription>, #[case] as_of: NaiveDate) {
        let result = evaluate(&[], subscription.as_ref(), 0, 3, as_of);
        assert_eq!(result, Eligibility::Deny(IneligibleReason::InactiveMembership));
    }

    #[rstest]
    #[case(2, 3, true)]
    #[case(3, 3, false)]
    #[case(0, 0, false)]
    fn test_quota(#[case] open: i64, #[case] quota: i64, #[case] allowed: bool) {
        let result = evaluate(&[], Some(&subscription()), open, quota, date(2024, 6, 1));
        assert_eq!(result.is_allowed(), allowed);
        if !allowed {
            assert_eq!(result, Eligibility::Deny(IneligibleReason::QuotaExceeded { open, quota }));
        }
    }
}
