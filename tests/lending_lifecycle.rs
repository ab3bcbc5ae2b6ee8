//! Lifecycle tests over the in-process store

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use lending_server::{
    error::{AppError, IneligibleReason, PolicyViolation, TransitionError},
    models::{
        CreateLoan, LendingSettings, LoanType, MembershipTier, Notification, NotificationKind,
        PenaltyStatus, ReservationStatus,
    },
    repository::{MemoryStore, Repository},
    services::{notifications::ChannelSink, Services},
};

const STAFF: i32 = 100;
const ITEM: i32 = 3;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Harness {
    store: MemoryStore,
    services: Services,
    notifications: UnboundedReceiver<Notification>,
    settings: LendingSettings,
}

impl Harness {
    /// Members 1..=3 (student, professor, anonymous) subscribed for 2024,
    /// copies 10, 11 of item 3
    async fn new() -> Self {
        let store = MemoryStore::new();
        store.add_member(1, MembershipTier::Student).await;
        store.add_member(2, MembershipTier::Professor).await;
        store.add_member(3, MembershipTier::Anonymous).await;
        for member in 1..=3 {
            store.add_subscription(member, date(2024, 1, 1), date(2024, 12, 31)).await;
        }
        store.add_copy(10, ITEM, 0).await;
        store.add_copy(11, ITEM, 2).await;

        let (sink, notifications) = ChannelSink::new();
        let settings = LendingSettings {
            daily_penalty_rate: dec!(1.50),
            penalty_cap: dec!(20.00),
            grace_period_days: 2,
            ..LendingSettings::default()
        };
        let services = Services::new(Repository::memory(store.clone()), settings.clone(), Arc::new(sink));

        Self {
            store,
            services,
            notifications,
            settings,
        }
    }

    fn drain(&mut self) -> Vec<Notification> {
        let mut sent = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            sent.push(notification);
        }
        sent
    }

    async fn borrow(&self, copy_id: i32, member_id: i32, on: NaiveDate) -> Result<i32, AppError> {
        let loan = self
            .services
            .loans
            .create_loan(
                &self.settings,
                CreateLoan {
                    copy_id,
                    member_id,
                    staff_id: STAFF,
                    loan_type: LoanType::Home,
                    duration_days: Some(7),
                },
                on,
            )
            .await?;
        Ok(loan.id)
    }
}

#[tokio::test]
async fn late_return_creates_exact_penalty() {
    let mut h = Harness::new().await;
    let loan_id = h.borrow(10, 1, date(2024, 1, 3)).await.unwrap();

    let outcome = h
        .services
        .loans
        .return_loan(&h.settings, loan_id, date(2024, 1, 15))
        .await
        .unwrap();

    let penalty = outcome.penalty.expect("penalty expected");
    assert_eq!(penalty.amount, dec!(4.50));
    assert_eq!(penalty.status, PenaltyStatus::Active);
    assert_eq!(penalty.start_date, date(2024, 1, 15));
    assert_eq!(penalty.end_date, date(2024, 1, 18));
    assert!(outcome.loan.is_late);

    let sent = h.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Penalty);
    assert_eq!(h.services.penalties.active_total(Some(1)).await.unwrap(), dec!(4.50));
}

#[tokio::test]
async fn returned_loan_is_immutable() {
    let h = Harness::new().await;
    let loan_id = h.borrow(10, 1, date(2024, 1, 3)).await.unwrap();

    h.services.loans.return_loan(&h.settings, loan_id, date(2024, 1, 5)).await.unwrap();
    let before = h.services.loans.get_loan(loan_id).await.unwrap();

    let again = h.services.loans.return_loan(&h.settings, loan_id, date(2024, 1, 20)).await;
    assert!(matches!(
        again,
        Err(AppError::InvalidTransition(TransitionError::AlreadyReturned(_)))
    ));
    let extend = h.services.loans.extend_loan(&h.settings, loan_id, 3, date(2024, 1, 6)).await;
    assert!(matches!(extend, Err(AppError::InvalidTransition(_))));

    assert_eq!(h.services.loans.get_loan(loan_id).await.unwrap(), before);
    assert!(h.services.penalties.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn return_before_start_is_rejected() {
    let h = Harness::new().await;
    let loan_id = h.borrow(10, 1, date(2024, 1, 3)).await.unwrap();

    let result = h.services.loans.return_loan(&h.settings, loan_id, date(2024, 1, 2)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(h.services.loans.get_loan(loan_id).await.unwrap().is_open());
}

#[tokio::test]
async fn quota_is_never_exceeded() {
    let h = Harness::new().await;
    // anonymous quota is 1
    h.borrow(10, 3, date(2024, 2, 1)).await.unwrap();

    let second = h.borrow(11, 3, date(2024, 2, 1)).await;
    assert!(matches!(
        second,
        Err(AppError::Ineligible(IneligibleReason::QuotaExceeded { open: 1, quota: 1 }))
    ));
    assert_eq!(h.services.loans.member_loans(3, true).await.unwrap().len(), 1);
    assert!(h.services.loans.open_loans().await.unwrap().iter().all(|l| l.copy_id == 10));
}

#[tokio::test]
async fn active_penalty_blocks_reservation() {
    let mut h = Harness::new().await;
    let loan_id = h.borrow(10, 1, date(2024, 1, 3)).await.unwrap();
    h.services.loans.return_loan(&h.settings, loan_id, date(2024, 1, 15)).await.unwrap();
    h.drain();

    let result = h
        .services
        .reservations
        .create(&h.settings, ITEM, 1, date(2024, 1, 16))
        .await;
    assert!(matches!(
        result,
        Err(AppError::Ineligible(IneligibleReason::ActivePenalty(_)))
    ));
    assert!(h.services.reservations.member_reservations(1).await.unwrap().is_empty());

    // window end is exclusive
    let allowed = h
        .services
        .reservations
        .create(&h.settings, ITEM, 1, date(2024, 1, 18))
        .await;
    assert!(allowed.is_ok());
}

#[tokio::test]
async fn paying_a_penalty_lifts_the_block() {
    let h = Harness::new().await;
    let loan_id = h.borrow(10, 1, date(2024, 1, 3)).await.unwrap();
    let outcome = h
        .services
        .loans
        .return_loan(&h.settings, loan_id, date(2024, 1, 15))
        .await
        .unwrap();
    let penalty_id = outcome.penalty.unwrap().id;

    h.services.penalties.mark_paid(penalty_id).await.unwrap();
    assert!(matches!(
        h.services.penalties.mark_paid(penalty_id).await,
        Err(AppError::InvalidTransition(TransitionError::AlreadyPaid(_)))
    ));
    assert!(matches!(
        h.services.penalties.cancel(penalty_id).await,
        Err(AppError::InvalidTransition(TransitionError::AlreadyPaid(_)))
    ));

    let totals = h.services.penalties.totals().await.unwrap();
    assert_eq!(totals.active, dec!(0));
    assert_eq!(totals.paid, dec!(4.50));
    assert!(h.borrow(11, 1, date(2024, 1, 16)).await.is_ok());
}

#[tokio::test]
async fn cancelled_penalty_cannot_be_modified() {
    let h = Harness::new().await;
    let loan_id = h.borrow(10, 1, date(2024, 1, 3)).await.unwrap();
    let outcome = h
        .services
        .loans
        .return_loan(&h.settings, loan_id, date(2024, 1, 15))
        .await
        .unwrap();
    let penalty_id = outcome.penalty.unwrap().id;

    h.services.penalties.cancel(penalty_id).await.unwrap();
    assert!(matches!(
        h.services.penalties.mark_paid(penalty_id).await,
        Err(AppError::InvalidTransition(TransitionError::CannotModifyCancelled(_)))
    ));
    assert_eq!(h.services.penalties.paid_total().await.unwrap(), dec!(0));
}

#[tokio::test]
async fn return_fulfils_the_pending_reservation() {
    let mut h = Harness::new().await;
    let loan_id = h.borrow(11, 1, date(2024, 1, 3)).await.unwrap();
    let reservation = h
        .services
        .reservations
        .create(&h.settings, ITEM, 2, date(2024, 1, 4))
        .await
        .unwrap();
    assert_eq!(reservation.copy_id, 10);
    h.drain();

    let outcome = h
        .services
        .loans
        .return_loan(&h.settings, loan_id, date(2024, 1, 6))
        .await
        .unwrap();

    let fulfilled = outcome.fulfilled.expect("reservation should be fulfilled");
    assert_eq!(fulfilled.id, reservation.id);
    assert_eq!(fulfilled.status, ReservationStatus::Fulfilled);
    assert!(outcome.penalty.is_none());
    assert!(outcome.released.is_none());

    let sent = h.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::HoldReady);
    assert_eq!(sent[0].member_id, 2);
    assert!(h.services.reservations.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn only_the_oldest_pending_reservation_is_fulfilled() {
    let mut h = Harness::new().await;
    let older = h
        .services
        .reservations
        .create(&h.settings, ITEM, 2, date(2024, 3, 1))
        .await
        .unwrap();
    let newer = h
        .services
        .reservations
        .create(&h.settings, ITEM, 3, date(2024, 3, 2))
        .await
        .unwrap();
    let loan_id = h.borrow(11, 1, date(2024, 3, 2)).await.unwrap();

    let outcome = h
        .services
        .loans
        .return_loan(&h.settings, loan_id, date(2024, 3, 3))
        .await
        .unwrap();
    assert_eq!(outcome.fulfilled.map(|r| r.id), Some(older.id));

    let untouched = h.services.reservations.get_reservation(newer.id).await.unwrap();
    assert_eq!(untouched.status, ReservationStatus::Pending);
    assert_eq!(h.drain().len(), 1);
}

#[tokio::test]
async fn borrower_hold_is_released_on_return() {
    let h = Harness::new().await;
    let reservation = h
        .services
        .reservations
        .create(&h.settings, ITEM, 1, date(2024, 4, 1))
        .await
        .unwrap();
    h.services.reservations.fulfill(reservation.id).await.unwrap();
    let loan_id = h.borrow(reservation.copy_id, 1, date(2024, 4, 2)).await.unwrap();

    let outcome = h
        .services
        .loans
        .return_loan(&h.settings, loan_id, date(2024, 4, 5))
        .await
        .unwrap();

    let released = outcome.released.expect("own hold should be released");
    assert_eq!(released.id, reservation.id);
    assert_eq!(released.status, ReservationStatus::Expired);
    assert!(outcome.fulfilled.is_none());
}

#[tokio::test]
async fn one_live_reservation_per_copy_and_member() {
    let h = Harness::new().await;
    let first = h.services.reservations.create(&h.settings, ITEM, 2, date(2024, 5, 1)).await.unwrap();
    let second = h.services.reservations.create(&h.settings, ITEM, 2, date(2024, 5, 1)).await.unwrap();
    assert_ne!(first.copy_id, second.copy_id);

    let third = h.services.reservations.create(&h.settings, ITEM, 2, date(2024, 5, 1)).await;
    assert!(matches!(third, Err(AppError::Conflict(_))));

    // cancelling frees the copy for a new hold
    h.services.reservations.cancel(first.id).await.unwrap();
    let again = h.services.reservations.create(&h.settings, ITEM, 2, date(2024, 5, 2)).await.unwrap();
    assert_eq!(again.copy_id, first.copy_id);
}

#[tokio::test]
async fn no_available_copy_when_all_are_out() {
    let h = Harness::new().await;
    h.borrow(10, 1, date(2024, 5, 1)).await.unwrap();
    h.borrow(11, 2, date(2024, 5, 1)).await.unwrap();

    let result = h.services.reservations.create(&h.settings, ITEM, 3, date(2024, 5, 1)).await;
    assert!(matches!(result, Err(AppError::Unavailable(_))));
}

#[tokio::test]
async fn sweep_expired_is_idempotent() {
    let h = Harness::new().await;
    let pending = h.services.reservations.create(&h.settings, ITEM, 2, date(2024, 6, 1)).await.unwrap();
    let fulfilled = h.services.reservations.create(&h.settings, ITEM, 2, date(2024, 6, 1)).await.unwrap();
    h.services.reservations.fulfill(fulfilled.id).await.unwrap();

    // hold window is 3 days: still claimable on the expiration date
    assert!(h.services.reservations.sweep_expired(date(2024, 6, 4)).await.unwrap().is_empty());

    let first = h.services.reservations.sweep_expired(date(2024, 6, 5)).await.unwrap();
    let second = h.services.reservations.sweep_expired(date(2024, 6, 5)).await.unwrap();
    assert_eq!(first.len(), 2);
    assert!(second.is_empty());

    for id in [pending.id, fulfilled.id] {
        let reservation = h.services.reservations.get_reservation(id).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Expired);
    }
}

#[tokio::test]
async fn extension_quota_follows_subscription_window() {
    let h = Harness::new().await;
    // anonymous: quota 1 for loans and extensions
    h.store.add_copy(12, 4, 0).await;
    let loan_id = h.borrow(12, 3, date(2024, 2, 1)).await.unwrap();

    // with its single loan open the anonymous member is at quota
    let denied = h.services.loans.extend_loan(&h.settings, loan_id, 2, date(2024, 2, 2)).await;
    assert!(matches!(
        denied,
        Err(AppError::Ineligible(IneligibleReason::QuotaExceeded { .. }))
    ));

    // a student may extend up to three times a year
    let loan_id = h.borrow(10, 1, date(2024, 2, 1)).await.unwrap();
    for day in 2..=4 {
        h.services
            .loans
            .extend_loan(&h.settings, loan_id, 1, date(2024, 2, day))
            .await
            .unwrap();
    }
    let fourth = h.services.loans.extend_loan(&h.settings, loan_id, 1, date(2024, 2, 5)).await;
    assert!(matches!(
        fourth,
        Err(AppError::PolicyViolation(PolicyViolation::ExtensionQuotaExceeded { used: 3, quota: 3 }))
    ));

    let loan = h.services.loans.get_loan(loan_id).await.unwrap();
    assert_eq!(loan.nb_extensions, 3);
    assert_eq!(loan.due_date, date(2024, 2, 11));
}

#[tokio::test]
async fn overdue_and_reminders_notify_members() {
    let mut h = Harness::new().await;
    h.borrow(10, 1, date(2024, 7, 1)).await.unwrap();
    h.borrow(11, 2, date(2024, 7, 3)).await.unwrap();

    // due 2024-07-08 and 2024-07-10
    let reminded = h.services.loans.send_reminders(date(2024, 7, 7), 3).await.unwrap();
    assert_eq!(reminded, 2);

    let flagged = h.services.loans.mark_overdue(date(2024, 7, 9)).await.unwrap();
    assert_eq!(flagged.len(), 1);
    assert!(h.services.loans.mark_overdue(date(2024, 7, 9)).await.unwrap().is_empty());

    let kinds: Vec<NotificationKind> = h.drain().into_iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![NotificationKind::Reminder, NotificationKind::Reminder, NotificationKind::Late]
    );
    assert_eq!(h.services.loans.late_loans().await.unwrap().len(), 1);
}
