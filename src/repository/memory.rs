//! In-process lending store
//!
//! A transaction holds the store mutex from `begin` until it is committed or
//! dropped and works on a private copy of the state, so transactions are
//! serializable and an uncommitted one leaves no trace.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    LendingStore, LendingTx, LoanStore, MemberStore, NotificationStore, PenaltyStore,
    ReservationStore, SettingsStore,
};
use crate::{
    config::SeedConfig,
    error::AppResult,
    models::{
        enums::MembershipTier,
        loan::{Loan, LoanExtension, LoanStatus, NewLoan, NewLoanExtension},
        member::{ItemCopy, Member, Subscription},
        notification::Notification,
        penalty::{NewPenalty, Penalty, PenaltyStatus},
        reservation::{NewReservation, Reservation, ReservationStatus},
        settings::LendingSettings,
    },
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    members: BTreeMap<i32, Member>,
    /// Insertion order breaks ties between subscriptions starting the same day
    subscriptions: Vec<Subscription>,
    copies: BTreeMap<i32, ItemCopy>,
    loans: BTreeMap<i32, Loan>,
    extensions: Vec<LoanExtension>,
    reservations: BTreeMap<i32, Reservation>,
    penalties: BTreeMap<i32, Penalty>,
    settings: Vec<LendingSettings>,
    notifications: Vec<Notification>,
    last_id: i32,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member (profile data lives outside the lending core)
    pub async fn add_member(&self, id: i32, tier: MembershipTier) {
        self.state.lock().await.members.insert(id, Member { id, tier });
    }

    pub async fn add_subscription(&self, member_id: i32, start_date: NaiveDate, end_date: NaiveDate) {
        self.state.lock().await.subscriptions.push(Subscription {
            member_id,
            start_date,
            end_date,
        });
    }

    /// Register a copy of a catalog item
    pub async fn add_copy(&self, id: i32, item_id: i32, condition: i16) {
        self.state
            .lock()
            .await
            .copies
            .insert(id, ItemCopy { id, item_id, condition });
    }

    /// Notifications persisted by the dispatcher
    /// Load the members, subscriptions and copies listed in the configuration
    pub async fn seed(&self, seed: &SeedConfig) {
        for member in &seed.members {
            self.add_member(member.id, member.tier).await;
            if let (Some(start), Some(end)) = (member.subscription_start, member.subscription_end) {
                self.add_subscription(member.id, start, end).await;
            }
        }
        for copy in &seed.copies {
            self.add_copy(copy.id, copy.item_id, copy.condition).await;
        }
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.clone()
    }
}

#[async_trait]
impl LendingStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn LendingTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl LendingTx for MemoryTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[async_trait]
impl MemberStore for MemoryTx {
    async fn lock_member(&mut self, member_id: i32) -> AppResult<Option<Member>> {
        Ok(self.work.members.get(&member_id).cloned())
    }

    async fn latest_subscription(&mut self, member_id: i32) -> AppResult<Option<Subscription>> {
        Ok(self
            .work
            .subscriptions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.member_id == member_id)
            .max_by_key(|(position, s)| (s.start_date, *position))
            .map(|(_, s)| s.clone()))
    }

    async fn get_copy(&mut self, copy_id: i32) -> AppResult<Option<ItemCopy>> {
        Ok(self.work.copies.get(&copy_id).cloned())
    }

    async fn available_copies(&mut self, item_id: i32) -> AppResult<Vec<ItemCopy>> {
        let loans = &self.work.loans;
        Ok(self
            .work
            .copies
            .values()
            .filter(|c| c.item_id == item_id && c.is_circulating())
            .filter(|c| !loans.values().any(|l| l.copy_id == c.id && l.is_open()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LoanStore for MemoryTx {
    async fn get_loan(&mut self, loan_id: i32) -> AppResult<Option<Loan>> {
        Ok(self.work.loans.get(&loan_id).cloned())
    }

    async fn open_loan_for_copy(&mut self, copy_id: i32) -> AppResult<Option<Loan>> {
        Ok(self
            .work
            .loans
            .values()
            .find(|l| l.copy_id == copy_id && l.is_open())
            .cloned())
    }

    async fn count_open_loans(&mut self, member_id: i32) -> AppResult<i64> {
        let count = self
            .work
            .loans
            .values()
            .filter(|l| l.member_id == member_id && l.is_open())
            .count();
        Ok(count as i64)
    }

    async fn list_open_loans(&mut self) -> AppResult<Vec<Loan>> {
        let mut loans: Vec<Loan> = self.work.loans.values().filter(|l| l.is_open()).cloned().collect();
        loans.sort_by_key(|l| (l.due_date, l.id));
        Ok(loans)
    }

    async fn list_member_loans(&mut self, member_id: i32, open_only: bool) -> AppResult<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .work
            .loans
            .values()
            .filter(|l| l.member_id == member_id && (!open_only || l.is_open()))
            .cloned()
            .collect();
        loans.sort_by(|a, b| (b.start_date, b.id).cmp(&(a.start_date, a.id)));
        Ok(loans)
    }

    async fn unflagged_overdue_loans(&mut self, today: NaiveDate) -> AppResult<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .work
            .loans
            .values()
            .filter(|l| l.is_open() && !l.is_late && l.due_date < today)
            .cloned()
            .collect();
        loans.sort_by_key(|l| (l.due_date, l.id));
        Ok(loans)
    }

    async fn loans_due_between(&mut self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .work
            .loans
            .values()
            .filter(|l| l.is_open() && from <= l.due_date && l.due_date <= to)
            .cloned()
            .collect();
        loans.sort_by_key(|l| (l.due_date, l.id));
        Ok(loans)
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> AppResult<Loan> {
        let created = Loan {
            id: self.work.next_id(),
            copy_id: loan.copy_id,
            item_id: loan.item_id,
            member_id: loan.member_id,
            staff_id: loan.staff_id,
            loan_type: loan.loan_type,
            start_date: loan.start_date,
            due_date: loan.due_date,
            return_date: None,
            status: LoanStatus::Open,
            is_late: false,
            nb_extensions: 0,
        };
        self.work.loans.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_loan(&mut self, loan: &Loan) -> AppResult<()> {
        if let Some(stored) = self.work.loans.get_mut(&loan.id) {
            stored.due_date = loan.due_date;
            stored.return_date = loan.return_date;
            stored.status = loan.status;
            stored.is_late = loan.is_late;
            stored.nb_extensions = loan.nb_extensions;
        }
        Ok(())
    }

    async fn insert_extension(&mut self, extension: &NewLoanExtension) -> AppResult<LoanExtension> {
        let created = LoanExtension {
            id: self.work.next_id(),
            loan_id: extension.loan_id,
            member_id: extension.member_id,
            requested_on: extension.requested_on,
            new_due_date: extension.new_due_date,
            status: extension.status,
        };
        self.work.extensions.push(created.clone());
        Ok(created)
    }

    async fn count_extensions(&mut self, member_id: i32, from: NaiveDate, to: NaiveDate) -> AppResult<i64> {
        let count = self
            .work
            .extensions
            .iter()
            .filter(|e| e.member_id == member_id && from <= e.requested_on && e.requested_on <= to)
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl ReservationStore for MemoryTx {
    async fn get_reservation(&mut self, reservation_id: i32) -> AppResult<Option<Reservation>> {
        Ok(self.work.reservations.get(&reservation_id).cloned())
    }

    async fn active_reservation_for(&mut self, copy_id: i32, member_id: i32) -> AppResult<Option<Reservation>> {
        Ok(self
            .work
            .reservations
            .values()
            .find(|r| r.copy_id == copy_id && r.member_id == member_id && r.is_active())
            .cloned())
    }

    async fn oldest_pending_reservation(&mut self, item_id: i32) -> AppResult<Option<Reservation>> {
        Ok(self
            .work
            .reservations
            .values()
            .filter(|r| r.item_id == item_id && r.status == ReservationStatus::Pending)
            .min_by_key(|r| (r.created_on, r.id))
            .cloned())
    }

    async fn list_pending_reservations(&mut self) -> AppResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .work
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Pending)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| (r.created_on, r.id));
        Ok(reservations)
    }

    async fn list_member_reservations(&mut self, member_id: i32, active_only: bool) -> AppResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .work
            .reservations
            .values()
            .filter(|r| r.member_id == member_id && (!active_only || r.is_active()))
            .cloned()
            .collect();
        reservations.sort_by(|a, b| (b.created_on, b.id).cmp(&(a.created_on, a.id)));
        Ok(reservations)
    }

    async fn lapsed_reservations(&mut self, today: NaiveDate) -> AppResult<Vec<Reservation>> {
        Ok(self
            .work
            .reservations
            .values()
            .filter(|r| r.is_active() && r.expires_on < today)
            .cloned()
            .collect())
    }

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> AppResult<Reservation> {
        let created = Reservation {
            id: self.work.next_id(),
            copy_id: reservation.copy_id,
            item_id: reservation.item_id,
            member_id: reservation.member_id,
            created_on: reservation.created_on,
            expires_on: reservation.expires_on,
            status: ReservationStatus::Pending,
        };
        self.work.reservations.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_reservation_status(&mut self, reservation_id: i32, status: ReservationStatus) -> AppResult<()> {
        if let Some(stored) = self.work.reservations.get_mut(&reservation_id) {
            stored.status = status;
        }
        Ok(())
    }
}

#[async_trait]
impl PenaltyStore for MemoryTx {
    async fn get_penalty(&mut self, penalty_id: i32) -> AppResult<Option<Penalty>> {
        Ok(self.work.penalties.get(&penalty_id).cloned())
    }

    async fn blocking_penalties(&mut self, member_id: i32, date: NaiveDate) -> AppResult<Vec<Penalty>> {
        let mut penalties: Vec<Penalty> = self
            .work
            .penalties
            .values()
            .filter(|p| p.member_id == member_id && p.blocks_on(date))
            .cloned()
            .collect();
        penalties.sort_by_key(|p| (p.start_date, p.id));
        Ok(penalties)
    }

    async fn list_penalties(&mut self, status: Option<PenaltyStatus>) -> AppResult<Vec<Penalty>> {
        Ok(self
            .work
            .penalties
            .values()
            .rev()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect())
    }

    async fn insert_penalty(&mut self, penalty: &NewPenalty) -> AppResult<Penalty> {
        let created = Penalty {
            id: self.work.next_id(),
            member_id: penalty.member_id,
            loan_id: penalty.loan_id,
            start_date: penalty.start_date,
            end_date: penalty.end_date,
            amount: penalty.amount,
            reason: penalty.reason.clone(),
            status: PenaltyStatus::Active,
        };
        self.work.penalties.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_penalty_status(&mut self, penalty_id: i32, status: PenaltyStatus) -> AppResult<()> {
        if let Some(stored) = self.work.penalties.get_mut(&penalty_id) {
            stored.status = status;
        }
        Ok(())
    }

    async fn penalty_total(&mut self, status: PenaltyStatus, member_id: Option<i32>) -> AppResult<Decimal> {
        Ok(self
            .work
            .penalties
            .values()
            .filter(|p| p.status == status && member_id.map_or(true, |m| p.member_id == m))
            .map(|p| p.amount)
            .sum())
    }
}

#[async_trait]
impl SettingsStore for MemoryTx {
    async fn latest_settings(&mut self) -> AppResult<Option<LendingSettings>> {
        Ok(self.work.settings.last().cloned())
    }

    async fn insert_settings(&mut self, settings: &LendingSettings) -> AppResult<()> {
        self.work.settings.push(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryTx {
    async fn insert_notification(&mut self, notification: &Notification) -> AppResult<()> {
        self.work.notifications.push(notification.clone());
        Ok(())
    }
}
