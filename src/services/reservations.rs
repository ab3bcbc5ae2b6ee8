//! Reservation (hold) lifecycle

use chrono::NaiveDate;
use std::sync::Arc;

use super::{eligibility, notifications::NotificationSink};
use crate::{
    error::{AppError, AppResult, TransitionError, Unavailable},
    models::{
        add_days,
        notification::Notification,
        reservation::{NewReservation, Reservation, ReservationStatus},
        settings::LendingSettings,
    },
    repository::{LendingTx, Repository},
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    notifier: Arc<dyn NotificationSink>,
}

impl ReservationsService {
    pub fn new(repository: Repository, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { repository, notifier }
    }

    /// Place a hold on the first available copy of an item
    pub async fn create(
        &self,
        settings: &LendingSettings,
        item_id: i32,
        member_id: i32,
        today: NaiveDate,
    ) -> AppResult<Reservation> {
        let expires_on = add_days(today, i64::from(settings.hold_window_days))?;

        let mut tx = self.repository.begin().await?;
        eligibility::require(tx.as_mut(), settings, member_id, today).await?;

        let copies = tx.available_copies(item_id).await?;
        if copies.is_empty() {
            return Err(Unavailable::NoAvailableCopy(item_id).into());
        }

        let mut chosen = None;
        for copy in copies {
            if tx.active_reservation_for(copy.id, member_id).await?.is_none() {
                chosen = Some(copy);
                break;
            }
        }
        let copy = chosen.ok_or_else(|| {
            AppError::Conflict(format!(
                "Member {} already holds every available copy of item {}",
                member_id, item_id
            ))
        })?;

        let reservation = tx
            .insert_reservation(&NewReservation {
                copy_id: copy.id,
                item_id,
                member_id,
                created_on: today,
                expires_on,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Reservation {} created: member {} on copy {} (item {})",
            reservation.id,
            member_id,
            copy.id,
            item_id
        );
        Ok(reservation)
    }

    /// pending -> fulfilled, with a hold-ready notification
    pub async fn fulfill(&self, reservation_id: i32) -> AppResult<Reservation> {
        let reservation = self
            .transition(reservation_id, "fulfill", ReservationStatus::Fulfilled, |s| {
                s == ReservationStatus::Pending
            })
            .await?;
        self.notifier.send(Notification::hold_ready(&reservation));
        Ok(reservation)
    }

    /// pending -> cancelled
    pub async fn reject(&self, reservation_id: i32) -> AppResult<Reservation> {
        self.transition(reservation_id, "reject", ReservationStatus::Cancelled, |s| {
            s == ReservationStatus::Pending
        })
        .await
    }

    /// pending or fulfilled -> cancelled
    pub async fn cancel(&self, reservation_id: i32) -> AppResult<Reservation> {
        self.transition(reservation_id, "cancel", ReservationStatus::Cancelled, |s| {
            matches!(s, ReservationStatus::Pending | ReservationStatus::Fulfilled)
        })
        .await
    }

    async fn transition(
        &self,
        reservation_id: i32,
        action: &'static str,
        target: ReservationStatus,
        allowed_from: impl Fn(ReservationStatus) -> bool,
    ) -> AppResult<Reservation> {
        let mut tx = self.repository.begin().await?;
        let mut reservation = tx.get_reservation(reservation_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Reservation with id {} not found", reservation_id))
        })?;

        if !allowed_from(reservation.status) {
            return Err(TransitionError::Reservation {
                id: reservation_id,
                from: reservation.status,
                action,
            }
            .into());
        }

        tx.set_reservation_status(reservation_id, target).await?;
        tx.commit().await?;

        tracing::info!(
            "Reservation {} {}: {} -> {}",
            reservation_id,
            action,
            reservation.status,
            target
        );
        reservation.status = target;
        Ok(reservation)
    }

    /// Expire every reservation whose pickup window has passed; running it
    /// again on the same day changes nothing
    pub async fn sweep_expired(&self, today: NaiveDate) -> AppResult<Vec<Reservation>> {
        let mut tx = self.repository.begin().await?;
        let mut lapsed = tx.lapsed_reservations(today).await?;
        for reservation in &mut lapsed {
            tx.set_reservation_status(reservation.id, ReservationStatus::Expired).await?;
            reservation.status = ReservationStatus::Expired;
        }
        tx.commit().await?;

        if !lapsed.is_empty() {
            tracing::info!("Expired {} reservation(s)", lapsed.len());
        }
        Ok(lapsed)
    }

    pub async fn get_reservation(&self, reservation_id: i32) -> AppResult<Reservation> {
        let mut tx = self.repository.begin().await?;
        tx.get_reservation(reservation_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Reservation with id {} not found", reservation_id))
        })
    }

    pub async fn pending(&self) -> AppResult<Vec<Reservation>> {
        let mut tx = self.repository.begin().await?;
        tx.list_pending_reservations().await
    }

    /// Pending and fulfilled reservations of a member
    pub async fn member_reservations(&self, member_id: i32) -> AppResult<Vec<Reservation>> {
        let mut tx = self.repository.begin().await?;
        tx.list_member_reservations(member_id, true).await
    }
}

/// Close the borrower's own hold on a copy they just returned
pub(crate) async fn release_for_return(
    tx: &mut dyn LendingTx,
    copy_id: i32,
    member_id: i32,
) -> AppResult<Option<Reservation>> {
    let Some(mut reservation) = tx.active_reservation_for(copy_id, member_id).await? else {
        return Ok(None);
    };
    tx.set_reservation_status(reservation.id, ReservationStatus::Expired).await?;
    reservation.status = ReservationStatus::Expired;
    Ok(Some(reservation))
}

/// Fulfil the oldest pending hold on an item
pub(crate) async fn fulfil_next(tx: &mut dyn LendingTx, item_id: i32) -> AppResult<Option<Reservation>> {
    let Some(mut reservation) = tx.oldest_pending_reservation(item_id).await? else {
        return Ok(None);
    };
    tx.set_reservation_status(reservation.id, ReservationStatus::Fulfilled).await?;
    reservation.status = ReservationStatus::Fulfilled;
    Ok(Some(reservation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{MembershipTier, NotificationKind};
    use crate::repository::MemoryStore;
    use crate::services::notifications::MockNotificationSink;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_member(1, MembershipTier::Student).await;
        store.add_subscription(1, date(2024, 1, 1), date(2024, 12, 31)).await;
        store.add_copy(10, 3, 0).await;
        store.add_copy(11, 3, 1).await;
        store.add_copy(12, 3, 4).await;
        store
    }

    #[tokio::test]
    async fn test_create_picks_lowest_free_copy() {
        let store = seeded_store().await;
        let service = ReservationsService::new(Repository::memory(store), Arc::new(MockNotificationSink::new()));
        let settings = LendingSettings::default();

        let first = service.create(&settings, 3, 1, date(2024, 5, 1)).await.unwrap();
        let second = service.create(&settings, 3, 1, date(2024, 5, 1)).await.unwrap();
        let third = service.create(&settings, 3, 1, date(2024, 5, 1)).await;

        assert_eq!(first.copy_id, 10);
        assert_eq!(first.expires_on, date(2024, 5, 4));
        assert_eq!(first.status, ReservationStatus::Pending);
        assert_eq!(second.copy_id, 11);
        // copy 12 is withdrawn
        assert!(matches!(third, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_hold_window_past_the_calendar_is_rejected() {
        let store = seeded_store().await;
        let service = ReservationsService::new(Repository::memory(store), Arc::new(MockNotificationSink::new()));
        let settings = LendingSettings {
            hold_window_days: i32::MAX,
            ..LendingSettings::default()
        };

        let result = service.create(&settings, 3, 1, date(2024, 5, 1)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(service.member_reservations(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fulfill_notifies_once() {
        let store = seeded_store().await;
        let mut sink = MockNotificationSink::new();
        sink.expect_send()
            .withf(|n| n.kind == NotificationKind::HoldReady && n.member_id == 1)
            .times(1)
            .return_const(());
        let service = ReservationsService::new(Repository::memory(store), Arc::new(sink));
        let settings = LendingSettings::default();

        let reservation = service.create(&settings, 3, 1, date(2024, 5, 1)).await.unwrap();
        let fulfilled = service.fulfill(reservation.id).await.unwrap();
        assert_eq!(fulfilled.status, ReservationStatus::Fulfilled);

        let again = service.fulfill(reservation.id).await;
        assert!(matches!(
            again,
            Err(AppError::InvalidTransition(TransitionError::Reservation {
                from: ReservationStatus::Fulfilled,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_reject_requires_pending() {
        let store = seeded_store().await;
        let service = ReservationsService::new(Repository::memory(store), Arc::new(MockNotificationSink::new()));
        let settings = LendingSettings::default();

        let reservation = service.create(&settings, 3, 1, date(2024, 5, 1)).await.unwrap();
        service.cancel(reservation.id).await.unwrap();

        assert!(matches!(
            service.reject(reservation.id).await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            service.cancel(reservation.id).await,
            Err(AppError::InvalidTransition(_))
        ));
    }
}
