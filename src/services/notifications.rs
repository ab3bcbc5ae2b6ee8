//! Notification sink and dispatcher
//!
//! Lifecycle operations hand notifications to a [`NotificationSink`] after
//! their transaction committed. Sending never blocks and never fails the
//! caller; delivery problems are only logged.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::{
    error::AppResult,
    models::notification::Notification,
    repository::Repository,
};

#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn send(&self, notification: Notification);
}

/// Sink feeding an in-process queue drained by [`spawn_dispatcher`]
#[derive(Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn send(&self, notification: Notification) {
        tracing::debug!(
            "Queueing {} notification for member {}",
            notification.kind,
            notification.member_id
        );
        if let Err(e) = self.sender.send(notification) {
            tracing::warn!(
                "Dropping {} notification for member {}: dispatcher is gone",
                e.0.kind,
                e.0.member_id
            );
        }
    }
}

/// Persist queued notifications until every sender is dropped
pub fn spawn_dispatcher(
    repository: Repository,
    mut receiver: UnboundedReceiver<Notification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = receiver.recv().await {
            if let Err(e) = persist(&repository, &notification).await {
                tracing::warn!(
                    "Failed to store {} notification for member {}: {}",
                    notification.kind,
                    notification.member_id,
                    e
                );
            }
        }
        tracing::info!("Notification dispatcher stopped");
    })
}

async fn persist(repository: &Repository, notification: &Notification) -> AppResult<()> {
    let mut tx = repository.begin().await?;
    tx.insert_notification(notification).await?;
    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{enums::NotificationKind, reservation::{Reservation, ReservationStatus}};
    use crate::repository::MemoryStore;
    use chrono::NaiveDate;

    fn reservation() -> Reservation {
        Reservation {
            id: 5,
            copy_id: 7,
            item_id: 3,
            member_id: 1,
            created_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expires_on: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            status: ReservationStatus::Fulfilled,
        }
    }

    #[tokio::test]
    async fn test_dispatcher_persists_notifications() {
        let store = MemoryStore::new();
        let (sink, receiver) = ChannelSink::new();
        let handle = spawn_dispatcher(Repository::memory(store.clone()), receiver);

        sink.send(Notification::hold_ready(&reservation()));
        drop(sink);
        handle.await.unwrap();

        let stored = store.notifications().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind, NotificationKind::HoldReady);
        assert_eq!(stored[0].payload["reservation_id"], 5);
    }

    #[test]
    fn test_send_without_dispatcher_does_not_panic() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        sink.send(Notification::hold_ready(&reservation()));
    }
}
