//! Notification log

use async_trait::async_trait;

use super::PgTx;
use crate::{error::AppResult, models::notification::Notification};

#[async_trait]
pub trait NotificationStore: Send {
    async fn insert_notification(&mut self, notification: &Notification) -> AppResult<()>;
}

#[async_trait]
impl NotificationStore for PgTx {
    async fn insert_notification(&mut self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (member_id, kind, payload, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(notification.member_id)
        .bind(notification.kind)
        .bind(&notification.payload)
        .bind(notification.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}
