//! Member, subscription and copy lookups

use async_trait::async_trait;

use super::PgTx;
use crate::{
    error::AppResult,
    models::member::{ItemCopy, Member, Subscription, WITHDRAWN_CONDITION},
};

#[async_trait]
pub trait MemberStore: Send {
    /// Fetch a member and hold its row until the transaction ends, so that
    /// quota checks for the same member run one at a time
    async fn lock_member(&mut self, member_id: i32) -> AppResult<Option<Member>>;

    /// Most recent subscription (latest start date) of a member
    async fn latest_subscription(&mut self, member_id: i32) -> AppResult<Option<Subscription>>;

    /// Fetch and lock a copy
    async fn get_copy(&mut self, copy_id: i32) -> AppResult<Option<ItemCopy>>;

    /// Circulating copies of an item without an open loan, lowest id first
    async fn available_copies(&mut self, item_id: i32) -> AppResult<Vec<ItemCopy>>;
}

#[async_trait]
impl MemberStore for PgTx {
    async fn lock_member(&mut self, member_id: i32) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>("SELECT id, tier FROM members WHERE id = $1 FOR UPDATE")
            .bind(member_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(member)
    }

    async fn latest_subscription(&mut self, member_id: i32) -> AppResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT member_id, start_date, end_date
            FROM subscriptions
            WHERE member_id = $1
            ORDER BY start_date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(member_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(subscription)
    }

    async fn get_copy(&mut self, copy_id: i32) -> AppResult<Option<ItemCopy>> {
        let copy = sqlx::query_as::<_, ItemCopy>(
            "SELECT id, item_id, condition FROM copies WHERE id = $1 FOR UPDATE",
        )
        .bind(copy_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(copy)
    }

    async fn available_copies(&mut self, item_id: i32) -> AppResult<Vec<ItemCopy>> {
        let copies = sqlx::query_as::<_, ItemCopy>(
            r#"
            SELECT c.id, c.item_id, c.condition
            FROM copies c
            WHERE c.item_id = $1
              AND c.condition < $2
              AND NOT EXISTS (
                  SELECT 1 FROM loans l
                  WHERE l.copy_id = c.id AND l.status = 'open'
              )
            ORDER BY c.id
            FOR UPDATE OF c
            "#,
        )
        .bind(item_id)
        .bind(WITHDRAWN_CONDITION)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(copies)
    }
}
