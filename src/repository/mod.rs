//! Repository layer: transactional access to lending records
//!
//! Every lifecycle operation opens one [`LendingTx`], performs all of its
//! reads and writes through it and commits once. Dropping a transaction
//! without committing rolls it back.
//!
//! Two backends implement the traits: PostgreSQL ([`PgStore`]) and an
//! in-process store ([`memory::MemoryStore`]).

pub mod loans;
pub mod members;
pub mod memory;
pub mod notifications;
pub mod penalties;
pub mod reservations;
pub mod settings;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};
use std::sync::Arc;

use crate::error::AppResult;

pub use loans::LoanStore;
pub use members::MemberStore;
pub use memory::MemoryStore;
pub use notifications::NotificationStore;
pub use penalties::PenaltyStore;
pub use reservations::ReservationStore;
pub use settings::SettingsStore;

/// One unit of work over every lending table
#[async_trait]
pub trait LendingTx:
    MemberStore + LoanStore + ReservationStore + PenaltyStore + SettingsStore + NotificationStore
{
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Source of transactions
#[async_trait]
pub trait LendingStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn LendingTx>>;
}

/// Handle shared by all services
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn LendingStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn LendingStore>) -> Self {
        Self { store }
    }

    /// Repository backed by the given PostgreSQL pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self::new(Arc::new(PgStore::new(pool)))
    }

    /// Repository backed by an in-process store
    pub fn memory(store: MemoryStore) -> Self {
        Self::new(Arc::new(store))
    }

    pub async fn begin(&self) -> AppResult<Box<dyn LendingTx>> {
        self.store.begin().await
    }
}

/// PostgreSQL backend
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LendingStore for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn LendingTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// Open PostgreSQL transaction; row locks taken through it are held until
/// commit or drop
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LendingTx for PgTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
