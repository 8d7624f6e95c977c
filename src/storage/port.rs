//! Storage port consumed by the ledger core.
//!
//! The core only ever talks to these traits, so it runs unchanged against the
//! SQLite [`Repository`](super::Repository) or the in-memory
//! [`MemoryStore`](super::MemoryStore).

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Money, OwnerId, Transaction, Wallet, WalletId};

/// Durable storage for wallets and their ledger entries.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Unit: UnitOfWork;

    /// Begin an atomic, isolated unit of work.
    async fn begin(&self) -> Result<Self::Unit>;

    /// Read a wallet scoped to its owner, without locking.
    async fn find_wallet(&self, owner_id: OwnerId, wallet_id: WalletId)
    -> Result<Option<Wallet>>;

    /// Authorization check: does `wallet_id` exist and belong to `owner_id`.
    async fn wallet_exists(&self, owner_id: OwnerId, wallet_id: WalletId) -> Result<bool>;

    /// Ledger entries touching a wallet, newest first. Includes transfers the
    /// wallet received (`related_wallet_id == wallet_id`).
    async fn list_transactions_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>>;

    /// Persist a newly provisioned wallet.
    async fn create_wallet(&self, wallet: &Wallet) -> Result<()>;

    /// All wallets belonging to an owner, oldest first.
    async fn list_wallets(&self, owner_id: OwnerId) -> Result<Vec<Wallet>>;
}

/// A single unit of work. Row locks taken through it are held until it ends.
///
/// Dropping a unit without calling [`UnitOfWork::commit`] rolls back every
/// staged write and releases its locks.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read and exclusively lock a wallet owned by `owner_id`.
    /// Returns `None` when the wallet is absent or owned by someone else.
    async fn lock_wallet(&mut self, owner_id: OwnerId, wallet_id: WalletId)
    -> Result<Option<Wallet>>;

    /// Read and exclusively lock a wallet regardless of owner.
    async fn lock_wallet_by_id(&mut self, wallet_id: WalletId) -> Result<Option<Wallet>>;

    /// Ledger entries touching a wallet, newest first, as seen from inside
    /// this unit (its own uncommitted entries included). Runs on the unit's
    /// own connection, so it never waits on the pool.
    async fn list_transactions_by_wallet(&mut self, wallet_id: WalletId)
    -> Result<Vec<Transaction>>;

    async fn update_balance(
        &mut self,
        wallet_id: WalletId,
        balance: &Money,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()>;

    async fn commit(self) -> Result<()>;
}
