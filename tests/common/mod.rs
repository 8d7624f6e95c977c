// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use uuid::Uuid;
use walletd::application::{LedgerService, RequestContext, WalletQuery};
use walletd::config::Config;
use walletd::domain::{Money, OwnerId, Transaction, Wallet, WalletId};
use walletd::storage::{LedgerStore, MemoryStore, Repository, UnitOfWork};

/// Helper to create a repository backed by a temporary database
pub async fn test_repository() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let config = Config::for_path(temp_dir.path().join("test.db"));
    let repo = Repository::open(&config).await?;
    Ok((repo, temp_dir))
}

/// Like [`test_repository`], with a pool of at most `max_connections` connections.
pub async fn test_repository_with_pool(max_connections: u32) -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let mut config = Config::for_path(temp_dir.path().join("test.db"));
    config.max_connections = max_connections;
    config.validate()?;
    let repo = Repository::open(&config).await?;
    Ok((repo, temp_dir))
}

pub fn money(s: &str) -> Money {
    s.parse().unwrap()
}

pub fn new_owner() -> String {
    Uuid::new_v4().to_string()
}

/// Core service and read facade sharing one store.
pub struct Ledger<S> {
    pub service: LedgerService<S>,
    pub query: WalletQuery<S>,
    pub ctx: RequestContext,
}

impl<S: LedgerStore + Clone> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self {
            service: LedgerService::new(store.clone()),
            query: WalletQuery::new(store),
            ctx: RequestContext::with_request_id("test"),
        }
    }

    /// Create a wallet and fund it with an initial deposit (skipped for zero).
    pub async fn open_wallet(&self, owner: &str, name: &str, initial: &str) -> Result<Wallet> {
        let wallet = self.query.create_wallet(&self.ctx, owner, name).await?;
        let initial = money(initial);
        if initial.is_positive() {
            self.service
                .deposit(&self.ctx, owner, &wallet.id.to_string(), initial)
                .await?;
        }
        Ok(wallet)
    }

    pub async fn balance(&self, owner: &str, wallet: &Wallet) -> Result<Money> {
        let info = self
            .query
            .get_wallet_info(&self.ctx, owner, &wallet.id.to_string())
            .await?
            .expect("wallet should exist");
        Ok(info.balance)
    }
}

pub fn memory_ledger() -> Ledger<MemoryStore> {
    Ledger::new(MemoryStore::new())
}

pub async fn sqlite_ledger() -> Result<(Ledger<Repository>, TempDir)> {
    let (repo, temp) = test_repository().await?;
    Ok((Ledger::new(repo), temp))
}

/// Store wrapper whose units fail every ledger entry insert, after the
/// balance update has already been staged.
#[derive(Clone)]
pub struct FailingInserts<S> {
    inner: S,
}

impl<S> FailingInserts<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

pub struct FailingUnit<U> {
    inner: U,
}

#[async_trait]
impl<S: LedgerStore> LedgerStore for FailingInserts<S> {
    type Unit = FailingUnit<S::Unit>;

    async fn begin(&self) -> Result<Self::Unit> {
        Ok(FailingUnit {
            inner: self.inner.begin().await?,
        })
    }

    async fn find_wallet(
        &self,
        owner_id: OwnerId,
        wallet_id: WalletId,
    ) -> Result<Option<Wallet>> {
        self.inner.find_wallet(owner_id, wallet_id).await
    }

    async fn wallet_exists(&self, owner_id: OwnerId, wallet_id: WalletId) -> Result<bool> {
        self.inner.wallet_exists(owner_id, wallet_id).await
    }

    async fn list_transactions_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        self.inner.list_transactions_by_wallet(wallet_id).await
    }

    async fn create_wallet(&self, wallet: &Wallet) -> Result<()> {
        self.inner.create_wallet(wallet).await
    }

    async fn list_wallets(&self, owner_id: OwnerId) -> Result<Vec<Wallet>> {
        self.inner.list_wallets(owner_id).await
    }
}

#[async_trait]
impl<U: UnitOfWork> UnitOfWork for FailingUnit<U> {
    async fn lock_wallet(
        &mut self,
        owner_id: OwnerId,
        wallet_id: WalletId,
    ) -> Result<Option<Wallet>> {
        self.inner.lock_wallet(owner_id, wallet_id).await
    }

    async fn lock_wallet_by_id(&mut self, wallet_id: WalletId) -> Result<Option<Wallet>> {
        self.inner.lock_wallet_by_id(wallet_id).await
    }

    async fn list_transactions_by_wallet(
        &mut self,
        wallet_id: WalletId,
    ) -> Result<Vec<Transaction>> {
        self.inner.list_transactions_by_wallet(wallet_id).await
    }

    async fn update_balance(
        &mut self,
        wallet_id: WalletId,
        balance: &Money,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.inner
            .update_balance(wallet_id, balance, updated_at)
            .await
    }

    async fn insert_transaction(&mut self, _transaction: &Transaction) -> Result<()> {
        bail!("injected insert failure")
    }

    async fn commit(self) -> Result<()> {
        self.inner.commit().await
    }
}

/// Store that fails the test if anything touches it.
#[derive(Clone, Default)]
pub struct UntouchableStore;

pub struct UntouchableUnit;

#[async_trait]
impl LedgerStore for UntouchableStore {
    type Unit = UntouchableUnit;

    async fn begin(&self) -> Result<UntouchableUnit> {
        panic!("store touched: begin")
    }

    async fn find_wallet(&self, _: OwnerId, _: WalletId) -> Result<Option<Wallet>> {
        panic!("store touched: find_wallet")
    }

    async fn wallet_exists(&self, _: OwnerId, _: WalletId) -> Result<bool> {
        panic!("store touched: wallet_exists")
    }

    async fn list_transactions_by_wallet(&self, _: WalletId) -> Result<Vec<Transaction>> {
        panic!("store touched: list_transactions_by_wallet")
    }

    async fn create_wallet(&self, _: &Wallet) -> Result<()> {
        panic!("store touched: create_wallet")
    }

    async fn list_wallets(&self, _: OwnerId) -> Result<Vec<Wallet>> {
        panic!("store touched: list_wallets")
    }
}

#[async_trait]
impl UnitOfWork for UntouchableUnit {
    async fn lock_wallet(&mut self, _: OwnerId, _: WalletId) -> Result<Option<Wallet>> {
        panic!("store touched: lock_wallet")
    }

    async fn lock_wallet_by_id(&mut self, _: WalletId) -> Result<Option<Wallet>> {
        panic!("store touched: lock_wallet_by_id")
    }

    async fn list_transactions_by_wallet(&mut self, _: WalletId) -> Result<Vec<Transaction>> {
        panic!("store touched: unit list_transactions_by_wallet")
    }

    async fn update_balance(&mut self, _: WalletId, _: &Money, _: DateTime<Utc>) -> Result<()> {
        panic!("store touched: update_balance")
    }

    async fn insert_transaction(&mut self, _: &Transaction) -> Result<()> {
        panic!("store touched: insert_transaction")
    }

    async fn commit(self) -> Result<()> {
        panic!("store touched: commit")
    }
}
