//! In-memory storage implementation for tests and development.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::domain::{Money, OwnerId, Transaction, Wallet, WalletId};

use super::{LedgerStore, UnitOfWork};

type RowLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug, Default)]
struct Tables {
    wallets: HashMap<WalletId, Wallet>,
    /// Insertion order; newest last
    transactions: Vec<Transaction>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<WalletId, RowLock>>,
}

impl Shared {
    fn read_tables(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("memory store poisoned"))
    }

    fn write_tables(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("memory store poisoned"))
    }

    fn row_lock(&self, wallet_id: WalletId) -> Result<RowLock> {
        let mut locks = self
            .row_locks
            .lock()
            .map_err(|_| anyhow!("row lock table poisoned"))?;
        Ok(locks.entry(wallet_id).or_default().clone())
    }
}

/// In-memory ledger store with real per-wallet exclusive locks.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger entries across all wallets.
    pub fn transaction_count(&self) -> Result<usize> {
        Ok(self.shared.read_tables()?.transactions.len())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Unit = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork> {
        Ok(MemoryUnitOfWork {
            shared: Arc::clone(&self.shared),
            guards: HashMap::new(),
            balances: HashMap::new(),
            inserts: Vec::new(),
        })
    }

    async fn find_wallet(
        &self,
        owner_id: OwnerId,
        wallet_id: WalletId,
    ) -> Result<Option<Wallet>> {
        let tables = self.shared.read_tables()?;
        Ok(tables
            .wallets
            .get(&wallet_id)
            .filter(|w| w.is_owned_by(owner_id))
            .cloned())
    }

    async fn wallet_exists(&self, owner_id: OwnerId, wallet_id: WalletId) -> Result<bool> {
        Ok(self.find_wallet(owner_id, wallet_id).await?.is_some())
    }

    async fn list_transactions_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        let tables = self.shared.read_tables()?;
        Ok(tables
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.touches(wallet_id))
            .cloned()
            .collect())
    }

    async fn create_wallet(&self, wallet: &Wallet) -> Result<()> {
        let mut tables = self.shared.write_tables()?;
        if tables.wallets.contains_key(&wallet.id) {
            bail!("Wallet {} already exists", wallet.id);
        }
        tables.wallets.insert(wallet.id, wallet.clone());
        Ok(())
    }

    async fn list_wallets(&self, owner_id: OwnerId) -> Result<Vec<Wallet>> {
        let tables = self.shared.read_tables()?;
        let mut wallets: Vec<Wallet> = tables
            .wallets
            .values()
            .filter(|w| w.is_owned_by(owner_id))
            .cloned()
            .collect();
        wallets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(wallets)
    }
}

/// Holds row locks and staged writes. Writes become visible only on commit;
/// dropping the unit discards them and releases its locks.
pub struct MemoryUnitOfWork {
    shared: Arc<Shared>,
    guards: HashMap<WalletId, OwnedMutexGuard<()>>,
    balances: HashMap<WalletId, (Money, DateTime<Utc>)>,
    inserts: Vec<Transaction>,
}

impl MemoryUnitOfWork {
    fn staged_view(&self, mut wallet: Wallet) -> Wallet {
        if let Some((balance, updated_at)) = self.balances.get(&wallet.id) {
            wallet.balance = balance.clone();
            wallet.updated_at = *updated_at;
        }
        wallet
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_wallet(
        &mut self,
        owner_id: OwnerId,
        wallet_id: WalletId,
    ) -> Result<Option<Wallet>> {
        Ok(self
            .lock_wallet_by_id(wallet_id)
            .await?
            .filter(|w| w.is_owned_by(owner_id)))
    }

    async fn lock_wallet_by_id(&mut self, wallet_id: WalletId) -> Result<Option<Wallet>> {
        if !self.shared.read_tables()?.wallets.contains_key(&wallet_id) {
            return Ok(None);
        }

        if !self.guards.contains_key(&wallet_id) {
            let lock = self.shared.row_lock(wallet_id)?;
            let guard = lock.lock_owned().await;
            self.guards.insert(wallet_id, guard);
        }

        let wallet = self.shared.read_tables()?.wallets.get(&wallet_id).cloned();
        Ok(wallet.map(|w| self.staged_view(w)))
    }

    async fn list_transactions_by_wallet(
        &mut self,
        wallet_id: WalletId,
    ) -> Result<Vec<Transaction>> {
        let tables = self.shared.read_tables()?;
        Ok(tables
            .transactions
            .iter()
            .chain(self.inserts.iter())
            .rev()
            .filter(|tx| tx.touches(wallet_id))
            .cloned()
            .collect())
    }

    async fn update_balance(
        &mut self,
        wallet_id: WalletId,
        balance: &Money,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.guards.contains_key(&wallet_id) {
            bail!("Wallet {} is not locked by this unit of work", wallet_id);
        }
        self.balances
            .insert(wallet_id, (balance.clone(), updated_at));
        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        let duplicate = self.inserts.iter().any(|t| t.id == transaction.id)
            || self
                .shared
                .read_tables()?
                .transactions
                .iter()
                .any(|t| t.id == transaction.id);
        if duplicate {
            bail!("Transaction {} already recorded", transaction.id);
        }
        self.inserts.push(transaction.clone());
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let MemoryUnitOfWork {
            shared,
            guards,
            balances,
            mut inserts,
        } = self;

        {
            let mut tables = shared.write_tables()?;
            if let Some(missing) = balances.keys().find(|id| !tables.wallets.contains_key(id)) {
                bail!("Wallet {} vanished before commit", missing);
            }
            for (wallet_id, (balance, updated_at)) in balances {
                let wallet = tables
                    .wallets
                    .get_mut(&wallet_id)
                    .ok_or_else(|| anyhow!("Wallet {} vanished before commit", wallet_id))?;
                wallet.balance = balance;
                wallet.updated_at = updated_at;
            }
            tables.transactions.append(&mut inserts);
        }

        // Row locks are released only once the writes are visible
        drop(guards);
        Ok(())
    }
}
