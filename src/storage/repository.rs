use std::str::FromStr;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{Money, OwnerId, Transaction, TransactionKind, Wallet, WalletId};

use super::{LedgerStore, MIGRATION_001_INITIAL, UnitOfWork};

const WALLET_COLUMNS: &str = "id, owner_id, name, balance, created_at, updated_at";
const TRANSACTION_COLUMNS: &str = "id, wallet_id, kind, amount, related_wallet_id, created_at";

/// SQLite-backed ledger store.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database described by `config` and run migrations.
    pub async fn open(config: &Config) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url())
            .context("Invalid database URL")?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout())
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let repo = Self::new(pool);
        repo.migrate().await?;
        tracing::debug!(database = %config.database, "ledger store ready");
        Ok(repo)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_wallet(row: &SqliteRow) -> Result<Wallet> {
        let id_str: String = row.get("id");
        let owner_str: String = row.get("owner_id");
        let balance_str: String = row.get("balance");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Wallet {
            id: Uuid::parse_str(&id_str).context("Invalid wallet ID")?,
            owner_id: Uuid::parse_str(&owner_str).context("Invalid owner ID")?,
            name: row.get("name"),
            balance: Money::from_str(&balance_str).context("Invalid wallet balance")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
            updated_at: parse_timestamp(&updated_at_str).context("Invalid updated_at")?,
        })
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let wallet_str: String = row.get("wallet_id");
        let kind_str: String = row.get("kind");
        let amount_str: String = row.get("amount");
        let related_str: Option<String> = row.get("related_wallet_id");
        let created_at_str: String = row.get("created_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            wallet_id: Uuid::parse_str(&wallet_str).context("Invalid wallet ID")?,
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            amount: Money::from_str(&amount_str).context("Invalid transaction amount")?,
            related_wallet_id: related_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid related wallet ID")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }
}

/// Entries attributed to a wallet plus transfers it received, newest first.
fn history_sql() -> String {
    format!(
        r#"
        SELECT {TRANSACTION_COLUMNS}
        FROM transactions
        WHERE wallet_id = ? OR related_wallet_id = ?
        ORDER BY seq DESC
        "#
    )
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

#[async_trait]
impl LedgerStore for Repository {
    type Unit = SqliteUnitOfWork;

    /// `BEGIN IMMEDIATE` takes SQLite's write lock up front, so every row read
    /// inside the unit is exclusive against other writers until it ends.
    async fn begin(&self) -> Result<SqliteUnitOfWork> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin unit of work")?;
        Ok(SqliteUnitOfWork { tx })
    }

    async fn find_wallet(
        &self,
        owner_id: OwnerId,
        wallet_id: WalletId,
    ) -> Result<Option<Wallet>> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE id = ? AND owner_id = ?"
        ))
        .bind(wallet_id.to_string())
        .bind(owner_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wallet")?;

        row.as_ref().map(Self::row_to_wallet).transpose()
    }

    async fn wallet_exists(&self, owner_id: OwnerId, wallet_id: WalletId) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM wallets WHERE id = ? AND owner_id = ?) AS found",
        )
        .bind(wallet_id.to_string())
        .bind(owner_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to check wallet ownership")?;

        Ok(row.get::<i64, _>("found") != 0)
    }

    async fn list_transactions_by_wallet(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&history_sql())
            .bind(wallet_id.to_string())
            .bind(wallet_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions for wallet")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn create_wallet(&self, wallet: &Wallet) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO wallets ({WALLET_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(wallet.id.to_string())
        .bind(wallet.owner_id.to_string())
        .bind(&wallet.name)
        .bind(wallet.balance.to_string())
        .bind(wallet.created_at.to_rfc3339())
        .bind(wallet.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save wallet")?;
        Ok(())
    }

    async fn list_wallets(&self, owner_id: OwnerId) -> Result<Vec<Wallet>> {
        let rows = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE owner_id = ? ORDER BY created_at, id"
        ))
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wallets")?;

        rows.iter().map(Self::row_to_wallet).collect()
    }
}

/// A SQLite write transaction. Rolled back by `sqlx` when dropped uncommitted.
pub struct SqliteUnitOfWork {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn lock_wallet(
        &mut self,
        owner_id: OwnerId,
        wallet_id: WalletId,
    ) -> Result<Option<Wallet>> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE id = ? AND owner_id = ?"
        ))
        .bind(wallet_id.to_string())
        .bind(owner_id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to lock wallet")?;

        row.as_ref().map(Repository::row_to_wallet).transpose()
    }

    async fn lock_wallet_by_id(&mut self, wallet_id: WalletId) -> Result<Option<Wallet>> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE id = ?"
        ))
        .bind(wallet_id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to lock wallet")?;

        row.as_ref().map(Repository::row_to_wallet).transpose()
    }

    async fn list_transactions_by_wallet(
        &mut self,
        wallet_id: WalletId,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&history_sql())
            .bind(wallet_id.to_string())
            .bind(wallet_id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .context("Failed to list transactions for wallet")?;

        rows.iter().map(Repository::row_to_transaction).collect()
    }

    async fn update_balance(
        &mut self,
        wallet_id: WalletId,
        balance: &Money,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE wallets SET balance = ?, updated_at = ? WHERE id = ?")
            .bind(balance.to_string())
            .bind(updated_at.to_rfc3339())
            .bind(wallet_id.to_string())
            .execute(&mut *self.tx)
            .await
            .context("Failed to update wallet balance")?;

        if result.rows_affected() != 1 {
            bail!("Wallet {} vanished during balance update", wallet_id);
        }
        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(transaction.id.to_string())
        .bind(transaction.wallet_id.to_string())
        .bind(transaction.kind.as_str())
        .bind(transaction.amount.to_string())
        .bind(transaction.related_wallet_id.map(|id| id.to_string()))
        .bind(transaction.created_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .context("Failed to insert transaction record")?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit unit of work")
    }
}
