use crate::domain::{LockOrder, Money, OwnerId, Transaction, WalletId, lock_order};
use crate::storage::{LedgerStore, UnitOfWork};

use super::validation::{parse_id, validate_positive_amount};
use super::{LedgerError, LedgerResult, RequestContext};

/// The wallet ledger core: every balance mutation goes through here.
///
/// Each operation validates its inputs before touching the store, then runs
/// as one unit of work: lock the involved wallet rows, check preconditions,
/// stage the new balances and the ledger entry, commit. Any early return
/// drops the unit, which rolls everything back.
pub struct LedgerService<S> {
    store: S,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add `amount` to a wallet owned by `owner_id`.
    #[tracing::instrument(
        name = "deposit",
        skip_all,
        fields(request_id = %ctx.request_id, wallet_id = %wallet_id, amount = %amount)
    )]
    pub async fn deposit(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        wallet_id: &str,
        amount: Money,
    ) -> LedgerResult<Transaction> {
        let owner_id = parse_id("owner id", owner_id)?;
        let wallet_id = parse_id("wallet id", wallet_id)?;
        validate_positive_amount(&amount)?;

        observe(self.apply_deposit(owner_id, wallet_id, amount).await)
    }

    /// Remove `amount` from a wallet owned by `owner_id`, never below zero.
    #[tracing::instrument(
        name = "withdraw",
        skip_all,
        fields(request_id = %ctx.request_id, wallet_id = %wallet_id, amount = %amount)
    )]
    pub async fn withdraw(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        wallet_id: &str,
        amount: Money,
    ) -> LedgerResult<Transaction> {
        let owner_id = parse_id("owner id", owner_id)?;
        let wallet_id = parse_id("wallet id", wallet_id)?;
        validate_positive_amount(&amount)?;

        observe(self.apply_withdrawal(owner_id, wallet_id, amount).await)
    }

    /// Move `amount` from a wallet owned by `source_owner_id` to any other wallet.
    ///
    /// One ledger entry is written, attributed to the source wallet with the
    /// destination as `related_wallet_id`; both balances change in the same unit.
    #[tracing::instrument(
        name = "transfer",
        skip_all,
        fields(
            request_id = %ctx.request_id,
            source_wallet_id = %source_wallet_id,
            destination_wallet_id = %destination_wallet_id,
            amount = %amount,
        )
    )]
    pub async fn transfer(
        &self,
        ctx: &RequestContext,
        source_owner_id: &str,
        source_wallet_id: &str,
        destination_wallet_id: &str,
        amount: Money,
    ) -> LedgerResult<Transaction> {
        let owner_id = parse_id("owner id", source_owner_id)?;
        let source = parse_id("source wallet id", source_wallet_id)?;
        let destination = parse_id("destination wallet id", destination_wallet_id)?;
        if source == destination {
            return Err(LedgerError::validation(
                "Source and destination wallets cannot be the same",
            ));
        }
        validate_positive_amount(&amount)?;

        observe(
            self.apply_transfer(owner_id, source, destination, amount)
                .await,
        )
    }

    async fn apply_deposit(
        &self,
        owner_id: OwnerId,
        wallet_id: WalletId,
        amount: Money,
    ) -> LedgerResult<Transaction> {
        let mut unit = self.store.begin().await?;

        let wallet = unit
            .lock_wallet(owner_id, wallet_id)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(wallet_id.to_string()))?;

        let new_balance = &wallet.balance + &amount;
        let transaction = Transaction::deposit(wallet.id, amount)?;

        unit.update_balance(wallet.id, &new_balance, transaction.created_at)
            .await?;
        unit.insert_transaction(&transaction).await?;
        unit.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id,
            balance = %new_balance,
            "deposit recorded"
        );
        Ok(transaction)
    }

    async fn apply_withdrawal(
        &self,
        owner_id: OwnerId,
        wallet_id: WalletId,
        amount: Money,
    ) -> LedgerResult<Transaction> {
        let mut unit = self.store.begin().await?;

        let wallet = unit
            .lock_wallet(owner_id, wallet_id)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(wallet_id.to_string()))?;

        if !wallet.can_cover(&amount) {
            return Err(LedgerError::InsufficientFunds {
                wallet_id: wallet.id,
                balance: wallet.balance,
                required: amount,
            });
        }

        let new_balance = &wallet.balance - &amount;
        let transaction = Transaction::withdrawal(wallet.id, amount)?;

        unit.update_balance(wallet.id, &new_balance, transaction.created_at)
            .await?;
        unit.insert_transaction(&transaction).await?;
        unit.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id,
            balance = %new_balance,
            "withdrawal recorded"
        );
        Ok(transaction)
    }

    async fn apply_transfer(
        &self,
        owner_id: OwnerId,
        source: WalletId,
        destination: WalletId,
        amount: Money,
    ) -> LedgerResult<Transaction> {
        let mut unit = self.store.begin().await?;

        // Lock by ascending id whatever the roles, so opposing transfers cannot deadlock
        let (source_wallet, destination_wallet) = match lock_order(source, destination) {
            LockOrder::SourceFirst => {
                let s = unit.lock_wallet(owner_id, source).await?;
                let d = unit.lock_wallet_by_id(destination).await?;
                (s, d)
            }
            LockOrder::DestinationFirst => {
                let d = unit.lock_wallet_by_id(destination).await?;
                let s = unit.lock_wallet(owner_id, source).await?;
                (s, d)
            }
        };

        let source_wallet =
            source_wallet.ok_or_else(|| LedgerError::WalletNotFound(source.to_string()))?;
        if !source_wallet.can_cover(&amount) {
            return Err(LedgerError::InsufficientFunds {
                wallet_id: source_wallet.id,
                balance: source_wallet.balance,
                required: amount,
            });
        }
        let destination_wallet = destination_wallet
            .ok_or_else(|| LedgerError::WalletNotFound(destination.to_string()))?;

        let new_source_balance = &source_wallet.balance - &amount;
        let new_destination_balance = &destination_wallet.balance + &amount;
        let transaction =
            Transaction::transfer(source_wallet.id, destination_wallet.id, amount)?;

        unit.update_balance(source_wallet.id, &new_source_balance, transaction.created_at)
            .await?;
        unit.update_balance(
            destination_wallet.id,
            &new_destination_balance,
            transaction.created_at,
        )
        .await?;
        unit.insert_transaction(&transaction).await?;
        unit.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id,
            balance = %new_source_balance,
            "transfer recorded"
        );
        Ok(transaction)
    }
}

/// Log the outcome of a unit of work at a level matching its error kind.
fn observe<T>(result: LedgerResult<T>) -> LedgerResult<T> {
    match &result {
        Ok(_) => {}
        Err(LedgerError::Storage(err)) => {
            tracing::error!(error = ?err, "ledger operation rolled back");
        }
        Err(err) => tracing::warn!(error = %err, "ledger operation rejected"),
    }
    result
}
