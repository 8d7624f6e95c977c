use serde::Serialize;

use crate::domain::{Money, Transaction, Wallet, WalletId, compute_balance};
use crate::storage::{LedgerStore, UnitOfWork};

use super::validation::{parse_id, validate_wallet_name};
use super::{LedgerError, LedgerResult, RequestContext};

/// Result of reconciling a wallet's stored balance against its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletAudit {
    pub wallet_id: WalletId,
    pub recorded_balance: Money,
    pub derived_balance: Money,
    pub transaction_count: usize,
    pub consistent: bool,
}

/// Read path over the ledger, plus wallet provisioning.
pub struct WalletQuery<S> {
    store: S,
}

impl<S: LedgerStore> WalletQuery<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Wallet details, or `None` if no wallet with this id belongs to `owner_id`.
    #[tracing::instrument(name = "get_wallet_info", skip_all, fields(request_id = %ctx.request_id))]
    pub async fn get_wallet_info(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        wallet_id: &str,
    ) -> LedgerResult<Option<Wallet>> {
        let owner_id = parse_id("owner id", owner_id)?;
        let wallet_id = parse_id("wallet id", wallet_id)?;

        Ok(self.store.find_wallet(owner_id, wallet_id).await?)
    }

    /// Ledger entries for a wallet, newest first, including incoming transfers.
    #[tracing::instrument(
        name = "get_transactions_by_wallet",
        skip_all,
        fields(request_id = %ctx.request_id)
    )]
    pub async fn get_transactions_by_wallet(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        wallet_id: &str,
    ) -> LedgerResult<Vec<Transaction>> {
        let owner_id = parse_id("owner id", owner_id)?;
        let wallet_id = parse_id("wallet id", wallet_id)?;

        if !self.store.wallet_exists(owner_id, wallet_id).await? {
            return Err(LedgerError::WalletNotFound(wallet_id.to_string()));
        }
        Ok(self.store.list_transactions_by_wallet(wallet_id).await?)
    }

    #[tracing::instrument(name = "list_wallets", skip_all, fields(request_id = %ctx.request_id))]
    pub async fn list_wallets(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
    ) -> LedgerResult<Vec<Wallet>> {
        let owner_id = parse_id("owner id", owner_id)?;
        Ok(self.store.list_wallets(owner_id).await?)
    }

    /// Provision a new, empty wallet for `owner_id`.
    #[tracing::instrument(name = "create_wallet", skip_all, fields(request_id = %ctx.request_id))]
    pub async fn create_wallet(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        name: &str,
    ) -> LedgerResult<Wallet> {
        let owner_id = parse_id("owner id", owner_id)?;
        validate_wallet_name(name)?;

        let wallet = Wallet::new(owner_id, name.trim());
        self.store.create_wallet(&wallet).await?;
        tracing::info!(wallet_id = %wallet.id, "wallet created");
        Ok(wallet)
    }

    /// Recompute a wallet's balance from its ledger entries and compare it
    /// with the stored balance.
    ///
    /// Both reads go through one unit of work while the wallet row stays
    /// locked, so no ledger operation on it can land between them. The unit
    /// is dropped without commit; it never writes.
    #[tracing::instrument(name = "audit_wallet", skip_all, fields(request_id = %ctx.request_id))]
    pub async fn audit_wallet(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        wallet_id: &str,
    ) -> LedgerResult<WalletAudit> {
        let owner_id = parse_id("owner id", owner_id)?;
        let wallet_id = parse_id("wallet id", wallet_id)?;

        let mut unit = self.store.begin().await?;
        let wallet = unit
            .lock_wallet(owner_id, wallet_id)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(wallet_id.to_string()))?;
        let history = unit.list_transactions_by_wallet(wallet_id).await?;
        drop(unit);

        let derived_balance = compute_balance(wallet.id, &history);
        let consistent = derived_balance == wallet.balance;
        if !consistent {
            tracing::warn!(
                wallet_id = %wallet.id,
                recorded = %wallet.balance,
                derived = %derived_balance,
                "wallet balance does not match its history"
            );
        }

        Ok(WalletAudit {
            wallet_id: wallet.id,
            recorded_balance: wallet.balance,
            derived_balance,
            transaction_count: history.len(),
            consistent,
        })
    }
}
