use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::{LedgerError, RequestContext, WalletQuery};
use crate::domain::{Transaction, Wallet};
use crate::storage::LedgerStore;

/// Snapshot of one wallet and its ledger entries.
#[derive(Debug, Clone, Serialize)]
pub struct HistorySnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub wallet: Wallet,
    pub transactions: Vec<Transaction>,
}

/// Exporter for a wallet's history.
pub struct Exporter<'a, S> {
    query: &'a WalletQuery<S>,
}

impl<'a, S: LedgerStore> Exporter<'a, S> {
    pub fn new(query: &'a WalletQuery<S>) -> Self {
        Self { query }
    }

    async fn load(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        wallet_id: &str,
    ) -> Result<(Wallet, Vec<Transaction>)> {
        let wallet = self
            .query
            .get_wallet_info(ctx, owner_id, wallet_id)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(wallet_id.to_string()))?;
        let transactions = self
            .query
            .get_transactions_by_wallet(ctx, owner_id, wallet_id)
            .await?;
        Ok((wallet, transactions))
    }

    /// Export a wallet's history to CSV, newest first. `effect` is the signed
    /// change the entry made to this wallet's balance.
    pub async fn export_history_csv<W: Write>(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        wallet_id: &str,
        writer: W,
    ) -> Result<usize> {
        let (wallet, transactions) = self.load(ctx, owner_id, wallet_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "created_at",
            "type",
            "amount",
            "effect",
            "wallet_id",
            "related_wallet_id",
        ])?;

        let mut count = 0;
        for tx in &transactions {
            csv_writer.write_record([
                tx.id.to_string(),
                tx.created_at.to_rfc3339(),
                tx.kind.as_str().to_string(),
                tx.amount.to_string(),
                tx.signed_amount_for(wallet.id).to_string(),
                tx.wallet_id.to_string(),
                tx.related_wallet_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush().context("Failed to flush CSV export")?;
        Ok(count)
    }

    /// Export a wallet and its history as a pretty-printed JSON snapshot.
    pub async fn export_history_json<W: Write>(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        wallet_id: &str,
        mut writer: W,
    ) -> Result<HistorySnapshot> {
        let (wallet, transactions) = self.load(ctx, owner_id, wallet_id).await?;

        let snapshot = HistorySnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            wallet,
            transactions,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
