use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use uuid::Uuid;

use crate::application::validation::parse_amount;
use crate::application::{LedgerService, RequestContext, WalletQuery};
use crate::config::Config;
use crate::io::export::Exporter;
use crate::logging;
use crate::storage::Repository;

/// walletd - wallet ledger
#[derive(Parser)]
#[command(name = "walletd")]
#[command(about = "Deposit, withdraw and transfer between wallets backed by an atomic ledger")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Correlation id recorded on every log line of this invocation
    #[arg(long, global = true)]
    pub request_id: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Wallet management commands
    #[command(subcommand)]
    Wallet(WalletCommands),

    /// Add funds to a wallet
    Deposit {
        /// Wallet id
        wallet: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,

        /// Owner id of the wallet
        #[arg(long)]
        owner: String,
    },

    /// Remove funds from a wallet
    Withdraw {
        /// Wallet id
        wallet: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,

        /// Owner id of the wallet
        #[arg(long)]
        owner: String,
    },

    /// Move funds from one of your wallets to any other wallet
    Transfer {
        /// Source wallet id
        wallet: String,

        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Owner id of the source wallet
        #[arg(long)]
        owner: String,

        /// Destination wallet id
        #[arg(long)]
        to: String,
    },

    /// Show the transaction history of a wallet, newest first
    History {
        /// Wallet id
        wallet: String,

        /// Owner id of the wallet
        #[arg(long)]
        owner: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: HistoryFormat,
    },
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Create a new empty wallet
    Create {
        /// Owner id
        #[arg(long)]
        owner: String,

        /// Display name
        #[arg(long)]
        name: String,
    },

    /// List wallets of an owner
    List {
        /// Owner id
        #[arg(long)]
        owner: String,
    },

    /// Show wallet details
    Show {
        /// Wallet id
        wallet: String,

        /// Owner id
        #[arg(long)]
        owner: String,
    },

    /// Recompute the balance from history and compare with the stored one
    Audit {
        /// Wallet id
        wallet: String,

        /// Owner id
        #[arg(long)]
        owner: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HistoryFormat {
    Table,
    Json,
    Csv,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        self.config.validate()?;
        logging::init(&self.config.log_filter, self.verbose);

        let ctx = match self.request_id {
            Some(id) => RequestContext::with_request_id(id),
            None => RequestContext::new(),
        };
        let repo = Repository::open(&self.config).await?;

        match self.command {
            Commands::Init => {
                println!("Database initialized: {}", self.config.database);
            }

            Commands::Wallet(wallet_cmd) => {
                let query = WalletQuery::new(repo);
                run_wallet_command(&query, &ctx, wallet_cmd).await?;
            }

            Commands::Deposit {
                wallet,
                amount,
                owner,
            } => {
                let service = LedgerService::new(repo);
                let amount = parse_amount(&amount)?;
                let transaction = service.deposit(&ctx, &owner, &wallet, amount).await?;
                print_json(&transaction)?;
            }

            Commands::Withdraw {
                wallet,
                amount,
                owner,
            } => {
                let service = LedgerService::new(repo);
                let amount = parse_amount(&amount)?;
                let transaction = service.withdraw(&ctx, &owner, &wallet, amount).await?;
                print_json(&transaction)?;
            }

            Commands::Transfer {
                wallet,
                amount,
                owner,
                to,
            } => {
                let service = LedgerService::new(repo);
                let amount = parse_amount(&amount)?;
                let transaction = service
                    .transfer(&ctx, &owner, &wallet, &to, amount)
                    .await?;
                print_json(&transaction)?;
            }

            Commands::History {
                wallet,
                owner,
                format,
            } => {
                let query = WalletQuery::new(repo);
                run_history_command(&query, &ctx, &owner, &wallet, format).await?;
            }
        }

        Ok(())
    }
}

async fn run_wallet_command(
    query: &WalletQuery<Repository>,
    ctx: &RequestContext,
    cmd: WalletCommands,
) -> Result<()> {
    match cmd {
        WalletCommands::Create { owner, name } => {
            let wallet = query.create_wallet(ctx, &owner, &name).await?;
            print_json(&wallet)?;
        }

        WalletCommands::List { owner } => {
            let wallets = query.list_wallets(ctx, &owner).await?;
            if wallets.is_empty() {
                println!("No wallets found.");
            } else {
                println!("{:<36}  {:<20} {:>14}", "ID", "NAME", "BALANCE");
                println!("{}", "-".repeat(72));
                for wallet in &wallets {
                    println!(
                        "{:<36}  {:<20} {:>14}",
                        wallet.id,
                        wallet.name,
                        wallet.balance.to_string()
                    );
                }
            }
        }

        WalletCommands::Show { wallet, owner } => {
            match query.get_wallet_info(ctx, &owner, &wallet).await? {
                Some(wallet) => print_json(&wallet)?,
                None => println!("No wallet {} for owner {}", wallet, owner),
            }
        }

        WalletCommands::Audit { wallet, owner } => {
            let audit = query.audit_wallet(ctx, &owner, &wallet).await?;
            print_json(&audit)?;
            if !audit.consistent {
                anyhow::bail!("Wallet {} failed reconciliation", audit.wallet_id);
            }
        }
    }
    Ok(())
}

async fn run_history_command(
    query: &WalletQuery<Repository>,
    ctx: &RequestContext,
    owner: &str,
    wallet: &str,
    format: HistoryFormat,
) -> Result<()> {
    match format {
        HistoryFormat::Json => {
            Exporter::new(query)
                .export_history_json(ctx, owner, wallet, std::io::stdout())
                .await?;
            println!();
        }

        HistoryFormat::Csv => {
            let count = Exporter::new(query)
                .export_history_csv(ctx, owner, wallet, std::io::stdout())
                .await?;
            eprintln!("Exported {} transactions", count);
        }

        HistoryFormat::Table => {
            let transactions = query.get_transactions_by_wallet(ctx, owner, wallet).await?;
            if transactions.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }
            println!(
                "{:<20} {:<10} {:>14}  {:<36}",
                "DATE", "TYPE", "AMOUNT", "COUNTERPARTY"
            );
            println!("{}", "-".repeat(84));
            let viewing = Uuid::parse_str(wallet.trim()).ok();
            for tx in &transactions {
                let counterparty = match tx.related_wallet_id {
                    Some(related) if Some(related) == viewing => {
                        format!("from {}", tx.wallet_id)
                    }
                    Some(related) => format!("to {}", related),
                    None => String::new(),
                };
                println!(
                    "{:<20} {:<10} {:>14}  {:<36}",
                    tx.created_at.format("%Y-%m-%d %H:%M:%S"),
                    tx.kind.as_str(),
                    tx.amount.to_string(),
                    counterparty
                );
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
