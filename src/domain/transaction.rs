use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Money, WalletId};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    /// Debit of the source wallet, credited directly to `related_wallet_id`
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Transfer => "transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TransactionKind::Deposit),
            "withdrawal" => Some(TransactionKind::Withdrawal),
            "transfer" => Some(TransactionKind::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger entry was built with a zero or negative amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonPositiveAmount(pub Money);

impl std::fmt::Display for NonPositiveAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transaction amount must be positive, got {}", self.0)
    }
}

impl std::error::Error for NonPositiveAmount {}

/// An immutable ledger entry. Created only as a side effect of a ledger
/// operation and never updated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Wallet the entry is attributed to (the source wallet for transfers)
    pub wallet_id: WalletId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Always strictly positive; direction comes from `kind`
    pub amount: Money,
    /// Counterparty, set only for transfers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_wallet_id: Option<WalletId>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    fn new(
        wallet_id: WalletId,
        kind: TransactionKind,
        amount: Money,
        related_wallet_id: Option<WalletId>,
    ) -> Result<Self, NonPositiveAmount> {
        if !amount.is_positive() {
            return Err(NonPositiveAmount(amount));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            wallet_id,
            kind,
            amount,
            related_wallet_id,
            created_at: Utc::now(),
        })
    }

    pub fn deposit(wallet_id: WalletId, amount: Money) -> Result<Self, NonPositiveAmount> {
        Self::new(wallet_id, TransactionKind::Deposit, amount, None)
    }

    pub fn withdrawal(wallet_id: WalletId, amount: Money) -> Result<Self, NonPositiveAmount> {
        Self::new(wallet_id, TransactionKind::Withdrawal, amount, None)
    }

    pub fn transfer(
        from_wallet: WalletId,
        to_wallet: WalletId,
        amount: Money,
    ) -> Result<Self, NonPositiveAmount> {
        Self::new(
            from_wallet,
            TransactionKind::Transfer,
            amount,
            Some(to_wallet),
        )
    }

    /// Returns true if the entry is attributed to `wallet_id` or credits it.
    pub fn touches(&self, wallet_id: WalletId) -> bool {
        self.wallet_id == wallet_id || self.related_wallet_id == Some(wallet_id)
    }

    /// Returns true if this entry is a transfer credited to `wallet_id`.
    pub fn is_incoming_for(&self, wallet_id: WalletId) -> bool {
        self.kind == TransactionKind::Transfer
            && self.related_wallet_id == Some(wallet_id)
            && self.wallet_id != wallet_id
    }

    /// The signed effect of this entry on the balance of `wallet_id`.
    /// Entries unrelated to the wallet contribute zero.
    pub fn signed_amount_for(&self, wallet_id: WalletId) -> Money {
        match self.kind {
            TransactionKind::Deposit if self.wallet_id == wallet_id => self.amount.clone(),
            TransactionKind::Withdrawal if self.wallet_id == wallet_id => {
                Money::zero() - self.amount.clone()
            }
            TransactionKind::Transfer if self.wallet_id == wallet_id => {
                Money::zero() - self.amount.clone()
            }
            TransactionKind::Transfer if self.is_incoming_for(wallet_id) => self.amount.clone(),
            _ => Money::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            TransactionKind::Deposit,
            TransactionKind::Withdrawal,
            TransactionKind::Transfer,
        ] {
            assert_eq!(TransactionKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::from_str("refund"), None);
    }

    #[test]
    fn test_transfer_records_counterparty() {
        let (from, to) = (Uuid::new_v4(), Uuid::new_v4());
        let tx = Transaction::transfer(from, to, money("20.00")).unwrap();

        assert_eq!(tx.wallet_id, from);
        assert_eq!(tx.related_wallet_id, Some(to));
        assert_eq!(tx.kind, TransactionKind::Transfer);
        assert!(tx.is_incoming_for(to));
        assert!(!tx.is_incoming_for(from));
    }

    #[test]
    fn test_deposit_has_no_counterparty() {
        let wallet = Uuid::new_v4();
        let tx = Transaction::deposit(wallet, money("1.00")).unwrap();
        assert_eq!(tx.related_wallet_id, None);
        assert_eq!(tx.kind, TransactionKind::Deposit);
    }

    #[test]
    fn test_signed_amounts() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let transfer = Transaction::transfer(a, b, money("20.00")).unwrap();

        assert_eq!(
            Transaction::deposit(a, money("50.00")).unwrap().signed_amount_for(a),
            money("50.00")
        );
        assert_eq!(
            Transaction::withdrawal(a, money("30.00")).unwrap().signed_amount_for(a),
            money("-30.00")
        );
        assert_eq!(transfer.signed_amount_for(a), money("-20.00"));
        assert_eq!(transfer.signed_amount_for(b), money("20.00"));
        assert_eq!(transfer.signed_amount_for(Uuid::new_v4()), Money::zero());
    }

    #[test]
    fn test_ids_are_unique() {
        let wallet = Uuid::new_v4();
        let first = Transaction::deposit(wallet, money("1")).unwrap();
        let second = Transaction::deposit(wallet, money("1")).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let tx = Transaction::withdrawal(Uuid::new_v4(), money("5.50")).unwrap();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "withdrawal");
        assert_eq!(json["amount"], "5.50");
        assert!(json.get("related_wallet_id").is_none());
    }

    #[test]
    fn test_non_positive_amount_is_rejected() {
        let wallet = Uuid::new_v4();

        assert_eq!(
            Transaction::deposit(wallet, Money::zero()).unwrap_err(),
            NonPositiveAmount(Money::zero())
        );
        assert!(Transaction::withdrawal(wallet, money("-5.00")).is_err());
        let err = Transaction::transfer(wallet, Uuid::new_v4(), money("-0.01")).unwrap_err();
        assert_eq!(err.to_string(), "Transaction amount must be positive, got -0.01");
    }
}
