use thiserror::Error;

use crate::domain::{Money, NonPositiveAmount, WalletId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Absent, or present but not owned by the claimed owner. The two cases
    /// are deliberately indistinguishable to callers.
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Insufficient funds in wallet {wallet_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        wallet_id: WalletId,
        balance: Money,
        required: Money,
    },

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Closed set of error kinds callers map to wire-level codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    WalletNotFound,
    InsufficientFunds,
    Storage,
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::WalletNotFound(_) => ErrorKind::WalletNotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Message safe to show to a client. Storage details never leak.
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Storage(_) => "Internal server error".to_string(),
            LedgerError::WalletNotFound(_) => "Wallet not found".to_string(),
            LedgerError::InsufficientFunds { .. } => "Insufficient funds".to_string(),
            LedgerError::Validation(_) => self.to_string(),
        }
    }
}

impl From<NonPositiveAmount> for LedgerError {
    fn from(err: NonPositiveAmount) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            LedgerError::validation("bad").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::WalletNotFound("x".into()).kind(),
            ErrorKind::WalletNotFound
        );
        assert_eq!(
            LedgerError::from(anyhow::anyhow!("disk on fire")).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_client_message_hides_storage_cause() {
        let err = LedgerError::from(anyhow::anyhow!("no such table: wallets"));
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_insufficient_funds_message() {
        let wallet_id = Uuid::nil();
        let err = LedgerError::InsufficientFunds {
            wallet_id,
            balance: "50.00".parse().unwrap(),
            required: "50.01".parse().unwrap(),
        };
        assert_eq!(
            err.to_string(),
            format!(
                "Insufficient funds in wallet {}: balance 50.00, required 50.01",
                wallet_id
            )
        );
        assert_eq!(err.client_message(), "Insufficient funds");
    }

    #[test]
    fn test_non_positive_entry_is_a_validation_error() {
        let err = LedgerError::from(NonPositiveAmount(Money::zero()));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "Validation failed: Transaction amount must be positive, got 0"
        );
    }
}
