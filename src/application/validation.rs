//! Input validation for the ledger boundary. Nothing here touches the store.

use uuid::Uuid;

use crate::domain::Money;

use super::{LedgerError, LedgerResult};

/// Parse an identifier supplied as a string. `field` names it in the error.
pub fn parse_id(field: &str, raw: &str) -> LedgerResult<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LedgerError::validation(format!("{} cannot be empty", field)));
    }
    Uuid::parse_str(raw)
        .map_err(|_| LedgerError::validation(format!("{} is not a valid identifier: {}", field, raw)))
}

/// Parse a decimal amount string. Sign is checked separately by
/// [`validate_positive_amount`].
pub fn parse_amount(raw: &str) -> LedgerResult<Money> {
    raw.parse()
        .map_err(|e| LedgerError::validation(format!("{}", e)))
}

pub fn validate_positive_amount(amount: &Money) -> LedgerResult<()> {
    if !amount.is_positive() {
        return Err(LedgerError::validation(format!(
            "Amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

pub fn validate_wallet_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::validation("Wallet name cannot be empty"));
    }
    if name.len() > 100 {
        return Err(LedgerError::validation(
            "Wallet name cannot exceed 100 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::application::ErrorKind;

    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("wallet id", &id.to_string()).unwrap(), id);
        assert_eq!(
            parse_id("wallet id", &format!(" {} ", id)).unwrap(),
            id
        );
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        let err = parse_id("wallet id", "not-a-uuid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("wallet id"));

        let err = parse_id("owner id", "").unwrap_err();
        assert!(err.to_string().contains("owner id cannot be empty"));
    }

    #[test]
    fn test_amount_checks() {
        assert!(validate_positive_amount(&parse_amount("0.01").unwrap()).is_ok());
        assert!(validate_positive_amount(&parse_amount("0").unwrap()).is_err());
        assert!(validate_positive_amount(&parse_amount("-5.00").unwrap()).is_err());
        assert_eq!(
            parse_amount("five").unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_wallet_name() {
        assert!(validate_wallet_name("Savings").is_ok());
        assert!(validate_wallet_name("   ").is_err());
        assert!(validate_wallet_name(&"x".repeat(101)).is_err());
    }
}
