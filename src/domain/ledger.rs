use super::{Money, Transaction, WalletId};

/// Compute the balance for a single wallet from its history.
/// Deposits and incoming transfers add, withdrawals and outgoing transfers subtract.
pub fn compute_balance(wallet_id: WalletId, transactions: &[Transaction]) -> Money {
    transactions
        .iter()
        .map(|tx| tx.signed_amount_for(wallet_id))
        .sum()
}

/// Order in which a transfer must acquire its two row locks.
///
/// Locks are always taken by ascending wallet id, independent of which side is
/// the source, so two transfers moving money in opposite directions between the
/// same pair of wallets can never wait on each other in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOrder {
    SourceFirst,
    DestinationFirst,
}

pub fn lock_order(source: WalletId, destination: WalletId) -> LockOrder {
    if source <= destination {
        LockOrder::SourceFirst
    } else {
        LockOrder::DestinationFirst
    }
}
