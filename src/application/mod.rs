// Application layer: the ledger core and its read facade.
// Both are generic over the storage port so they run against SQLite or memory.

mod context;
pub mod error;
mod query;
mod service;
pub mod validation;

pub use context::*;
pub use error::*;
pub use query::*;
pub use service::*;
