pub mod money;
pub mod provider;
pub mod transaction;

pub use money::Money;
pub use provider::{Intent, Provider};
pub use transaction::{Counterpart, ParsedTransaction, TransactionId, TransactionKind};
