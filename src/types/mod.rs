//! The wallet's in-memory data model: inputs, subwallets, the collection
//! that owns them, and the wallet-facing view of a transaction. Everything
//! here is plain data plus the state-machine operations the synchronizer
//! and transaction builder drive; no I/O happens in this module.

pub mod block;
pub mod input;
pub mod subwallet;
pub mod transaction;

pub use block::{Block, BlockTransaction, KeyInput, KeyOutput};
pub use input::{TransactionInput, UnconfirmedIncomingInput};
pub use subwallet::{Subwallet, SubwalletCollection};
pub use transaction::Transaction;
