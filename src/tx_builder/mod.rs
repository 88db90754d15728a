//! Builds and submits transactions (spec §4.4): input selection, denomination
//! splitting, mixin decoy selection, fee-per-byte sizing, fusion, and the
//! hold/relay lifecycle for prepared transactions.

pub mod builder;
pub mod decoys;
pub mod prepared;
pub mod selection;
pub mod size;

pub use builder::{BuiltOutput, BuiltTransaction, Destination, FeePolicy, SendArgs, TransactionBuilder};
pub use prepared::{PreparedTransaction, PreparedTransactionStore};
