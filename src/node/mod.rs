//! The node RPC transport is an external collaborator (spec §1): this
//! module models it as an `async` trait with one concrete `reqwest`-backed
//! implementation, so the synchronizer and transaction builder never touch
//! HTTP directly.

pub mod http;
pub mod types;

pub use http::HttpNodeClient;
pub use types::{FeeInfo, NodeInfo, SyncDataResponse};

use crate::common::Result;
use crate::crypto::PublicKey;
use crate::types::Block;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait NodeClient: Send + Sync {
	async fn get_info(&self) -> Result<NodeInfo>;
	async fn get_fee(&self) -> Result<Option<FeeInfo>>;

	async fn get_wallet_sync_data(
		&self,
		block_count: u64,
		block_hash_checkpoints: &[(u64, String)],
		skip_coinbase_transactions: bool,
		start_height: u64,
		start_timestamp: u64,
	) -> Result<SyncDataResponse>;

	async fn get_global_indexes_for_range(&self, start_height: u64, end_height: u64) -> Result<HashMap<String, Vec<u64>>>;

	/// Returns the subset of `transaction_hashes` the node does not
	/// recognize (neither mempool nor a block).
	async fn get_transactions_status(&self, transaction_hashes: &[String]) -> Result<Vec<String>>;

	/// Per-amount decoy outputs: `amount -> [(global_index, output_key)]`.
	async fn get_random_outputs(&self, amounts: &[u64], mixin: u64) -> Result<HashMap<u64, Vec<(u64, PublicKey)>>>;

	async fn send_raw_transaction(&self, tx_hex: &str) -> Result<()>;
}

/// A block as returned to the synchronizer; re-exported here since `Block`
/// already lives in [`crate::types`] and the trait above only needs the
/// name in scope for its doc comments.
pub type FetchedBlock = Block;
