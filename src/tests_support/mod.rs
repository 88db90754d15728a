//! Shared test doubles, used by `#[cfg(test)]` unit tests across the crate
//! so each module doesn't redefine its own throwaway `NodeClient` stub.

use crate::common::config::WalletCoreConfig;
use crate::common::Result;
use crate::crypto::{Address, CryptoProvider, DefaultCryptoProvider, PrivateKey, PublicKey};
use crate::node::{FeeInfo, NodeClient, NodeInfo, SyncDataResponse};
use crate::types::{Block, Subwallet};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A `NodeClient` whose responses are set up ahead of time rather than
/// computed, for tests that only care how the caller reacts to them.
pub struct StubNodeClient {
	pub info: NodeInfo,
	pub fee: Option<FeeInfo>,
	pub blocks: Mutex<Vec<Block>>,
	pub random_outputs: HashMap<u64, Vec<(u64, PublicKey)>>,
	pub unrecognized_transactions: Vec<String>,
}

impl Default for StubNodeClient {
	fn default() -> Self {
		StubNodeClient {
			info: NodeInfo { height: 0, network_height: 1, incoming_connections_count: 0, outgoing_connections_count: 0, difficulty: 0, is_cache_api: true },
			fee: None,
			blocks: Mutex::new(Vec::new()),
			random_outputs: HashMap::new(),
			unrecognized_transactions: Vec::new(),
		}
	}
}

#[async_trait]
impl NodeClient for StubNodeClient {
	async fn get_info(&self) -> Result<NodeInfo> {
		Ok(self.info.clone())
	}

	async fn get_fee(&self) -> Result<Option<FeeInfo>> {
		Ok(self.fee.clone())
	}

	async fn get_wallet_sync_data(&self, block_count: u64, _checkpoints: &[(u64, String)], _skip_coinbase: bool, _start_height: u64, _start_timestamp: u64) -> Result<SyncDataResponse> {
		let mut blocks = self.blocks.lock();
		let take = (block_count as usize).min(blocks.len());
		let items: Vec<Block> = blocks.drain(0..take).collect();
		Ok(SyncDataResponse { items, synced: blocks.is_empty(), top_block: None })
	}

	async fn get_global_indexes_for_range(&self, _start_height: u64, _end_height: u64) -> Result<HashMap<String, Vec<u64>>> {
		Ok(HashMap::new())
	}

	async fn get_transactions_status(&self, _transaction_hashes: &[String]) -> Result<Vec<String>> {
		Ok(self.unrecognized_transactions.clone())
	}

	async fn get_random_outputs(&self, amounts: &[u64], _mixin: u64) -> Result<HashMap<u64, Vec<(u64, PublicKey)>>> {
		Ok(amounts.iter().map(|a| (*a, self.random_outputs.get(a).cloned().unwrap_or_default())).collect())
	}

	async fn send_raw_transaction(&self, _tx_hex: &str) -> Result<()> {
		Ok(())
	}
}

/// A fresh keypair plus the `Subwallet`/`Address` built from it, for tests
/// that need a real spendable identity rather than zeroed placeholder keys.
pub fn fresh_subwallet(crypto: &DefaultCryptoProvider, view_private: &PrivateKey, view_public: &PublicKey) -> (Subwallet, PrivateKey) {
	let mut rng = rand::rngs::OsRng;
	let (spend_private, spend_public) = crypto.generate_keypair(&mut rng);
	let address = Address::new(1, spend_public, *view_public);
	(Subwallet::new(spend_public, Some(spend_private.clone()), address, 0, 0, true), spend_private)
}

pub fn default_config() -> WalletCoreConfig {
	WalletCoreConfig::default()
}

pub fn arc_crypto() -> Arc<dyn CryptoProvider> {
	Arc::new(DefaultCryptoProvider::new())
}
