//! Block fetcher + output-detection pipeline. Owns a bounded in-order
//! buffer of fetched-but-unprocessed blocks; `fetch` and `process` are
//! meant to be driven by the scheduler's sync tick (spec §5).

use super::status::SynchronizationStatus;
use crate::common::config::network::{FETCH_EVERY_N_PROCESSED_BLOCKS, GLOBAL_INDEX_OBSCURITY_RADIUS, SPENT_PRUNE_DEPTH};
use crate::common::config::WalletCoreConfig;
use crate::common::{ErrorKind, Result};
use crate::crypto::{CryptoProvider, KeyImage, PrivateKey, PublicKey};
use crate::node::NodeClient;
use crate::types::{Block, BlockTransaction, SubwalletCollection, Transaction, TransactionInput};
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// The output-detection extension hook (spec §9 "extension hook for output
/// scanning"): given one transaction, return every output it contains that
/// belongs to one of our subwallets.
pub trait OutputScanner: Send + Sync {
	fn scan_transaction(
		&self,
		tx: &BlockTransaction,
		block_height: u64,
		private_view_key: &PrivateKey,
		subwallets: &[(PublicKey, Option<PrivateKey>)],
	) -> Result<Vec<(PublicKey, TransactionInput)>>;
}

pub struct DefaultOutputScanner {
	crypto: Arc<dyn CryptoProvider>,
}

impl DefaultOutputScanner {
	pub fn new(crypto: Arc<dyn CryptoProvider>) -> Self {
		DefaultOutputScanner { crypto }
	}
}

impl OutputScanner for DefaultOutputScanner {
	fn scan_transaction(
		&self,
		tx: &BlockTransaction,
		block_height: u64,
		private_view_key: &PrivateKey,
		subwallets: &[(PublicKey, Option<PrivateKey>)],
	) -> Result<Vec<(PublicKey, TransactionInput)>> {
		let spend_keys: Vec<PublicKey> = subwallets.iter().map(|(pk, _)| *pk).collect();
		let mut found = Vec::new();
		for (index, output) in tx.key_outputs.iter().enumerate() {
			let matched = self.crypto.derive_output_ownership(&tx.tx_public_key, private_view_key, index as u64, &output.key, &spend_keys)?;
			let owner_index = match matched {
				Some(i) => i,
				None => continue,
			};
			let (owner, private_spend_key) = &subwallets[owner_index];
			let owner = *owner;
			let private_spend_key = private_spend_key.clone();
			let key_image = match private_spend_key {
				Some(sk) => self.crypto.generate_key_image(&sk, &tx.tx_public_key, private_view_key, index as u64)?,
				None => KeyImage::zero(),
			};
			found.push((
				owner,
				TransactionInput {
					key_image,
					amount: output.amount,
					block_height,
					tx_public_key: tx.tx_public_key,
					tx_index: index as u64,
					global_output_index: output.global_index,
					output_key: output.key,
					spend_height: 0,
					unlock_time: tx.unlock_time,
					parent_tx_hash: tx.hash.clone(),
					private_ephemeral: None,
				},
			));
		}
		Ok(found)
	}
}

pub struct Synchronizer {
	node: Arc<dyn NodeClient>,
	scanner: Box<dyn OutputScanner>,
	config: WalletCoreConfig,
	collection: Arc<Mutex<SubwalletCollection>>,
	status: Arc<Mutex<SynchronizationStatus>>,
	private_view_key: PrivateKey,

	buffer: Mutex<VecDeque<Block>>,
	start_height: Mutex<u64>,
	start_timestamp: Mutex<u64>,
	fetch_in_flight: AtomicBool,
	current_batch_size: AtomicU64,
	consecutive_fetch_failures: AtomicU64,
	blocks_processed: AtomicU64,
}

impl Synchronizer {
	pub fn new(
		node: Arc<dyn NodeClient>,
		crypto: Arc<dyn CryptoProvider>,
		config: WalletCoreConfig,
		collection: Arc<Mutex<SubwalletCollection>>,
		status: Arc<Mutex<SynchronizationStatus>>,
		private_view_key: PrivateKey,
		start_height: u64,
		start_timestamp: u64,
	) -> Self {
		let batch_size = config.blocks_per_daemon_request;
		Synchronizer {
			node,
			scanner: Box::new(DefaultOutputScanner::new(crypto)),
			config,
			collection,
			status,
			private_view_key,
			buffer: Mutex::new(VecDeque::new()),
			start_height: Mutex::new(start_height),
			start_timestamp: Mutex::new(start_timestamp),
			fetch_in_flight: AtomicBool::new(false),
			current_batch_size: AtomicU64::new(batch_size),
			consecutive_fetch_failures: AtomicU64::new(0),
			blocks_processed: AtomicU64::new(0),
		}
	}

	/// A very rough per-block footprint estimate — real byte counts would
	/// require the wire-serialized size, which this core never computes for
	/// inbound blocks. Good enough to bound the backlog.
	fn estimate_buffer_footprint(&self) -> u64 {
		const ASSUMED_BYTES_PER_BLOCK: u64 = 2_048;
		self.buffer.lock().len() as u64 * ASSUMED_BYTES_PER_BLOCK
	}

	/// At most one fetch in flight; additional attempts are silent no-ops.
	pub async fn fetch(&self) -> Result<()> {
		if self.fetch_in_flight.swap(true, Ordering::AcqRel) {
			return Ok(());
		}
		let result = self.fetch_inner().await;
		self.fetch_in_flight.store(false, Ordering::Release);
		result
	}

	async fn fetch_inner(&self) -> Result<()> {
		let info = self.node.get_info().await?;
		let wallet_height = self.status.lock().last_known_block_height();
		if info.height < wallet_height {
			// node is lagging behind us; never sync backwards against it
			return Ok(());
		}

		let footprint = self.estimate_buffer_footprint();
		if footprint + self.config.max_body_response_size >= self.config.block_store_memory_limit {
			debug!("sync backpressure: buffer footprint {} bytes, skipping fetch", footprint);
			return Ok(());
		}

		let checkpoints = self.status.lock().get_processed_checkpoints();
		let start_height = *self.start_height.lock();
		let start_timestamp = *self.start_timestamp.lock();
		let batch_size = self.current_batch_size.load(Ordering::Relaxed);

		let response = self.node.get_wallet_sync_data(batch_size, &checkpoints, !self.config.scan_coinbase_transactions, start_height, start_timestamp).await;

		let data = match response {
			Ok(data) => data,
			Err(e) => {
				self.on_fetch_failure();
				return Err(e);
			}
		};
		self.on_fetch_success();

		if data.items.is_empty() {
			return Ok(());
		}

		if checkpoints.is_empty() {
			let first_height = data.items[0].block_height;
			if start_timestamp == 0 {
				if first_height != start_height {
					return Err(ErrorKind::Generic(format!("unexpected height: expected {}, got {}", start_height, first_height)).into());
				}
			} else {
				*self.start_height.lock() = first_height;
				*self.start_timestamp.lock() = 0;
				self.collection.lock().collapse_start_timestamps_to_height(first_height);
			}
		}

		let mut buffer = self.buffer.lock();
		buffer.extend(data.items);
		Ok(())
	}

	fn on_fetch_failure(&self) {
		self.consecutive_fetch_failures.fetch_add(1, Ordering::Relaxed);
		let current = self.current_batch_size.load(Ordering::Relaxed);
		let halved = (current / 2).max(1);
		self.current_batch_size.store(halved, Ordering::Relaxed);
	}

	fn on_fetch_success(&self) {
		self.consecutive_fetch_failures.store(0, Ordering::Relaxed);
		let default = self.config.blocks_per_daemon_request;
		let current = self.current_batch_size.load(Ordering::Relaxed);
		if current < default {
			self.current_batch_size.store((current * 2).min(default), Ordering::Relaxed);
		}
	}

	/// Drains up to `blocks_per_tick` buffered blocks. Returns whether an
	/// opportunistic fetch is due (every `FETCH_EVERY_N_PROCESSED_BLOCKS`
	/// processed blocks).
	pub async fn process(&self) -> Result<bool> {
		let mut processed_this_tick = 0u64;
		let mut fetch_due = false;

		while processed_this_tick < self.config.blocks_per_tick {
			let block = {
				let mut buffer = self.buffer.lock();
				buffer.pop_front()
			};
			let block = match block {
				Some(b) => b,
				None => break,
			};

			self.process_block(block).await?;
			processed_this_tick += 1;
			let total = self.blocks_processed.fetch_add(1, Ordering::Relaxed) + 1;
			if total % FETCH_EVERY_N_PROCESSED_BLOCKS == 0 {
				fetch_due = true;
			}
		}
		Ok(fetch_due)
	}

	async fn process_block(&self, block: Block) -> Result<()> {
		let wallet_height = self.status.lock().last_known_block_height();
		if wallet_height > 0 && block.block_height <= wallet_height {
			warn!("fork detected at height {}, rewinding", block.block_height);
			self.collection.lock().remove_forked_transactions(block.block_height);
		}

		if self.blocks_processed.load(Ordering::Relaxed) > 0 && self.blocks_processed.load(Ordering::Relaxed) % SPENT_PRUNE_DEPTH == 0 {
			let cutoff = block.block_height.saturating_sub(SPENT_PRUNE_DEPTH);
			let mut collection = self.collection.lock();
			for subwallet in collection.subwallets_mut() {
				subwallet.prune_spent_inputs(cutoff);
			}
		}

		let subwallets: Vec<(PublicKey, Option<PrivateKey>)> = {
			let collection = self.collection.lock();
			collection.subwallets().map(|s| (s.public_spend_key, s.private_spend_key.clone())).collect()
		};

		let txs = block.all_transactions();
		let mut global_index_fills: HashMap<String, Vec<u64>> = HashMap::new();
		let mut needs_global_index_fill = false;
		for tx in &txs {
			if tx.key_outputs.iter().any(|o| o.global_index.is_none()) {
				needs_global_index_fill = true;
			}
		}
		if needs_global_index_fill {
			let start = block.block_height.saturating_sub(GLOBAL_INDEX_OBSCURITY_RADIUS);
			let end = block.block_height + GLOBAL_INDEX_OBSCURITY_RADIUS;
			global_index_fills = self.node.get_global_indexes_for_range(start, end).await?;
		}

		for tx in txs {
			let mut owned = self.scanner.scan_transaction(tx, block.block_height, &self.private_view_key, &subwallets)?;

			if needs_global_index_fill {
				for (_, input) in owned.iter_mut() {
					if input.global_output_index.is_none() {
						let indexes = global_index_fills
							.get(&tx.hash)
							.ok_or_else(|| ErrorKind::MissingGlobalIndex(tx.hash.clone()))?;
						let idx = indexes.get(input.tx_index as usize).copied().ok_or_else(|| ErrorKind::MissingGlobalIndex(tx.hash.clone()))?;
						input.global_output_index = Some(idx);
					}
				}
			}

			let mut transfers: HashMap<PublicKey, i64> = HashMap::new();
			for (owner, input) in &owned {
				*transfers.entry(*owner).or_insert(0) += input.amount as i64;
			}
			{
				let mut collection = self.collection.lock();
				for (owner, input) in owned.drain(..) {
					collection.store_transaction_input(&owner, input);
				}
			}

			let mut input_total = 0u64;
			let output_total: u64 = tx.key_outputs.iter().map(|o| o.amount).sum();
			if let Some(key_inputs) = &tx.key_inputs {
				let mut collection = self.collection.lock();
				for key_input in key_inputs {
					input_total += key_input.amount;
					if let Some(owner) = collection.key_image_owner(&key_input.key_image).copied() {
						*transfers.entry(owner).or_insert(0) -= key_input.amount as i64;
						collection.mark_input_as_spent(&key_input.key_image, block.block_height);
					}
				}
			}

			if !transfers.is_empty() {
				let fee = if tx.is_coinbase() { 0 } else { input_total.saturating_sub(output_total) };
				let confirmed = Transaction {
					transfers,
					hash: tx.hash.clone(),
					fee,
					block_height: block.block_height,
					timestamp: block.block_timestamp,
					payment_id: tx.payment_id.clone(),
					unlock_time: tx.unlock_time,
					is_coinbase: tx.is_coinbase(),
				};
				self.collection.lock().record_confirmed_transaction(confirmed);
			}
		}

		self.status.lock().store_block_hash(block.block_height, block.block_hash.clone())?;
		Ok(())
	}

	/// Asks the node which of our locked (unconfirmed outgoing) transaction
	/// hashes it no longer knows about, and returns their inputs to
	/// `unspent`.
	pub async fn find_cancelled(&self) -> Result<()> {
		let hashes: Vec<String> = {
			let collection = self.collection.lock();
			collection.locked_transactions.iter().map(|t| t.hash.clone()).collect()
		};
		if hashes.is_empty() {
			return Ok(());
		}
		let unknown = self.node.get_transactions_status(&hashes).await?;
		if unknown.is_empty() {
			return Ok(());
		}
		let mut collection = self.collection.lock();
		for hash in unknown {
			collection.remove_cancelled_transaction(&hash);
		}
		Ok(())
	}

	pub fn buffered_block_count(&self) -> usize {
		self.buffer.lock().len()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::crypto::{Address, DefaultCryptoProvider};
	use crate::node::{FeeInfo, NodeInfo, SyncDataResponse};
	use crate::types::{KeyInput, KeyOutput, Subwallet};
	use async_trait::async_trait;
	use std::collections::HashMap;

	struct StubNodeClient {
		height: u64,
		blocks: Mutex<Vec<Block>>,
	}

	#[async_trait]
	impl NodeClient for StubNodeClient {
		async fn get_info(&self) -> Result<NodeInfo> {
			Ok(NodeInfo { height: self.height, network_height: self.height + 1, incoming_connections_count: 0, outgoing_connections_count: 0, difficulty: 0, is_cache_api: true })
		}
		async fn get_fee(&self) -> Result<Option<FeeInfo>> {
			Ok(None)
		}
		async fn get_wallet_sync_data(&self, block_count: u64, _checkpoints: &[(u64, String)], _skip_coinbase: bool, _start_height: u64, _start_timestamp: u64) -> Result<SyncDataResponse> {
			let mut blocks = self.blocks.lock();
			let take = (block_count as usize).min(blocks.len());
			let items: Vec<Block> = blocks.drain(0..take).collect();
			Ok(SyncDataResponse { items, synced: blocks.is_empty(), top_block: None })
		}
		async fn get_global_indexes_for_range(&self, _start: u64, _end: u64) -> Result<HashMap<String, Vec<u64>>> {
			Ok(HashMap::new())
		}
		async fn get_transactions_status(&self, _hashes: &[String]) -> Result<Vec<String>> {
			Ok(Vec::new())
		}
		async fn get_random_outputs(&self, _amounts: &[u64], _mixin: u64) -> Result<HashMap<u64, Vec<(u64, PublicKey)>>> {
			Ok(HashMap::new())
		}
		async fn send_raw_transaction(&self, _tx_hex: &str) -> Result<()> {
			Ok(())
		}
	}

	fn make_subwallet(crypto: &DefaultCryptoProvider, view_priv: &PrivateKey) -> (Subwallet, PrivateKey) {
		let mut rng = rand::rngs::OsRng;
		let (spend_priv, spend_pub) = crypto.generate_keypair(&mut rng);
		let view_pub = crypto.public_from_private(view_priv).unwrap();
		let address = Address::new(1, spend_pub, view_pub);
		(Subwallet::new(spend_pub, Some(spend_priv.clone()), address, 0, 0, true), spend_priv)
	}

	#[tokio::test]
	async fn fetch_then_process_detects_owned_output() {
		let crypto = Arc::new(DefaultCryptoProvider::new());
		let mut rng = rand::rngs::OsRng;
		let (view_priv, view_pub) = crypto.generate_keypair(&mut rng);
		let (mut subwallet, spend_priv) = make_subwallet(&crypto, &view_priv);
		let spend_pub = subwallet.public_spend_key;
		subwallet.address = Address::new(1, spend_pub, view_pub);

		let (tx_priv, tx_pub) = crypto.generate_keypair(&mut rng);
		let output_key = crypto.derive_stealth_output(&tx_priv, &view_pub, &spend_pub, 0).unwrap();

		let tx = BlockTransaction {
			hash: "tx1".into(),
			tx_public_key: tx_pub,
			unlock_time: 0,
			key_outputs: vec![KeyOutput { key: output_key, amount: 500, global_index: Some(1) }],
			key_inputs: Some(vec![]),
			payment_id: None,
		};
		let block = Block { block_height: 1, block_hash: "h1".into(), block_timestamp: 0, coinbase_transaction: None, transactions: vec![tx] };

		let node = Arc::new(StubNodeClient { height: 1, blocks: Mutex::new(vec![block]) });
		let collection = Arc::new(Mutex::new(SubwalletCollection::new()));
		collection.lock().add_subwallet(subwallet);
		let status = Arc::new(Mutex::new(SynchronizationStatus::new()));

		let synchronizer = Synchronizer::new(node, crypto.clone(), WalletCoreConfig::default(), collection.clone(), status.clone(), view_priv, 1, 0);
		synchronizer.fetch().await.unwrap();
		synchronizer.process().await.unwrap();

		let locked_collection = collection.lock();
		let sub = locked_collection.get(&spend_pub).unwrap();
		assert_eq!(sub.unspent().count(), 1);
		assert_eq!(sub.unspent().next().unwrap().amount, 500);
		assert_eq!(locked_collection.transactions.len(), 1);
		let _ = spend_priv;
	}

	#[tokio::test]
	async fn fetch_is_a_no_op_when_node_lags_behind_wallet() {
		let crypto = Arc::new(DefaultCryptoProvider::new());
		let mut rng = rand::rngs::OsRng;
		let (view_priv, _view_pub) = crypto.generate_keypair(&mut rng);
		let node = Arc::new(StubNodeClient { height: 5, blocks: Mutex::new(vec![]) });
		let collection = Arc::new(Mutex::new(SubwalletCollection::new()));
		let status = Arc::new(Mutex::new(SynchronizationStatus::new()));
		status.lock().store_block_hash(10, "h10".into()).unwrap();

		let synchronizer = Synchronizer::new(node, crypto, WalletCoreConfig::default(), collection, status, view_priv, 10, 0);
		synchronizer.fetch().await.unwrap();
		assert_eq!(synchronizer.buffered_block_count(), 0);
	}

	#[test]
	fn key_input_type_is_constructible() {
		let _ = KeyInput { key_image: KeyImage::zero(), amount: 0, output_indexes: vec![] };
	}
}
