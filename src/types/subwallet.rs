//! The per-account input ledger and the collection that owns all of a
//! container's subwallets. This is the state machine in spec §4.3: every
//! input moves `unspent -> locked -> spent`, with fork rewind able to push
//! it back.

use super::input::{TransactionInput, TxHash, UnconfirmedIncomingInput};
use super::transaction::Transaction;
use crate::crypto::{Address, KeyImage, PrivateKey, PublicKey};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subwallet {
	pub public_spend_key: PublicKey,
	pub private_spend_key: Option<PrivateKey>,
	pub address: Address,
	pub sync_start_height: u64,
	pub sync_start_timestamp: u64,
	pub is_primary: bool,

	unspent: HashMap<KeyImage, TransactionInput>,
	locked: HashMap<KeyImage, TransactionInput>,
	spent: HashMap<KeyImage, TransactionInput>,
	unconfirmed_incoming: Vec<UnconfirmedIncomingInput>,
}

impl Subwallet {
	pub fn new(public_spend_key: PublicKey, private_spend_key: Option<PrivateKey>, address: Address, sync_start_height: u64, sync_start_timestamp: u64, is_primary: bool) -> Self {
		Subwallet {
			public_spend_key,
			private_spend_key,
			address,
			sync_start_height,
			sync_start_timestamp,
			is_primary,
			unspent: HashMap::new(),
			locked: HashMap::new(),
			spent: HashMap::new(),
			unconfirmed_incoming: Vec::new(),
		}
	}

	pub fn is_view_only(&self) -> bool {
		self.private_spend_key.is_none()
	}

	pub fn unspent(&self) -> impl Iterator<Item = &TransactionInput> {
		self.unspent.values()
	}
	pub fn locked(&self) -> impl Iterator<Item = &TransactionInput> {
		self.locked.values()
	}
	pub fn spent(&self) -> impl Iterator<Item = &TransactionInput> {
		self.spent.values()
	}
	pub fn unconfirmed_incoming(&self) -> &[UnconfirmedIncomingInput] {
		&self.unconfirmed_incoming
	}

	fn contains_key_image(&self, key_image: &KeyImage) -> bool {
		self.unspent.contains_key(key_image) || self.locked.contains_key(key_image) || self.spent.contains_key(key_image)
	}

	/// Adds a newly detected output. If it matches pending self-sent change
	/// (by output key) that unconfirmed entry is dropped first. Duplicate
	/// key images are logged and ignored rather than overwriting state.
	pub fn store_transaction_input(&mut self, input: TransactionInput, is_view_wallet: bool) {
		if !is_view_wallet {
			self.unconfirmed_incoming.retain(|u| u.output_key != input.output_key);
		}
		if self.contains_key_image(&input.key_image) {
			error!("duplicate key image {} stored into subwallet, ignoring", input.key_image);
			return;
		}
		self.unspent.insert(input.key_image, input);
	}

	pub fn add_unconfirmed_incoming(&mut self, input: UnconfirmedIncomingInput) {
		self.unconfirmed_incoming.push(input);
	}

	pub fn mark_input_as_spent(&mut self, key_image: &KeyImage, height: u64) {
		let mut input = match self.unspent.remove(key_image) {
			Some(i) => i,
			None => match self.locked.remove(key_image) {
				Some(i) => i,
				None => {
					error!("mark_input_as_spent: key image {} not found in unspent or locked", key_image);
					return;
				}
			},
		};
		input.spend_height = height;
		self.spent.insert(*key_image, input);
	}

	pub fn mark_input_as_locked(&mut self, key_image: &KeyImage) {
		if let Some(input) = self.unspent.remove(key_image) {
			self.locked.insert(*key_image, input);
		} else {
			error!("mark_input_as_locked: key image {} not found in unspent", key_image);
		}
	}

	/// Returns every input whose parent was `tx_hash` back to `unspent`,
	/// and drops matching unconfirmed-incoming entries.
	pub fn remove_cancelled_transaction(&mut self, tx_hash: &str) {
		let returning: Vec<KeyImage> = self
			.locked
			.iter()
			.filter(|(_, input)| input.parent_tx_hash == tx_hash)
			.map(|(k, _)| *k)
			.collect();
		for key_image in returning {
			if let Some(mut input) = self.locked.remove(&key_image) {
				input.spend_height = 0;
				self.unspent.insert(key_image, input);
			}
		}
		self.unconfirmed_incoming.retain(|u| u.parent_tx_hash != tx_hash);
	}

	/// Rewinds this subwallet to before `fork_height`. Drops every
	/// unconfirmed-incoming entry (tied to transactions that may no longer
	/// exist), drops every input created at or after the fork, and returns
	/// to `unspent` any input spent at or after the fork but created before
	/// it. Returns the key images that were dropped entirely, so the
	/// collection's derived index can be kept consistent.
	pub fn remove_forked_transactions(&mut self, fork_height: u64) -> Vec<KeyImage> {
		self.unconfirmed_incoming.clear();
		let mut removed = Vec::new();

		for map in [&mut self.unspent, &mut self.locked] {
			let stale: Vec<KeyImage> = map.iter().filter(|(_, i)| i.block_height >= fork_height).map(|(k, _)| *k).collect();
			for key_image in stale {
				map.remove(&key_image);
				removed.push(key_image);
			}
		}

		let mut reinstated = Vec::new();
		let stale_spent: Vec<KeyImage> = self.spent.iter().filter(|(_, i)| i.block_height >= fork_height).map(|(k, _)| *k).collect();
		for key_image in stale_spent {
			self.spent.remove(&key_image);
			removed.push(key_image);
		}
		let rewound_spent: Vec<KeyImage> = self.spent.iter().filter(|(_, i)| i.spend_height >= fork_height).map(|(k, _)| *k).collect();
		for key_image in rewound_spent {
			if let Some(mut input) = self.spent.remove(&key_image) {
				input.spend_height = 0;
				reinstated.push((key_image, input));
			}
		}
		for (key_image, input) in reinstated {
			self.unspent.insert(key_image, input);
		}

		removed
	}

	pub fn prune_spent_inputs(&mut self, cutoff: u64) {
		self.spent.retain(|_, input| input.spend_height >= cutoff);
	}

	pub fn reset(&mut self, height: u64, timestamp: u64) {
		self.unspent.clear();
		self.locked.clear();
		self.spent.clear();
		self.unconfirmed_incoming.clear();
		self.sync_start_height = height;
		self.sync_start_timestamp = timestamp;
	}

	/// `(unlocked, locked)` balance as of `current_height`/`now_unix`.
	pub fn balance(&self, current_height: u64, now_unix: u64, max_block_number: u64) -> (u64, u64) {
		let mut unlocked = 0u64;
		let mut locked = 0u64;
		for input in self.unspent.values() {
			if input.is_unlocked(current_height, now_unix, max_block_number) {
				unlocked = unlocked.saturating_add(input.amount);
			} else {
				locked = locked.saturating_add(input.amount);
			}
		}
		for input in self.locked.values() {
			locked = locked.saturating_add(input.amount);
		}
		for pending in &self.unconfirmed_incoming {
			locked = locked.saturating_add(pending.amount);
		}
		(unlocked, locked)
	}

	pub fn all_key_images(&self) -> Vec<KeyImage> {
		self.unspent.keys().chain(self.locked.keys()).chain(self.spent.keys()).copied().collect()
	}

	/// The first successful sync batch after a timestamp-based start
	/// replaces the start timestamp with the batch's first block height
	/// (spec §4.2 "fetch"); per-subwallet timestamps are transient and
	/// collapse the same way.
	pub fn collapse_start_timestamp_to_height(&mut self, height: u64) {
		if self.sync_start_timestamp != 0 {
			self.sync_start_height = height;
			self.sync_start_timestamp = 0;
		}
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SubwalletCollection {
	subwallets: HashMap<PublicKey, Subwallet>,
	public_spend_keys: Vec<PublicKey>,
	pub transactions: Vec<Transaction>,
	pub locked_transactions: Vec<Transaction>,
	pub tx_private_keys: HashMap<TxHash, PrivateKey>,
	#[serde(skip)]
	key_image_owners: HashMap<KeyImage, PublicKey>,
}

impl SubwalletCollection {
	pub fn new() -> Self {
		SubwalletCollection::default()
	}

	pub fn add_subwallet(&mut self, subwallet: Subwallet) {
		let key = subwallet.public_spend_key;
		self.public_spend_keys.push(key);
		self.subwallets.insert(key, subwallet);
	}

	pub fn remove_subwallet(&mut self, public_spend_key: &PublicKey) -> crate::common::Result<()> {
		let is_primary = self.subwallets.get(public_spend_key).map(|s| s.is_primary).unwrap_or(false);
		if is_primary {
			return Err(crate::common::ErrorKind::CannotDeletePrimarySubwallet.into());
		}
		self.subwallets.remove(public_spend_key);
		self.public_spend_keys.retain(|k| k != public_spend_key);
		self.key_image_owners.retain(|_, owner| owner != public_spend_key);
		Ok(())
	}

	pub fn get(&self, public_spend_key: &PublicKey) -> Option<&Subwallet> {
		self.subwallets.get(public_spend_key)
	}
	pub fn get_mut(&mut self, public_spend_key: &PublicKey) -> Option<&mut Subwallet> {
		self.subwallets.get_mut(public_spend_key)
	}
	pub fn public_spend_keys(&self) -> &[PublicKey] {
		&self.public_spend_keys
	}
	pub fn subwallets(&self) -> impl Iterator<Item = &Subwallet> {
		self.subwallets.values()
	}
	pub fn subwallets_mut(&mut self) -> impl Iterator<Item = &mut Subwallet> {
		self.subwallets.values_mut()
	}

	pub fn is_view_wallet(&self) -> bool {
		self.subwallets.values().all(|s| s.is_view_only())
	}

	pub fn key_image_owner(&self, key_image: &KeyImage) -> Option<&PublicKey> {
		self.key_image_owners.get(key_image)
	}

	/// Called once at container restore, per spec §9's design note: the
	/// index is a derived cache and is never persisted.
	pub fn rebuild_key_image_index(&mut self) {
		self.key_image_owners.clear();
		for subwallet in self.subwallets.values() {
			for key_image in subwallet.all_key_images() {
				self.key_image_owners.insert(key_image, subwallet.public_spend_key);
			}
		}
	}

	pub fn store_transaction_input(&mut self, owner: &PublicKey, input: TransactionInput) {
		let key_image = input.key_image;
		let is_view_wallet = self.is_view_wallet();
		if let Some(subwallet) = self.subwallets.get_mut(owner) {
			subwallet.store_transaction_input(input, is_view_wallet);
			self.key_image_owners.insert(key_image, *owner);
		} else {
			warn!("store_transaction_input: unknown subwallet {}", owner);
		}
	}

	pub fn mark_input_as_spent(&mut self, key_image: &KeyImage, height: u64) {
		let owner = match self.key_image_owners.get(key_image) {
			Some(o) => *o,
			None => {
				error!("mark_input_as_spent: no owner for key image {}", key_image);
				return;
			}
		};
		if let Some(subwallet) = self.subwallets.get_mut(&owner) {
			subwallet.mark_input_as_spent(key_image, height);
		}
	}

	pub fn mark_input_as_locked(&mut self, owner: &PublicKey, key_image: &KeyImage) {
		if let Some(subwallet) = self.subwallets.get_mut(owner) {
			subwallet.mark_input_as_locked(key_image);
		}
	}

	pub fn remove_cancelled_transaction(&mut self, tx_hash: &str) {
		for subwallet in self.subwallets.values_mut() {
			subwallet.remove_cancelled_transaction(tx_hash);
		}
		self.locked_transactions.retain(|tx| tx.hash != tx_hash);
	}

	/// Rewinds every subwallet past `fork_height` and the confirmed
	/// transaction list with it, keeping `key_image_owners` consistent.
	/// This is the "only inputs spent after the fork get reset" semantics
	/// (see the grounding ledger for why, and the open question it
	/// resolves).
	pub fn remove_forked_transactions(&mut self, fork_height: u64) {
		let mut removed = Vec::new();
		for subwallet in self.subwallets.values_mut() {
			removed.extend(subwallet.remove_forked_transactions(fork_height));
		}
		for key_image in removed {
			self.key_image_owners.remove(&key_image);
		}
		self.transactions.retain(|tx| tx.block_height < fork_height);
	}

	/// Appends a newly confirmed transaction and drops any matching locked
	/// (unconfirmed outgoing) entry, keeping the two lists disjoint by hash.
	pub fn record_confirmed_transaction(&mut self, tx: Transaction) {
		self.locked_transactions.retain(|t| t.hash != tx.hash);
		self.transactions.push(tx);
	}

	pub fn record_locked_transaction(&mut self, tx: Transaction) {
		self.locked_transactions.push(tx);
	}

	pub fn balance(&self, current_height: u64, now_unix: u64, max_block_number: u64) -> (u64, u64) {
		let mut unlocked = 0u64;
		let mut locked = 0u64;
		for subwallet in self.subwallets.values() {
			let (u, l) = subwallet.balance(current_height, now_unix, max_block_number);
			unlocked = unlocked.saturating_add(u);
			locked = locked.saturating_add(l);
		}
		(unlocked, locked)
	}

	/// Thin wrapper over [`Subwallet::reset`] that also drops this
	/// subwallet's stale entries from the derived key-image index, so a
	/// caller can re-sync one subwallet without rebuilding the whole
	/// container (spec §3 "Lifecycle" implies per-subwallet restart but
	/// doesn't name the operation).
	pub fn rescan_subwallet_from(&mut self, public_spend_key: &PublicKey, height: u64, timestamp: u64) {
		if let Some(subwallet) = self.subwallets.get_mut(public_spend_key) {
			let stale = subwallet.all_key_images();
			subwallet.reset(height, timestamp);
			for key_image in stale {
				self.key_image_owners.remove(&key_image);
			}
		}
	}

	pub fn collapse_start_timestamps_to_height(&mut self, height: u64) {
		for subwallet in self.subwallets.values_mut() {
			subwallet.collapse_start_timestamp_to_height(height);
		}
	}
}
