//! Prepared-transaction hold/relay (spec §4.4 "Prepared transactions"): a
//! built-but-not-relayed transaction can be held by handle and relayed
//! later, once the caller decides to go through with it.

use super::BuiltTransaction;
use crate::common::config::network::MAX_BLOCK_NUMBER;
use crate::common::{ErrorKind, Result};
use crate::types::SubwalletCollection;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct PreparedTransaction {
	pub handle: u64,
	pub built: BuiltTransaction,
}

/// Holds built transactions by handle until relayed or discarded. Relaying
/// re-checks every input is still unspent; a wallet that spent one of them
/// in the meantime (another prepared transaction relayed first, say) fails
/// the whole hold with `PreparedTransactionExpired` rather than relaying a
/// transaction whose inputs are already gone.
pub struct PreparedTransactionStore {
	next_handle: AtomicU64,
	held: Mutex<HashMap<u64, BuiltTransaction>>,
}

impl Default for PreparedTransactionStore {
	fn default() -> Self {
		Self::new()
	}
}

impl PreparedTransactionStore {
	pub fn new() -> Self {
		PreparedTransactionStore { next_handle: AtomicU64::new(1), held: Mutex::new(HashMap::new()) }
	}

	/// Stashes a built transaction, returning the handle it can later be
	/// relayed or discarded by.
	pub fn hold(&self, built: BuiltTransaction) -> u64 {
		let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
		self.held.lock().insert(handle, built);
		handle
	}

	/// Re-checks every input the held transaction spends is still unspent
	/// and unlocked, then hands the built transaction back to the caller
	/// for submission. The handle is consumed either way: a failed relay
	/// still discards it, since its inputs have already moved (or locked)
	/// and rebuilding is the only path forward (spec §4.4).
	pub fn relay(&self, collection: &SubwalletCollection, handle: u64, current_height: u64, now_unix: u64) -> Result<BuiltTransaction> {
		let built = self.held.lock().remove(&handle).ok_or(ErrorKind::PreparedTransactionNotFound)?;

		for (owner, key_image, _) in &built.inputs {
			let still_unspent_and_unlocked = collection
				.get(owner)
				.and_then(|s| s.unspent().find(|i| i.key_image == *key_image))
				.map(|i| i.is_unlocked(current_height, now_unix, MAX_BLOCK_NUMBER))
				.unwrap_or(false);
			if !still_unspent_and_unlocked {
				return Err(ErrorKind::PreparedTransactionExpired.into());
			}
		}
		Ok(built)
	}

	/// Drops a held transaction without relaying it.
	pub fn discard(&self, handle: u64) {
		self.held.lock().remove(&handle);
	}

	pub fn len(&self) -> usize {
		self.held.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::crypto::{Address, KeyImage, PublicKey};
	use crate::types::{Subwallet, TransactionInput};

	fn built_with_input(owner: PublicKey, key_image: KeyImage) -> BuiltTransaction {
		BuiltTransaction {
			hash: "tx".into(),
			tx_public_key: PublicKey::zero(),
			inputs: vec![(owner, key_image, 1_000)],
			outputs: vec![],
			ring_signatures: vec![],
			fee: 0,
			payment_id: None,
			unlock_time: 0,
			size: 0,
			is_fusion: false,
			change_owner: owner,
		}
	}

	fn input(key_image: KeyImage) -> TransactionInput {
		TransactionInput {
			key_image,
			amount: 1_000,
			block_height: 1,
			tx_public_key: PublicKey::zero(),
			tx_index: 0,
			global_output_index: Some(0),
			output_key: PublicKey::zero(),
			spend_height: 0,
			unlock_time: 0,
			parent_tx_hash: "parent".into(),
			private_ephemeral: None,
		}
	}

	#[test]
	fn relay_succeeds_while_input_is_still_unspent() {
		let owner = PublicKey([1u8; 32]);
		let key_image = KeyImage([2u8; 32]);
		let mut collection = SubwalletCollection::new();
		let mut subwallet = Subwallet::new(owner, None, Address::new(1, owner, PublicKey([3u8; 32])), 0, 0, true);
		subwallet.store_transaction_input(input(key_image), false);
		collection.add_subwallet(subwallet);

		let store = PreparedTransactionStore::new();
		let handle = store.hold(built_with_input(owner, key_image));
		assert!(store.relay(&collection, handle, 0, 0).is_ok());
		assert_eq!(store.len(), 0);
	}

	#[test]
	fn relay_expires_once_the_input_has_moved() {
		let owner = PublicKey([1u8; 32]);
		let key_image = KeyImage([2u8; 32]);
		let mut collection = SubwalletCollection::new();
		let mut subwallet = Subwallet::new(owner, None, Address::new(1, owner, PublicKey([3u8; 32])), 0, 0, true);
		subwallet.store_transaction_input(input(key_image), false);
		collection.add_subwallet(subwallet);

		let store = PreparedTransactionStore::new();
		let handle = store.hold(built_with_input(owner, key_image));

		collection.mark_input_as_locked(&owner, &key_image);
		let err = store.relay(&collection, handle, 0, 0).unwrap_err();
		assert!(matches!(err.downcast_ref::<crate::common::ErrorKind>(), Some(crate::common::ErrorKind::PreparedTransactionExpired)));
	}

	#[test]
	fn relay_expires_once_the_input_is_locked_by_unlock_time() {
		let owner = PublicKey([1u8; 32]);
		let key_image = KeyImage([2u8; 32]);
		let mut collection = SubwalletCollection::new();
		let mut subwallet = Subwallet::new(owner, None, Address::new(1, owner, PublicKey([3u8; 32])), 0, 0, true);
		let mut locked_input = input(key_image);
		locked_input.unlock_time = 1_000;
		subwallet.store_transaction_input(locked_input, false);
		collection.add_subwallet(subwallet);

		let store = PreparedTransactionStore::new();
		let handle = store.hold(built_with_input(owner, key_image));

		let err = store.relay(&collection, handle, 10, 0).unwrap_err();
		assert!(matches!(err.downcast_ref::<crate::common::ErrorKind>(), Some(crate::common::ErrorKind::PreparedTransactionExpired)));
	}

	#[test]
	fn relay_of_unknown_handle_fails() {
		let collection = SubwalletCollection::new();
		let store = PreparedTransactionStore::new();
		assert!(store.relay(&collection, 999, 0, 0).is_err());
	}
}
