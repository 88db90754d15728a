//! End-to-end: a stub node hands the synchronizer one block containing a
//! real stealth output addressed to a subwallet; a fetch+process pass
//! should land it as spendable balance and a second, empty fetch should be
//! a no-op, exercised only through the synchronizer's public surface.

use cryptonote_wallet_core::crypto::{Address, CryptoProvider, DefaultCryptoProvider};
use cryptonote_wallet_core::sync::{Synchronizer, SynchronizationStatus};
use cryptonote_wallet_core::tests_support::{default_config, fresh_subwallet, StubNodeClient};
use cryptonote_wallet_core::types::{Block, BlockTransaction, KeyOutput, SubwalletCollection};
use parking_lot::Mutex;
use std::sync::Arc;

#[tokio::test]
async fn a_stealth_output_addressed_to_the_wallet_becomes_spendable_balance() {
	let crypto: Arc<dyn CryptoProvider> = Arc::new(DefaultCryptoProvider::new());
	let node = Arc::new(StubNodeClient::default());
	let config = default_config();

	let mut rng = rand::rngs::OsRng;
	let (view_private, view_public) = crypto.generate_keypair(&mut rng);
	let (subwallet, _spend_private) = fresh_subwallet(&DefaultCryptoProvider::new(), &view_private, &view_public);
	let address: Address = subwallet.address;

	let mut collection = SubwalletCollection::new();
	collection.add_subwallet(subwallet);
	let collection = Arc::new(Mutex::new(collection));
	let status = Arc::new(Mutex::new(SynchronizationStatus::new()));

	let (tx_private_key, tx_public_key) = crypto.generate_keypair(&mut rng);
	let output_key = crypto.derive_stealth_output(&tx_private_key, &address.public_view_key, &address.public_spend_key, 0).unwrap();

	let funding_amount = 7_000_000u64;
	node.blocks.lock().push(Block {
		block_height: 0,
		block_hash: "funding-block".into(),
		block_timestamp: 0,
		coinbase_transaction: Some(BlockTransaction {
			hash: "coinbase-tx".into(),
			tx_public_key,
			unlock_time: 0,
			key_outputs: vec![KeyOutput { key: output_key, amount: funding_amount, global_index: Some(0) }],
			key_inputs: None,
			payment_id: None,
		}),
		transactions: vec![],
	});

	let synchronizer = Synchronizer::new(node.clone(), crypto.clone(), config, collection.clone(), status.clone(), view_private, 0, 0);

	synchronizer.fetch().await.unwrap();
	synchronizer.process().await.unwrap();

	let height = status.lock().last_known_block_height();
	let (unlocked, locked) = collection.lock().balance(height, 0, cryptonote_wallet_core::common::config::network::MAX_BLOCK_NUMBER);
	assert_eq!(unlocked, funding_amount);
	assert_eq!(locked, 0);

	// A second fetch against an exhausted node is a harmless no-op.
	synchronizer.fetch().await.unwrap();
	let fetch_due = synchronizer.process().await.unwrap();
	assert!(!fetch_due);
}

#[tokio::test]
async fn an_unrecognized_output_is_ignored() {
	let crypto: Arc<dyn CryptoProvider> = Arc::new(DefaultCryptoProvider::new());
	let node = Arc::new(StubNodeClient::default());
	let config = default_config();

	let mut rng = rand::rngs::OsRng;
	let (view_private, view_public) = crypto.generate_keypair(&mut rng);
	let (subwallet, _) = fresh_subwallet(&DefaultCryptoProvider::new(), &view_private, &view_public);
	let collection = Arc::new(Mutex::new({
		let mut c = SubwalletCollection::new();
		c.add_subwallet(subwallet);
		c
	}));
	let status = Arc::new(Mutex::new(SynchronizationStatus::new()));

	// A stealth output addressed to someone else's keys entirely.
	let (_other_view_private, other_view_public) = crypto.generate_keypair(&mut rng);
	let (_other_spend_private, other_spend_public) = crypto.generate_keypair(&mut rng);
	let (tx_private_key, tx_public_key) = crypto.generate_keypair(&mut rng);
	let output_key = crypto.derive_stealth_output(&tx_private_key, &other_view_public, &other_spend_public, 0).unwrap();

	node.blocks.lock().push(Block {
		block_height: 0,
		block_hash: "stray-block".into(),
		block_timestamp: 0,
		coinbase_transaction: Some(BlockTransaction {
			hash: "stray-tx".into(),
			tx_public_key,
			unlock_time: 0,
			key_outputs: vec![KeyOutput { key: output_key, amount: 1_000, global_index: Some(0) }],
			key_inputs: None,
			payment_id: None,
		}),
		transactions: vec![],
	});

	let synchronizer = Synchronizer::new(node.clone(), crypto.clone(), config, collection.clone(), status.clone(), view_private, 0, 0);
	synchronizer.fetch().await.unwrap();
	synchronizer.process().await.unwrap();

	let height = status.lock().last_known_block_height();
	let (unlocked, locked) = collection.lock().balance(height, 0, cryptonote_wallet_core::common::config::network::MAX_BLOCK_NUMBER);
	assert_eq!(unlocked, 0);
	assert_eq!(locked, 0);
}
