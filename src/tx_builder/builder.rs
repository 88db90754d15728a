//! The transaction builder (spec §4.4): denomination splitting, mixin decoy
//! selection, fee-per-byte iterative sizing, fusion assembly, post-build
//! verification, and submission.

use super::{decoys, selection, size};
use crate::common::amounts::{is_pretty_amount, split_amount_into_denominations};
use crate::common::config::network::{self, MAX_OUTPUT_SIZE_CLIENT};
use crate::common::config::WalletCoreConfig;
use crate::common::hex::to_hex;
use crate::common::{ErrorKind, Result};
use crate::crypto::{keccak256, Address, CryptoProvider, KeyImage, PrivateKey, PublicKey, RingSignature};
use crate::node::NodeClient;
use crate::types::{input::TxHash, SubwalletCollection, Transaction, UnconfirmedIncomingInput};
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::Arc;

const MAX_BUILD_ITERATIONS: usize = 8;

#[derive(Clone, Debug)]
pub struct Destination {
	pub address: Address,
	pub amount: u64,
}

#[derive(Clone, Copy, Debug)]
pub enum FeePolicy {
	Fixed(u64),
	PerByte(u64),
}

#[derive(Clone, Debug)]
pub struct SendArgs {
	/// Restricts input selection to these subwallets; empty means "all".
	pub owners: Vec<PublicKey>,
	pub destinations: Vec<Destination>,
	pub payment_id: Option<[u8; 32]>,
	pub mixin: u64,
	pub fee_policy: FeePolicy,
	/// When set, `destinations[0].amount` is overwritten with whatever is
	/// left of the selected inputs after fee and the other destinations
	/// (spec §4.4 "sendAll mode").
	pub send_all: bool,
	pub unlock_time: u64,
	/// Subwallet that receives change and any sendAll remainder bookkeeping.
	pub change_address: Address,
}

#[derive(Clone, Debug)]
pub struct BuiltOutput {
	pub stealth_key: PublicKey,
	pub amount: u64,
	pub is_change: bool,
}

#[derive(Clone, Debug)]
pub struct BuiltTransaction {
	pub hash: TxHash,
	pub tx_public_key: PublicKey,
	pub inputs: Vec<(PublicKey, KeyImage, u64)>,
	pub outputs: Vec<BuiltOutput>,
	pub ring_signatures: Vec<RingSignature>,
	pub fee: u64,
	pub payment_id: Option<String>,
	pub unlock_time: u64,
	pub size: usize,
	pub is_fusion: bool,
	pub change_owner: PublicKey,
}

impl BuiltTransaction {
	/// Not a real consensus serialization — a deterministic byte blob
	/// standing in for the out-of-scope wire format (spec §1), sized the
	/// same as [`size::estimate_size`] predicted and hex-encoded for
	/// submission the way the real network expects `tx_as_hex`.
	pub fn to_hex_blob(&self) -> String {
		let mut data = self.tx_public_key.0.to_vec();
		for (owner, key_image, _) in &self.inputs {
			data.extend_from_slice(&owner.0);
			data.extend_from_slice(&key_image.0);
		}
		for output in &self.outputs {
			data.extend_from_slice(&output.stealth_key.0);
			data.extend_from_slice(&output.amount.to_le_bytes());
		}
		for sig in &self.ring_signatures {
			for c in &sig.c {
				data.extend_from_slice(c);
			}
			for r in &sig.r {
				data.extend_from_slice(r);
			}
		}
		data.extend_from_slice(&self.fee.to_le_bytes());
		to_hex(&data)
	}
}

pub struct TransactionBuilder {
	node: Arc<dyn NodeClient>,
	crypto: Arc<dyn CryptoProvider>,
	config: WalletCoreConfig,
}

impl TransactionBuilder {
	pub fn new(node: Arc<dyn NodeClient>, crypto: Arc<dyn CryptoProvider>, config: WalletCoreConfig) -> Self {
		TransactionBuilder { node, crypto, config }
	}

	/// Builds a value-transfer transaction per spec §4.4, iterating the
	/// fee-per-byte estimate until it converges (or honoring a fixed fee
	/// outright), then signing a ring over every selected input.
	pub async fn build(&self, collection: &SubwalletCollection, private_view_key: &PrivateKey, mut args: SendArgs, current_height: u64, now_unix: u64) -> Result<BuiltTransaction> {
		if args.destinations.is_empty() {
			return Err(ErrorKind::Generic("no destinations given".into()).into());
		}
		if !args.send_all && args.destinations.iter().any(|d| d.amount == 0) {
			return Err(ErrorKind::AmountIsZero.into());
		}

		let candidates = selection::spendable_inputs(collection, &args.owners, current_height, now_unix, network::MAX_BLOCK_NUMBER);
		// destinations[0] is tracked separately via `first_destination_amount`
		// (it's the one sendAll rewrites), so this only sums the rest.
		let fixed_dest_total: u64 = args.destinations[1..].iter().map(|d| d.amount).sum();

		let mut fee = match args.fee_policy {
			FeePolicy::Fixed(f) => f,
			FeePolicy::PerByte(_) => 0,
		};

		let mut chosen;
		let mut first_destination_amount = if args.send_all { 0 } else { args.destinations[0].amount };

		let mut iterations = 0;
		loop {
			iterations += 1;
			if iterations > MAX_BUILD_ITERATIONS {
				return Err(ErrorKind::Generic("fee estimate did not converge".into()).into());
			}

			chosen = if args.send_all {
				selection::ascending_by_amount(candidates.clone())
			} else {
				let needed = fixed_dest_total + args.destinations[0].amount + fee;
				selection::select_inputs(candidates.clone(), needed, &mut OsRng)?
			};

			let total_in: u64 = chosen.iter().map(|(_, i)| i.amount).sum();

			if args.send_all {
				first_destination_amount = total_in.checked_sub(fee).and_then(|v| v.checked_sub(fixed_dest_total)).ok_or(ErrorKind::NotEnoughBalance { available: total_in, needed: fee + fixed_dest_total })?;
			}

			let change = total_in.saturating_sub(fixed_dest_total + first_destination_amount + fee);

			let mut output_amounts = Vec::new();
			for (i, dest) in args.destinations.iter().enumerate() {
				let amount = if i == 0 { first_destination_amount } else { dest.amount };
				for piece in split_amount_into_denominations(amount, MAX_OUTPUT_SIZE_CLIENT) {
					output_amounts.push(piece);
				}
			}
			let change_pieces = split_amount_into_denominations(change, MAX_OUTPUT_SIZE_CLIENT);
			let num_outputs = output_amounts.len() + change_pieces.len();

			let estimated_size = size::estimate_size(args.mixin, chosen.len(), num_outputs, args.payment_id.is_some(), 0);
			let required = match args.fee_policy {
				FeePolicy::Fixed(_) => size::required_fee(estimated_size, self.config.minimum_fee_per_byte, self.config.fee_per_byte_chunk_size),
				FeePolicy::PerByte(rate) => size::required_fee(estimated_size, rate, self.config.fee_per_byte_chunk_size),
			};

			match args.fee_policy {
				FeePolicy::Fixed(f) => {
					if f < required {
						return Err(ErrorKind::FeeTooSmall { given: f, minimum: required }.into());
					}
					fee = f;
					break;
				}
				FeePolicy::PerByte(_) => {
					if fee >= required {
						break;
					}
					fee = required;
					// loop again: a higher fee may require more inputs/change
					// to shrink, which changes the size and required fee again.
				}
			}
		}

		let total_in: u64 = chosen.iter().map(|(_, i)| i.amount).sum();
		let change = total_in.saturating_sub(fixed_dest_total + first_destination_amount + fee);

		let mut recipients: Vec<(Address, u64, bool)> = Vec::new();
		for (i, dest) in args.destinations.iter().enumerate() {
			let amount = if i == 0 { first_destination_amount } else { dest.amount };
			for piece in split_amount_into_denominations(amount, MAX_OUTPUT_SIZE_CLIENT) {
				recipients.push((dest.address, piece, false));
			}
		}
		for piece in split_amount_into_denominations(change, MAX_OUTPUT_SIZE_CLIENT) {
			recipients.push((args.change_address, piece, true));
		}

		self.assemble(collection, private_view_key, chosen, recipients, fee, args.payment_id.take(), args.mixin, args.unlock_time, args.change_address.public_spend_key, false, args.fee_policy, current_height)
			.await
	}

	/// Fusion mode (spec §4.4 "Fusion"): consolidates dust into a single
	/// wallet-owned output, zero fee, no payment id.
	pub async fn build_fusion(&self, collection: &SubwalletCollection, private_view_key: &PrivateKey, owners: &[PublicKey], destination: Address, mixin: u64, current_height: u64, now_unix: u64) -> Result<BuiltTransaction> {
		let candidates = selection::spendable_inputs(collection, owners, current_height, now_unix, network::MAX_BLOCK_NUMBER);
		let mut by_magnitude: HashMap<usize, Vec<(PublicKey, crate::types::TransactionInput)>> = HashMap::new();
		for candidate in candidates {
			let magnitude = candidate.1.amount.to_string().len();
			by_magnitude.entry(magnitude).or_default().push(candidate);
		}

		let mut bucket = by_magnitude
			.into_values()
			.max_by_key(|b| b.len())
			.ok_or(ErrorKind::FullyOptimized)?;
		bucket = selection::ascending_by_amount(bucket);

		if bucket.len() < network::FUSION_TX_MIN_INPUT_COUNT {
			return Err(ErrorKind::FullyOptimized.into());
		}

		loop {
			let total: u64 = bucket.iter().map(|(_, i)| i.amount).sum();
			let output_amounts = split_amount_into_denominations(total, MAX_OUTPUT_SIZE_CLIENT);
			let num_outputs = output_amounts.len().max(1);

			if bucket.len() < network::FUSION_TX_MIN_IN_OUT_COUNT_RATIO * num_outputs {
				if bucket.len() <= network::FUSION_TX_MIN_INPUT_COUNT {
					return Err(ErrorKind::FullyOptimized.into());
				}
				bucket.pop();
				continue;
			}

			let estimated_size = size::estimate_size(mixin, bucket.len(), num_outputs, false, 0);
			if estimated_size <= network::MAX_FUSION_TX_SIZE {
				let recipients: Vec<(Address, u64, bool)> = output_amounts.into_iter().map(|a| (destination, a, true)).collect();
				return self
					.assemble(collection, private_view_key, bucket, recipients, 0, None, mixin, 0, destination.public_spend_key, true, FeePolicy::Fixed(0), current_height)
					.await;
			}
			if bucket.len() <= network::FUSION_TX_MIN_INPUT_COUNT {
				return Err(ErrorKind::FullyOptimized.into());
			}
			bucket.pop();
		}
	}

	/// Shared assembly: fetch decoys, derive stealth outputs, sign rings,
	/// run post-build verification.
	#[allow(clippy::too_many_arguments)]
	async fn assemble(
		&self,
		collection: &SubwalletCollection,
		private_view_key: &PrivateKey,
		chosen: Vec<(PublicKey, crate::types::TransactionInput)>,
		recipients: Vec<(Address, u64, bool)>,
		fee: u64,
		payment_id: Option<[u8; 32]>,
		mixin: u64,
		unlock_time: u64,
		change_owner: PublicKey,
		is_fusion: bool,
		fee_policy: FeePolicy,
		current_height: u64,
	) -> Result<BuiltTransaction> {
		if chosen.is_empty() {
			return Err(ErrorKind::NotEnoughBalance { available: 0, needed: 1 }.into());
		}

		let amounts: Vec<u64> = {
			let mut amounts: Vec<u64> = chosen.iter().map(|(_, i)| i.amount).collect();
			amounts.sort_unstable();
			amounts.dedup();
			amounts
		};
		let decoy_pool = self.node.get_random_outputs(&amounts, mixin + 1).await?;

		let (tx_private_key, tx_public_key) = self.crypto.generate_keypair(&mut OsRng);

		let mut outputs = Vec::with_capacity(recipients.len());
		for (index, (address, amount, is_change)) in recipients.iter().enumerate() {
			let stealth_key = self.crypto.derive_stealth_output(&tx_private_key, &address.public_view_key, &address.public_spend_key, index as u64)?;
			outputs.push(BuiltOutput { stealth_key, amount: *amount, is_change: *is_change });
		}

		let message = keccak256(&tx_public_key.0);
		let mut ring_signatures = Vec::with_capacity(chosen.len());
		let mut inputs = Vec::with_capacity(chosen.len());
		for (owner, input) in &chosen {
			let global_index = input.global_output_index.ok_or_else(|| ErrorKind::MissingGlobalIndex(input.parent_tx_hash.clone()))?;
			let fetched = decoy_pool.get(&input.amount).cloned().unwrap_or_default();
			let (ring, real_index) = decoys::build_ring((global_index, input.output_key), &fetched, mixin)?;

			let priv_spend_key = collection
				.get(owner)
				.and_then(|s| s.private_spend_key.clone())
				.ok_or(ErrorKind::IllegalViewWalletOperation)?;
			let ephemeral = match &input.private_ephemeral {
				Some(cached) => cached.clone(),
				None => self.crypto.derive_ephemeral_private(&priv_spend_key, &input.tx_public_key, private_view_key, input.tx_index)?,
			};

			let sig = self.crypto.sign_ring(&message, &ring, real_index, &ephemeral, &input.key_image)?;
			ring_signatures.push(sig);
			inputs.push((*owner, input.key_image, input.amount));
		}

		let estimated_size = size::estimate_size(mixin, chosen.len(), outputs.len(), payment_id.is_some(), 0);
		let hash_input: Vec<u8> = outputs.iter().flat_map(|o| o.stealth_key.0.to_vec()).chain(inputs.iter().flat_map(|(_, k, _)| k.0.to_vec())).chain(fee.to_le_bytes()).collect();
		let hash = to_hex(&keccak256(&hash_input));

		let built = BuiltTransaction {
			hash,
			tx_public_key,
			inputs,
			outputs,
			ring_signatures,
			fee,
			payment_id: payment_id.map(|p| to_hex(&p)),
			unlock_time,
			size: estimated_size,
			is_fusion,
			change_owner,
		};

		self.verify(&built, is_fusion, fee_policy, current_height)?;
		Ok(built)
	}

	/// Post-build verification (spec §4.4): size ceiling, pretty-amount
	/// outputs, and fee-policy conformance.
	fn verify(&self, built: &BuiltTransaction, is_fusion: bool, fee_policy: FeePolicy, current_height: u64) -> Result<()> {
		let ceiling = size::max_transaction_size(current_height);
		if built.size > ceiling {
			return Err(ErrorKind::TooManyInputs.into());
		}
		for output in &built.outputs {
			if !is_pretty_amount(output.amount) {
				return Err(ErrorKind::AmountsNotPretty(output.amount).into());
			}
		}
		if is_fusion {
			if built.fee != 0 {
				return Err(ErrorKind::UnexpectedFee { expected: 0, actual: built.fee }.into());
			}
			return Ok(());
		}
		match fee_policy {
			FeePolicy::Fixed(expected) => {
				if built.fee != expected {
					return Err(ErrorKind::UnexpectedFee { expected, actual: built.fee }.into());
				}
			}
			FeePolicy::PerByte(rate) => {
				let floor = size::required_fee(built.size, rate, self.config.fee_per_byte_chunk_size);
				let ceiling_fee = floor.saturating_mul(2);
				if built.fee < floor {
					return Err(ErrorKind::FeeTooSmall { given: built.fee, minimum: floor }.into());
				}
				if built.fee > ceiling_fee {
					return Err(ErrorKind::UnexpectedFee { expected: ceiling_fee, actual: built.fee }.into());
				}
			}
		}
		Ok(())
	}

	/// Submits the built transaction. On success, locks every chosen input,
	/// records the outgoing transaction with zero height/timestamp, and
	/// tracks change as unconfirmed-incoming so locked balance reflects it
	/// (spec §4.4 "Submit").
	pub async fn submit(&self, collection: &mut SubwalletCollection, built: BuiltTransaction) -> Result<TxHash> {
		let hex = built.to_hex_blob();
		self.node.send_raw_transaction(&hex).await?;

		let mut transfers: HashMap<PublicKey, i64> = HashMap::new();
		for (owner, key_image, amount) in &built.inputs {
			collection.mark_input_as_locked(owner, key_image);
			*transfers.entry(*owner).or_insert(0) -= *amount as i64;
		}

		if let Some(change_subwallet) = collection.get_mut(&built.change_owner) {
			for output in built.outputs.iter().filter(|o| o.is_change) {
				change_subwallet.add_unconfirmed_incoming(UnconfirmedIncomingInput { amount: output.amount, output_key: output.stealth_key, parent_tx_hash: built.hash.clone() });
				*transfers.entry(built.change_owner).or_insert(0) += output.amount as i64;
			}
		}

		let tx = Transaction {
			transfers,
			hash: built.hash.clone(),
			fee: built.fee,
			block_height: 0,
			timestamp: 0,
			payment_id: built.payment_id.clone(),
			unlock_time: built.unlock_time,
			is_coinbase: false,
		};
		collection.record_locked_transaction(tx);

		Ok(built.hash)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::crypto::{DefaultCryptoProvider, PublicKey};
	use crate::types::{Subwallet, TransactionInput};
	use async_trait::async_trait;
	use std::collections::HashMap as StdHashMap;

	struct StubNode {
		outputs: StdHashMap<u64, Vec<(u64, PublicKey)>>,
	}

	#[async_trait]
	impl NodeClient for StubNode {
		async fn get_info(&self) -> Result<crate::node::NodeInfo> {
			unimplemented!()
		}
		async fn get_fee(&self) -> Result<Option<crate::node::FeeInfo>> {
			Ok(None)
		}
		async fn get_wallet_sync_data(&self, _: u64, _: &[(u64, String)], _: bool, _: u64, _: u64) -> Result<crate::node::SyncDataResponse> {
			unimplemented!()
		}
		async fn get_global_indexes_for_range(&self, _: u64, _: u64) -> Result<StdHashMap<String, Vec<u64>>> {
			unimplemented!()
		}
		async fn get_transactions_status(&self, _: &[String]) -> Result<Vec<String>> {
			Ok(vec![])
		}
		async fn get_random_outputs(&self, amounts: &[u64], _mixin: u64) -> Result<StdHashMap<u64, Vec<(u64, PublicKey)>>> {
			Ok(amounts.iter().map(|a| (*a, self.outputs.get(a).cloned().unwrap_or_default())).collect())
		}
		async fn send_raw_transaction(&self, _tx_hex: &str) -> Result<()> {
			Ok(())
		}
	}

	fn decoy_set(amount: u64, count: usize) -> Vec<(u64, PublicKey)> {
		(0..count as u64).map(|i| (i + 100, PublicKey([(amount % 250) as u8 + i as u8; 32]))).collect()
	}

	fn make_collection_with_input(amount: u64) -> (SubwalletCollection, PrivateKey, PrivateKey) {
		let crypto = DefaultCryptoProvider::new();
		let mut rng = OsRng;
		let (priv_spend, pub_spend) = crypto.generate_keypair(&mut rng);
		let (priv_view, pub_view) = crypto.generate_keypair(&mut rng);
		let address = Address::new(1, pub_spend, pub_view);
		let mut subwallet = Subwallet::new(pub_spend, Some(priv_spend.clone()), address, 0, 0, true);

		let input = TransactionInput {
			key_image: KeyImage([7u8; 32]),
			amount,
			block_height: 5,
			tx_public_key: PublicKey([9u8; 32]),
			tx_index: 0,
			global_output_index: Some(42),
			output_key: PublicKey([11u8; 32]),
			spend_height: 0,
			unlock_time: 0,
			parent_tx_hash: "parent".into(),
			private_ephemeral: Some(priv_spend.clone()),
		};
		subwallet.store_transaction_input(input, false);

		let mut collection = SubwalletCollection::new();
		collection.add_subwallet(subwallet);
		(collection, priv_spend, priv_view)
	}

	#[tokio::test]
	async fn fixed_fee_build_produces_pretty_outputs_within_size_ceiling() {
		let (collection, _priv_spend, priv_view) = make_collection_with_input(10_000);
		let owner = *collection.public_spend_keys().first().unwrap();

		let node = Arc::new(StubNode { outputs: [(10_000u64, decoy_set(10_000, 5)), (9_000u64, decoy_set(9_000, 5)), (1_000u64, decoy_set(1_000, 5))].iter().cloned().collect() });
		let crypto = Arc::new(DefaultCryptoProvider::new());
		let builder = TransactionBuilder::new(node, crypto, WalletCoreConfig::default());

		let dest_address = Address::new(1, PublicKey([50u8; 32]), PublicKey([51u8; 32]));
		let args = SendArgs {
			owners: vec![owner],
			destinations: vec![Destination { address: dest_address, amount: 9_000 }],
			payment_id: None,
			mixin: 3,
			fee_policy: FeePolicy::PerByte(1),
			send_all: false,
			unlock_time: 0,
			change_address: Address::new(1, owner, PublicKey([99u8; 32])),
		};

		let built = builder.build(&collection, &priv_view, args, 100, 0).await.unwrap();
		assert!(built.outputs.iter().all(|o| is_pretty_amount(o.amount)));
		assert_eq!(built.ring_signatures.len(), 1);
		assert!(built.size <= size::max_transaction_size(100));
	}

	#[tokio::test]
	async fn submit_locks_inputs_and_records_locked_transaction() {
		let (mut collection, _priv_spend, priv_view) = make_collection_with_input(10_000);
		let owner = *collection.public_spend_keys().first().unwrap();

		let node = Arc::new(StubNode { outputs: [(10_000u64, decoy_set(10_000, 5)), (9_000u64, decoy_set(9_000, 5)), (1_000u64, decoy_set(1_000, 5))].iter().cloned().collect() });
		let crypto = Arc::new(DefaultCryptoProvider::new());
		let builder = TransactionBuilder::new(node, crypto, WalletCoreConfig::default());

		let dest_address = Address::new(1, PublicKey([50u8; 32]), PublicKey([51u8; 32]));
		let args = SendArgs {
			owners: vec![owner],
			destinations: vec![Destination { address: dest_address, amount: 9_000 }],
			payment_id: None,
			mixin: 3,
			fee_policy: FeePolicy::PerByte(1),
			send_all: false,
			unlock_time: 0,
			change_address: Address::new(1, owner, PublicKey([99u8; 32])),
		};

		let built = builder.build(&collection, &priv_view, args, 100, 0).await.unwrap();
		builder.submit(&mut collection, built).await.unwrap();

		let subwallet = collection.get(&owner).unwrap();
		assert_eq!(subwallet.unspent().count(), 0);
		assert_eq!(subwallet.locked().count(), 1);
		assert_eq!(collection.locked_transactions.len(), 1);
	}
}
