//! Input selection for a value transfer (spec §4.4 step 1-4).

use crate::common::{ErrorKind, Result};
use crate::crypto::PublicKey;
use crate::types::{SubwalletCollection, TransactionInput};
use rand::seq::SliceRandom;
use rand::RngCore;

/// Every unlocked, unspent input across `owners` (or every subwallet in
/// `collection` when `owners` is empty), paired with the subwallet that
/// owns it so the caller can mark it spent later.
pub fn spendable_inputs(collection: &SubwalletCollection, owners: &[PublicKey], current_height: u64, now_unix: u64, max_block_number: u64) -> Vec<(PublicKey, TransactionInput)> {
	collection
		.subwallets()
		.filter(|s| owners.is_empty() || owners.contains(&s.public_spend_key))
		.flat_map(|s| {
			let owner = s.public_spend_key;
			s.unspent().filter(move |i| i.is_unlocked(current_height, now_unix, max_block_number)).map(move |i| (owner, i.clone()))
		})
		.collect()
}

/// Shuffles, then greedily accumulates inputs until their sum reaches
/// `amount_needed`, sorting the chosen subset ascending by amount before
/// returning it (spec §4.4).
pub fn select_inputs(mut candidates: Vec<(PublicKey, TransactionInput)>, amount_needed: u64, rng: &mut dyn RngCore) -> Result<Vec<(PublicKey, TransactionInput)>> {
	candidates.shuffle(rng);

	let mut chosen = Vec::new();
	let mut sum = 0u64;
	for candidate in candidates {
		if sum >= amount_needed {
			break;
		}
		sum = sum.saturating_add(candidate.1.amount);
		chosen.push(candidate);
	}

	if sum < amount_needed {
		return Err(ErrorKind::NotEnoughBalance { available: sum, needed: amount_needed }.into());
	}

	chosen.sort_by_key(|(_, input)| input.amount);
	Ok(chosen)
}

/// Ascending-amount selection used by fusion transactions (spec §4.4
/// "Fusion"): no shuffling, no target sum, just every spendable input the
/// caller hands in, sorted smallest first.
pub fn ascending_by_amount(mut candidates: Vec<(PublicKey, TransactionInput)>) -> Vec<(PublicKey, TransactionInput)> {
	candidates.sort_by_key(|(_, input)| input.amount);
	candidates
}
