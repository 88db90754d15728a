//! Transaction size estimator (spec §6): `header + Σinput + Σoutput + extra`,
//! using the per-field byte constants so the fee-per-byte loop in
//! [`super::builder`] can converge without building a real transaction on
//! every iteration.

use crate::common::config::network::tx_size::*;

pub fn estimate_size(mixin: u64, num_inputs: usize, num_outputs: usize, has_payment_id: bool, extra_bytes: usize) -> usize {
	let header = TX_VERSION + UNLOCK_TIME + EXTRA_TAG + PUB_KEY;
	let per_input = INPUT_TAG + AMOUNT + KEY_IMAGE + SIGNATURE + GLOBAL_INDEX_HEADER + GLOBAL_INDEX_ENTRY + (mixin as usize) * SIGNATURE;
	let per_output = OUTPUT_TAG + OUTPUT_KEY + AMOUNT;
	let payment_id_extra = if has_payment_id { PAYMENT_ID_EXTRA } else { 0 };
	header + num_inputs * per_input + num_outputs * per_output + extra_bytes + payment_id_extra
}

/// `ceil(size / chunk_size) * fee_per_byte * chunk_size`.
pub fn required_fee(size: usize, fee_per_byte: u64, chunk_size: u64) -> u64 {
	let size = size as u64;
	let chunks = (size + chunk_size - 1) / chunk_size;
	chunks * fee_per_byte * chunk_size
}

/// The absolute ceiling a built transaction's serialized size must clear,
/// per spec §4.4 post-build check 1.
pub fn max_transaction_size(current_height: u64) -> usize {
	use crate::common::config::network::{BLOCK_SIZE_GROWTH_PER_BLOCK, COINBASE_RESERVE, MAX_BLOCK_SIZE_ABSOLUTE, MAX_BLOCK_SIZE_INITIAL};
	// The rolling 100-block median cap used by the real network is
	// intentionally not modeled here (spec §9 open question); this grows the
	// initial size linearly with height instead, which may accept what the
	// network's median check would reject.
	let grown = MAX_BLOCK_SIZE_INITIAL.saturating_add((current_height as usize).saturating_mul(BLOCK_SIZE_GROWTH_PER_BLOCK));
	grown.min(MAX_BLOCK_SIZE_ABSOLUTE).saturating_sub(COINBASE_RESERVE)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn required_fee_rounds_up_to_chunk_boundary() {
		assert_eq!(required_fee(1, 10, 256), 2_560);
		assert_eq!(required_fee(256, 10, 256), 2_560);
		assert_eq!(required_fee(257, 10, 256), 5_120);
	}

	#[test]
	fn size_grows_with_mixin_and_input_count() {
		let small = estimate_size(3, 1, 2, false, 0);
		let bigger_mixin = estimate_size(7, 1, 2, false, 0);
		let more_inputs = estimate_size(3, 2, 2, false, 0);
		assert!(bigger_mixin > small);
		assert!(more_inputs > small);
	}

	#[test]
	fn payment_id_adds_fixed_extra() {
		let without = estimate_size(3, 1, 2, false, 0);
		let with = estimate_size(3, 1, 2, true, 0);
		assert_eq!(with - without, PAYMENT_ID_EXTRA);
	}
}
