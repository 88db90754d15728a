use crate::crypto::{KeyImage, PrivateKey, PublicKey};
use serde::{Deserialize, Serialize};

/// Network-wide unique transaction hash, hex-encoded.
pub type TxHash = String;

/// One UTXO-like output the wallet believes it owns.
///
/// `spend_height == 0` iff the input is unspent or locked; a nonzero value
/// marks it spent at that block height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
	pub key_image: KeyImage,
	pub amount: u64,
	pub block_height: u64,
	pub tx_public_key: PublicKey,
	pub tx_index: u64,
	pub global_output_index: Option<u64>,
	pub output_key: PublicKey,
	pub spend_height: u64,
	pub unlock_time: u64,
	pub parent_tx_hash: TxHash,
	/// Ephemeral one-time private key, cached to avoid rederiving it when
	/// this input is spent (spec §4.4 "Build").
	#[serde(skip_serializing_if = "Option::is_none")]
	pub private_ephemeral: Option<PrivateKey>,
}

impl TransactionInput {
	pub fn is_spent(&self) -> bool {
		self.spend_height > 0
	}

	/// Unlock rule from spec §4.3: `unlockTime == 0`, or a block-height
	/// unlock that has passed, or a unix-timestamp unlock that has passed.
	pub fn is_unlocked(&self, current_height: u64, now_unix: u64, max_block_number: u64) -> bool {
		if self.unlock_time == 0 {
			return true;
		}
		if self.unlock_time < max_block_number {
			current_height + 1 >= self.unlock_time
		} else {
			now_unix >= self.unlock_time
		}
	}
}

/// Inflates the locked balance for self-sent change before its parent
/// transaction confirms; removed once the real [`TransactionInput`] lands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnconfirmedIncomingInput {
	pub amount: u64,
	pub output_key: PublicKey,
	pub parent_tx_hash: TxHash,
}

#[cfg(test)]
mod test {
	use super::*;

	fn sample_input(unlock_time: u64) -> TransactionInput {
		TransactionInput {
			key_image: KeyImage::zero(),
			amount: 100,
			block_height: 10,
			tx_public_key: PublicKey::zero(),
			tx_index: 0,
			global_output_index: Some(5),
			output_key: PublicKey::zero(),
			spend_height: 0,
			unlock_time,
			parent_tx_hash: "deadbeef".to_string(),
			private_ephemeral: None,
		}
	}

	#[test]
	fn zero_unlock_time_is_always_unlocked() {
		let input = sample_input(0);
		assert!(input.is_unlocked(0, 0, 500_000_000));
	}

	#[test]
	fn height_based_unlock_boundary() {
		let input = sample_input(499_999_999);
		assert!(!input.is_unlocked(499_999_997, 0, 500_000_000));
		assert!(input.is_unlocked(499_999_998, 0, 500_000_000));
	}

	#[test]
	fn timestamp_based_unlock() {
		let input = sample_input(600_000_000);
		assert!(!input.is_unlocked(0, 599_999_999, 500_000_000));
		assert!(input.is_unlocked(0, 600_000_000, 500_000_000));
	}
}
