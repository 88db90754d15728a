use super::input::TxHash;
use crate::crypto::{KeyImage, PublicKey};
use serde::{Deserialize, Serialize};

/// One output announced inside a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOutput {
	pub key: PublicKey,
	pub amount: u64,
	pub global_index: Option<u64>,
}

/// One spent-output reference inside a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
	pub key_image: KeyImage,
	pub amount: u64,
	pub output_indexes: Vec<u64>,
}

/// A transaction as announced by the node, before the wallet has decided
/// whether any of its outputs or inputs belong to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTransaction {
	pub hash: TxHash,
	pub tx_public_key: PublicKey,
	pub unlock_time: u64,
	pub key_outputs: Vec<KeyOutput>,
	#[serde(default)]
	pub key_inputs: Option<Vec<KeyInput>>,
	#[serde(default)]
	pub payment_id: Option<String>,
}

impl BlockTransaction {
	pub fn is_coinbase(&self) -> bool {
		self.key_inputs.is_none()
	}
}

/// One block as delivered by `/getwalletsyncdata`/`/getrawblocks`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
	pub block_height: u64,
	pub block_hash: String,
	pub block_timestamp: u64,
	pub coinbase_transaction: Option<BlockTransaction>,
	pub transactions: Vec<BlockTransaction>,
}

impl Block {
	/// All transactions in processing order: coinbase first (matching the
	/// node's own ordering), then the rest.
	pub fn all_transactions(&self) -> Vec<&BlockTransaction> {
		let mut out = Vec::with_capacity(self.transactions.len() + 1);
		if let Some(coinbase) = &self.coinbase_transaction {
			out.push(coinbase);
		}
		out.extend(self.transactions.iter());
		out
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn coinbase_has_no_key_inputs() {
		let tx = BlockTransaction {
			hash: "abc".into(),
			tx_public_key: PublicKey::zero(),
			unlock_time: 0,
			key_outputs: vec![],
			key_inputs: None,
			payment_id: None,
		};
		assert!(tx.is_coinbase());
	}

	#[test]
	fn all_transactions_puts_coinbase_first() {
		let coinbase = BlockTransaction {
			hash: "cb".into(),
			tx_public_key: PublicKey::zero(),
			unlock_time: 0,
			key_outputs: vec![],
			key_inputs: None,
			payment_id: None,
		};
		let other = BlockTransaction {
			hash: "tx1".into(),
			tx_public_key: PublicKey::zero(),
			unlock_time: 0,
			key_outputs: vec![],
			key_inputs: Some(vec![]),
			payment_id: None,
		};
		let block = Block {
			block_height: 1,
			block_hash: "h".into(),
			block_timestamp: 0,
			coinbase_transaction: Some(coinbase),
			transactions: vec![other],
		};
		let all = block.all_transactions();
		assert_eq!(all[0].hash, "cb");
		assert_eq!(all[1].hash, "tx1");
	}
}
