use super::input::TxHash;
use crate::crypto::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The wallet-facing view of a transaction: its net effect on each owned
/// subwallet. A positive transfer is incoming to that subwallet; negative
/// is outgoing. Summed across all subwallets this nets to `-fee` for an
/// outgoing tx the wallet itself originated, and to the received amount for
/// a purely incoming one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	pub transfers: HashMap<PublicKey, i64>,
	pub hash: TxHash,
	pub fee: u64,
	pub block_height: u64,
	pub timestamp: u64,
	pub payment_id: Option<String>,
	pub unlock_time: u64,
	pub is_coinbase: bool,
}

impl Transaction {
	pub fn net_amount(&self) -> i64 {
		self.transfers.values().sum()
	}

	pub fn is_confirmed(&self) -> bool {
		self.block_height > 0
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn net_amount_sums_transfers() {
		let mut transfers = HashMap::new();
		transfers.insert(PublicKey([1u8; 32]), 500i64);
		transfers.insert(PublicKey([2u8; 32]), -200i64);
		let tx = Transaction {
			transfers,
			hash: "h".into(),
			fee: 10,
			block_height: 100,
			timestamp: 0,
			payment_id: None,
			unlock_time: 0,
			is_coinbase: false,
		};
		assert_eq!(tx.net_amount(), 300);
		assert!(tx.is_confirmed());
	}
}
