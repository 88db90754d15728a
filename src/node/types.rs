use crate::types::Block;
use serde::{Deserialize, Serialize};

/// `GET /info` response. `network_height` is returned by the node as
/// "tip+1"; callers should decrement it (never past zero) before comparing
/// against the wallet's own height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
	pub height: u64,
	pub network_height: u64,
	pub incoming_connections_count: u64,
	pub outgoing_connections_count: u64,
	pub difficulty: u64,
	#[serde(default)]
	pub is_cache_api: bool,
}

impl NodeInfo {
	/// `network_height` decremented by one, per the node's "tip+1"
	/// convention, floored at zero.
	pub fn network_tip(&self) -> u64 {
		self.network_height.saturating_sub(1)
	}
}

/// `GET /fee` response: the node's preferred fee address and minimum fee
/// amount. [`super::HttpNodeClient::get_fee`] validates `address` decodes
/// under the wallet's network prefix before handing this back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeInfo {
	pub address: String,
	pub amount: u64,
}

/// `POST /getwalletsyncdata` or `/getrawblocks` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDataResponse {
	pub items: Vec<Block>,
	pub synced: bool,
	pub top_block: Option<TopBlock>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopBlock {
	pub height: u64,
	pub hash: String,
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn network_tip_decrements_and_floors_at_zero() {
		let mut info = NodeInfo { height: 10, network_height: 11, incoming_connections_count: 0, outgoing_connections_count: 0, difficulty: 0, is_cache_api: false };
		assert_eq!(info.network_tip(), 10);
		info.network_height = 0;
		assert_eq!(info.network_tip(), 0);
	}
}
