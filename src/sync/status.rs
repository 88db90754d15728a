//! The node-facing checkpoint vector: a rolling window of recent block
//! hashes plus sparse, long-lived checkpoints, used to resume sync across
//! restarts and to recover from forks.

use crate::common::config::network::{CHECKPOINT_INTERVAL, ROLLING_WINDOW_SIZE};
use crate::common::{ErrorKind, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SynchronizationStatus {
	/// Newest first, capped at [`ROLLING_WINDOW_SIZE`].
	last_known_block_hashes: Vec<(u64, String)>,
	/// Newest first, one entry every [`CHECKPOINT_INTERVAL`] blocks.
	block_hash_checkpoints: Vec<(u64, String)>,
	last_known_block_height: u64,
}

impl SynchronizationStatus {
	pub fn new() -> Self {
		SynchronizationStatus::default()
	}

	pub fn last_known_block_height(&self) -> u64 {
		self.last_known_block_height
	}

	/// Records a processed block's hash. Fails with a "gap in block-hash
	/// sequence" fatal condition if `height` skips ahead of the known tip —
	/// a fork rewind (height <= tip) is always accepted, since the caller
	/// is explicitly replaying from an earlier point.
	pub fn store_block_hash(&mut self, height: u64, hash: String) -> Result<()> {
		if height > self.last_known_block_height && self.last_known_block_height != 0 && height != self.last_known_block_height + 1 {
			return Err(ErrorKind::BlockHashSequenceGap { expected: self.last_known_block_height + 1, got: height }.into());
		}

		self.last_known_block_hashes.insert(0, (height, hash.clone()));
		if self.last_known_block_hashes.len() > ROLLING_WINDOW_SIZE {
			self.last_known_block_hashes.truncate(ROLLING_WINDOW_SIZE);
		}

		if height % CHECKPOINT_INTERVAL == 0 {
			self.block_hash_checkpoints.insert(0, (height, hash));
		}

		if height > self.last_known_block_height {
			self.last_known_block_height = height;
		}
		Ok(())
	}

	/// Rolling window followed by sparse checkpoints, newest first — what
	/// the node uses to locate the resume point after a fork.
	pub fn get_processed_checkpoints(&self) -> Vec<(u64, String)> {
		let mut out = self.last_known_block_hashes.clone();
		out.extend(self.block_hash_checkpoints.iter().cloned());
		out
	}
}
