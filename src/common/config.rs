// Configuration for the wallet core, loaded from TOML the way the teacher's
// `Wallet713Config::from_file` loads `wallet713.toml` — same shape, same
// `serde`/`toml` stack, trimmed down to the constants this spec actually
// names in its "Configurable constants" list.

use super::{ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILENAME: &str = "wallet_core.toml";

/// Network-wide constants that are not user-tunable — encoded directly here
/// rather than in `WalletCoreConfig` because changing them would produce a
/// wallet that can no longer talk to the rest of the network.
pub mod network {
	/// Height at or above which an `unlockTime` is interpreted as a unix
	/// timestamp rather than a block height.
	pub const MAX_BLOCK_NUMBER: u64 = 500_000_000;
	/// Size of the rolling block-hash window kept by `SynchronizationStatus`.
	pub const ROLLING_WINDOW_SIZE: usize = 100;
	/// One sparse checkpoint is kept every this many blocks.
	pub const CHECKPOINT_INTERVAL: u64 = 5_000;
	/// Radius (in blocks) used for the lazy global-index range query.
	pub const GLOBAL_INDEX_OBSCURITY_RADIUS: u64 = 10;
	/// Prune `spent` inputs older than this many blocks, every 5000 blocks
	/// processed.
	pub const SPENT_PRUNE_DEPTH: u64 = 5_000;
	/// Opportunistic-fetch cadence while processing buffered blocks.
	pub const FETCH_EVERY_N_PROCESSED_BLOCKS: u64 = 10;

	pub const FUSION_TX_MIN_INPUT_COUNT: usize = 12;
	pub const FUSION_TX_MIN_IN_OUT_COUNT_RATIO: usize = 4;
	pub const MAX_FUSION_TX_SIZE: usize = 65_536;

	pub const MAX_OUTPUT_SIZE_CLIENT: u64 = 100_000_000_000_000;
	pub const MAX_BLOCK_SIZE_INITIAL: usize = 100_000;
	pub const MAX_BLOCK_SIZE_ABSOLUTE: usize = 125_000;
	pub const COINBASE_RESERVE: usize = 600;
	pub const BLOCK_SIZE_GROWTH_PER_BLOCK: usize = 1;

	/// Byte-size constants used by the transaction size estimator (§6).
	pub mod tx_size {
		pub const KEY_IMAGE: usize = 32;
		pub const OUTPUT_KEY: usize = 32;
		pub const AMOUNT: usize = 10;
		pub const GLOBAL_INDEX_HEADER: usize = 5;
		pub const GLOBAL_INDEX_ENTRY: usize = 4;
		pub const SIGNATURE: usize = 64;
		pub const EXTRA_TAG: usize = 1;
		pub const INPUT_TAG: usize = 1;
		pub const OUTPUT_TAG: usize = 1;
		pub const PUB_KEY: usize = 32;
		pub const TX_VERSION: usize = 1;
		pub const UNLOCK_TIME: usize = 10;
		pub const PAYMENT_ID_EXTRA: usize = 34;
	}

	/// Container codec constants (§4.5 / §6).
	pub mod container {
		pub const WALLET_MAGIC: &[u8] = b"cryptonote-wallet-core\x01";
		pub const PASSWORD_MAGIC: &[u8] = b"pw-verify\x01";
		pub const PBKDF2_ITERATIONS: u32 = 500_000;
		pub const SALT_LEN: usize = 16;
		pub const AES_KEY_LEN: usize = 16;
		pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletCoreConfig {
	/// Number of decimal places the network's atomic unit is divided into.
	pub decimal_places: u32,
	/// Currency ticker used by `pretty_print`.
	pub ticker: String,
	/// Base58 address network prefix.
	pub address_prefix: u64,
	/// Per-request timeout against the node, in milliseconds.
	pub request_timeout_ms: u64,
	/// Expected seconds between blocks — used for unlock-time math.
	pub block_target_time_secs: u64,
	/// Period of the sync tick, in milliseconds.
	pub main_loop_interval_ms: u64,
	/// Minimum fee-per-byte the node will accept, used as a floor.
	pub minimum_fee_per_byte: u64,
	/// Chunk size used when rounding a fee-per-byte estimate up.
	pub fee_per_byte_chunk_size: u64,
	/// Blocks requested per `/getwalletsyncdata`/`/getrawblocks` call.
	pub blocks_per_daemon_request: u64,
	/// Soft cap, in bytes, on the in-memory buffered-block backlog.
	pub block_store_memory_limit: u64,
	/// Largest single node response the synchronizer will request.
	pub max_body_response_size: u64,
	/// How many buffered blocks `process` drains per tick.
	pub blocks_per_tick: u64,
	/// Sync tick period, in milliseconds (default 1s per §5).
	pub sync_thread_interval_ms: u64,
	/// Node-info tick period, in milliseconds (default 10s per §5).
	pub daemon_update_interval_ms: u64,
	/// Cancellation-check tick period, in milliseconds (default 30s per §5).
	pub locked_transactions_check_interval_ms: u64,
	/// Whether coinbase transactions are scanned for ownership.
	pub scan_coinbase_transactions: bool,
	/// Maximum age, in milliseconds, the node-info tick's reported network
	/// height may go stale before it's considered untrustworthy.
	pub max_last_updated_network_height_interval_ms: u64,
	/// Maximum age, in milliseconds, the locally tracked height may go
	/// stale before a sync stall is suspected.
	pub max_last_updated_local_height_interval_ms: u64,
	/// Default mixin (decoy count) for new transactions.
	pub default_mixin: u64,
	#[serde(skip)]
	pub config_home: Option<String>,
}

impl Default for WalletCoreConfig {
	fn default() -> Self {
		WalletCoreConfig {
			decimal_places: 2,
			ticker: "TRTL".to_string(),
			address_prefix: 3_914_525, // arbitrary default network prefix
			request_timeout_ms: 5_000,
			block_target_time_secs: 30,
			main_loop_interval_ms: 1_000,
			minimum_fee_per_byte: 1,
			fee_per_byte_chunk_size: 256,
			blocks_per_daemon_request: 100,
			block_store_memory_limit: 50 * 1024 * 1024,
			max_body_response_size: 10 * 1024 * 1024,
			blocks_per_tick: 4,
			sync_thread_interval_ms: 1_000,
			daemon_update_interval_ms: 10_000,
			locked_transactions_check_interval_ms: 30_000,
			scan_coinbase_transactions: true,
			max_last_updated_network_height_interval_ms: 180_000,
			max_last_updated_local_height_interval_ms: 180_000,
			default_mixin: 3,
			config_home: None,
		}
	}
}

impl WalletCoreConfig {
	pub fn sync_thread_interval(&self) -> Duration {
		Duration::from_millis(self.sync_thread_interval_ms)
	}
	pub fn daemon_update_interval(&self) -> Duration {
		Duration::from_millis(self.daemon_update_interval_ms)
	}
	pub fn locked_transactions_check_interval(&self) -> Duration {
		Duration::from_millis(self.locked_transactions_check_interval_ms)
	}
	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	fn default_config_path() -> Result<PathBuf> {
		let home = dirs::home_dir().ok_or_else(|| ErrorKind::Generic("no home directory".into()))?;
		Ok(home.join(".cryptonote_wallet_core").join(DEFAULT_CONFIG_FILENAME))
	}

	pub fn exists(config_path: Option<&str>) -> Result<bool> {
		let default_path = Self::default_config_path()?;
		let path = config_path.map(Path::new).unwrap_or(&default_path);
		Ok(path.exists())
	}

	pub fn from_file(config_path: Option<&str>) -> Result<WalletCoreConfig> {
		let default_path = Self::default_config_path()?;
		let path = config_path.map(Path::new).unwrap_or(&default_path);
		let path_str = path.to_str().unwrap_or_default().to_string();
		let mut file = File::open(path).map_err(|_| ErrorKind::WalletFileMissing(path_str.clone()))?;
		let mut toml_str = String::new();
		file.read_to_string(&mut toml_str)?;
		let mut config: WalletCoreConfig = toml::from_str(&toml_str)?;
		config.config_home = Some(path_str);
		Ok(config)
	}

	pub fn to_file(&self, config_path: Option<&str>) -> Result<()> {
		let default_path = Self::default_config_path()?;
		let path = config_path.map(Path::new).unwrap_or(&default_path);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let toml_str = toml::to_string(self).map_err(|e| ErrorKind::Generic(e.to_string()))?;
		let mut file = File::create(path)?;
		file.write_all(toml_str.as_bytes())?;
		Ok(())
	}
}
