//! The unencrypted JSON structure stored inside the container (spec §6).
//! A version field gates forward-compatibility: the "JSON-object-reviver"
//! restore path in the distilled source is replaced here by a tagged schema
//! with an explicit version check instead (spec §9's design note).

use crate::common::config::network::container::SNAPSHOT_FORMAT_VERSION;
use crate::common::{ErrorKind, Result};
use crate::crypto::PrivateKey;
use crate::sync::SynchronizationStatus;
use crate::types::SubwalletCollection;
use serde::{Deserialize, Serialize};

/// The schema `wallet_file_format_version` gates exactly; the core version
/// below is a looser, informational compatibility signal (same major
/// version required, a newer minor on the reader is always fine) rather
/// than a hard reject, since the two evolve independently — the JSON shape
/// can stay frozen across several point releases of the code that reads it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletSnapshot {
	pub wallet_file_format_version: u32,
	pub written_by_core_version: semver::Version,
	pub sub_wallets: SubwalletCollection,
	pub private_view_key: PrivateKey,
	pub is_view_wallet: bool,
	pub synchronizer: WalletSynchronizerSnapshot,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletSynchronizerSnapshot {
	pub start_timestamp: u64,
	pub start_height: u64,
	pub status: SynchronizationStatus,
}

impl WalletSnapshot {
	pub fn new(sub_wallets: SubwalletCollection, private_view_key: PrivateKey, start_timestamp: u64, start_height: u64, status: SynchronizationStatus) -> Self {
		let is_view_wallet = sub_wallets.is_view_wallet();
		WalletSnapshot {
			wallet_file_format_version: SNAPSHOT_FORMAT_VERSION,
			written_by_core_version: current_core_version(),
			sub_wallets,
			private_view_key,
			is_view_wallet,
			synchronizer: WalletSynchronizerSnapshot { start_timestamp, start_height, status },
		}
	}

	pub fn to_json(&self) -> Result<String> {
		serde_json::to_string(self).map_err(|e| ErrorKind::Generic(e.to_string()).into())
	}

	/// Deserializes and checks `wallet_file_format_version` (a hard gate)
	/// and `written_by_core_version` (a soft one — only a major-version
	/// mismatch is rejected); rebuilds the key-image index since it is
	/// never persisted (spec §9).
	pub fn from_json(json: &str) -> Result<Self> {
		let mut snapshot: WalletSnapshot = serde_json::from_str(json)?;
		if snapshot.wallet_file_format_version != SNAPSHOT_FORMAT_VERSION {
			return Err(ErrorKind::UnsupportedWalletFileFormatVersion(snapshot.wallet_file_format_version).into());
		}
		let current = current_core_version();
		if snapshot.written_by_core_version.major != current.major {
			return Err(ErrorKind::IncompatibleCoreVersion(snapshot.written_by_core_version.to_string()).into());
		}
		snapshot.sub_wallets.rebuild_key_image_index();
		Ok(snapshot)
	}
}

fn current_core_version() -> semver::Version {
	semver::Version::parse(env!("CARGO_PKG_VERSION")).expect("CARGO_PKG_VERSION is a valid semver string")
}
