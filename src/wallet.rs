//! The top-level facade: owns the shared wallet state behind a lock, wires
//! the synchronizer, transaction builder, and scheduler to it, and drives
//! container load/save. Everything a caller needs lives on `Wallet`; the
//! subsystem modules stay decoupled from each other and only meet here.

use crate::common::config::WalletCoreConfig;
use crate::common::{ErrorKind, Result};
use crate::container::{atomic_write, ContainerCodec, ContainerStorage, FileContainerStorage, WalletSnapshot};
use crate::crypto::{Address, CryptoProvider, DefaultCryptoProvider, DefaultMnemonicCodec, MnemonicCodec, PrivateKey, PublicKey};
use crate::node::NodeClient;
use crate::scheduler::{Scheduler, TransactingGuard};
use crate::sync::{SynchronizationStatus, Synchronizer};
use crate::tx_builder::{BuiltTransaction, PreparedTransactionStore, SendArgs, TransactionBuilder};
use crate::types::input::TxHash;
use crate::types::{Subwallet, SubwalletCollection};
use log::info;
use rand::rngs::OsRng;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A just-created wallet's primary keyset, returned once so the caller can
/// show the user a seed phrase / address before it's encrypted away.
pub struct NewWalletKeys {
	pub private_spend_key: PrivateKey,
	pub private_view_key: PrivateKey,
	pub address: Address,
}

pub struct Wallet {
	config: WalletCoreConfig,
	crypto: Arc<dyn CryptoProvider>,
	mnemonic: Arc<dyn MnemonicCodec>,
	node: Arc<dyn NodeClient>,
	storage: Arc<dyn ContainerStorage>,
	collection: Arc<parking_lot::Mutex<SubwalletCollection>>,
	status: Arc<parking_lot::Mutex<SynchronizationStatus>>,
	private_view_key: PrivateKey,
	start_height: u64,
	start_timestamp: u64,
	synchronizer: Arc<Synchronizer>,
	builder: TransactionBuilder,
	prepared: PreparedTransactionStore,
	scheduler: Scheduler,
}

impl Wallet {
	/// Generates a fresh primary subwallet and an empty, ready-to-save
	/// wallet around it.
	pub fn create(config: WalletCoreConfig, node: Arc<dyn NodeClient>, start_height: u64, start_timestamp: u64) -> (Self, NewWalletKeys) {
		let crypto: Arc<dyn CryptoProvider> = Arc::new(DefaultCryptoProvider::new());
		let mut rng = OsRng;
		let (private_spend_key, public_spend_key) = crypto.generate_keypair(&mut rng);
		let (private_view_key, public_view_key) = crypto.generate_keypair(&mut rng);
		let address = Address::new(config.address_prefix, public_spend_key, public_view_key);

		let mut collection = SubwalletCollection::new();
		collection.add_subwallet(Subwallet::new(public_spend_key, Some(private_spend_key.clone()), address, start_height, start_timestamp, true));

		let wallet = Self::from_parts(config, crypto, node, Arc::new(FileContainerStorage::new()), collection, SynchronizationStatus::new(), private_view_key.clone(), start_height, start_timestamp);
		(wallet, NewWalletKeys { private_spend_key, private_view_key, address })
	}

	/// Decrypts and restores a wallet previously written by [`Wallet::save`].
	pub fn open(path: &Path, password: &str, config: WalletCoreConfig, node: Arc<dyn NodeClient>) -> Result<Self> {
		let storage: Arc<dyn ContainerStorage> = Arc::new(FileContainerStorage::new());
		let blob = storage.read(path)?;
		let json = ContainerCodec::decrypt(password, &blob)?;
		let snapshot = WalletSnapshot::from_json(std::str::from_utf8(&json).map_err(|e| ErrorKind::Generic(e.to_string()))?)?;

		let crypto: Arc<dyn CryptoProvider> = Arc::new(DefaultCryptoProvider::new());
		Ok(Self::from_parts(
			config,
			crypto,
			node,
			storage,
			snapshot.sub_wallets,
			snapshot.synchronizer.status,
			snapshot.private_view_key,
			snapshot.synchronizer.start_height,
			snapshot.synchronizer.start_timestamp,
		))
	}

	fn from_parts(
		config: WalletCoreConfig,
		crypto: Arc<dyn CryptoProvider>,
		node: Arc<dyn NodeClient>,
		storage: Arc<dyn ContainerStorage>,
		collection: SubwalletCollection,
		status: SynchronizationStatus,
		private_view_key: PrivateKey,
		start_height: u64,
		start_timestamp: u64,
	) -> Self {
		let collection = Arc::new(parking_lot::Mutex::new(collection));
		let status = Arc::new(parking_lot::Mutex::new(status));
		let synchronizer = Arc::new(Synchronizer::new(node.clone(), crypto.clone(), config.clone(), collection.clone(), status.clone(), private_view_key.clone(), start_height, start_timestamp));
		let builder = TransactionBuilder::new(node.clone(), crypto.clone(), config.clone());
		let scheduler = Scheduler::new(synchronizer.clone(), node.clone());

		Wallet {
			config,
			crypto,
			mnemonic: Arc::new(DefaultMnemonicCodec::new()),
			node,
			storage,
			collection,
			status,
			private_view_key,
			start_height,
			start_timestamp,
			synchronizer,
			builder,
			prepared: PreparedTransactionStore::new(),
			scheduler,
		}
	}

	/// Encrypts the current state and atomically writes it to `path`.
	pub fn save(&self, path: &Path, password: &str) -> Result<()> {
		let snapshot = WalletSnapshot::new(self.collection.lock().clone(), self.private_view_key.clone(), self.start_timestamp, self.start_height, self.status.lock().clone());
		let json = snapshot.to_json()?;
		let blob = ContainerCodec::encrypt(password, json.as_bytes());
		atomic_write(self.storage.as_ref(), path, &blob)
	}

	pub fn primary_address(&self) -> Option<Address> {
		self.collection.lock().subwallets().find(|s| s.is_primary).map(|s| s.address)
	}

	/// Encodes the given subwallet's private spend key as a mnemonic seed.
	/// A view-only subwallet (imported from a view key and address alone)
	/// has no private spend key to encode, so its keys aren't deterministic
	/// from any seed: this fails `KeysNotDeterministic` rather than
	/// encoding a placeholder.
	pub fn mnemonic_seed(&self, owner: &PublicKey) -> Result<Vec<String>> {
		let collection = self.collection.lock();
		let subwallet = collection.get(owner).ok_or(ErrorKind::IllegalViewWalletOperation)?;
		let private_spend_key = subwallet.private_spend_key.clone().ok_or(ErrorKind::KeysNotDeterministic)?;
		Ok(self.mnemonic.encode(&private_spend_key))
	}

	/// `(unlocked, locked)` atomic-unit totals across every subwallet, at
	/// the synchronizer's currently known height.
	pub fn balance(&self, now_unix: u64) -> (u64, u64) {
		let height = self.status.lock().last_known_block_height();
		self.collection.lock().balance(height, now_unix, crate::common::config::network::MAX_BLOCK_NUMBER)
	}

	/// Starts the three periodic ticks (spec §5) at the configured periods.
	pub fn start(&mut self) {
		self.scheduler.start(
			Duration::from_millis(self.config.sync_thread_interval_ms),
			Duration::from_millis(self.config.daemon_update_interval_ms),
			Duration::from_millis(self.config.locked_transactions_check_interval_ms),
		);
	}

	/// Signals the scheduler to stop after its currently running tick.
	pub fn stop(&self) {
		self.scheduler.stop();
	}

	pub async fn join(&mut self) {
		self.scheduler.join().await;
	}

	fn transacting_guard(&self) -> TransactingGuard {
		self.scheduler.transacting_guard()
	}

	/// Builds and submits a transaction in one step. Held behind the
	/// single-send-in-flight guard so a concurrent auto-optimize pass can't
	/// spend the same inputs (spec §5 "Fetch exclusion").
	pub async fn send(&self, args: SendArgs, now_unix: u64) -> Result<TxHash> {
		let permit = self.transacting_guard().try_acquire().ok_or_else(|| ErrorKind::Generic("a send is already in flight".into()))?;
		let height = self.status.lock().last_known_block_height();
		let built = {
			let collection = self.collection.lock();
			self.builder.build(&collection, &self.private_view_key, args, height, now_unix).await?
		};
		let hash = {
			let mut collection = self.collection.lock();
			self.builder.submit(&mut collection, built).await?
		};
		drop(permit);
		Ok(hash)
	}

	/// Builds but does not submit a transaction, holding it for later
	/// relay (spec §4.4 "Prepared transactions").
	pub async fn prepare_send(&self, args: SendArgs, now_unix: u64) -> Result<u64> {
		let height = self.status.lock().last_known_block_height();
		let built = {
			let collection = self.collection.lock();
			self.builder.build(&collection, &self.private_view_key, args, height, now_unix).await?
		};
		Ok(self.prepared.hold(built))
	}

	/// Relays a previously held transaction, failing
	/// `PreparedTransactionExpired` if any of its inputs moved or locked since.
	pub async fn relay_prepared(&self, handle: u64, now_unix: u64) -> Result<TxHash> {
		let permit = self.transacting_guard().try_acquire().ok_or_else(|| ErrorKind::Generic("a send is already in flight".into()))?;
		let height = self.status.lock().last_known_block_height();
		let built: BuiltTransaction = {
			let collection = self.collection.lock();
			self.prepared.relay(&collection, handle, height, now_unix)?
		};
		let hash = {
			let mut collection = self.collection.lock();
			self.builder.submit(&mut collection, built).await?
		};
		drop(permit);
		Ok(hash)
	}

	pub fn discard_prepared(&self, handle: u64) {
		self.prepared.discard(handle);
	}

	/// Consolidates dust into the given subwallet, skipping entirely if a
	/// send is already in flight (spec §5 "auto-optimize suspends itself
	/// while transacting").
	pub async fn optimize(&self, owner: PublicKey, mixin: u64, now_unix: u64) -> Result<Option<TxHash>> {
		let guard = self.transacting_guard();
		let permit = match guard.try_acquire() {
			Some(p) => p,
			None => return Ok(None),
		};

		let height = self.status.lock().last_known_block_height();
		let address = {
			let collection = self.collection.lock();
			collection.get(&owner).map(|s| s.address).ok_or(ErrorKind::IllegalViewWalletOperation)?
		};
		let built = {
			let collection = self.collection.lock();
			match self.builder.build_fusion(&collection, &self.private_view_key, &[owner], address, mixin, height, now_unix).await {
				Ok(built) => built,
				Err(e) => {
					if e.downcast_ref::<ErrorKind>() == Some(&ErrorKind::FullyOptimized) {
						info!("wallet is fully optimized, nothing to fuse");
						return Ok(None);
					}
					return Err(e);
				}
			}
		};
		let hash = {
			let mut collection = self.collection.lock();
			self.builder.submit(&mut collection, built).await?
		};
		drop(permit);
		Ok(Some(hash))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::tests_support::StubNodeClient;

	#[test]
	fn create_produces_a_primary_address() {
		let node = Arc::new(StubNodeClient::default());
		let (wallet, keys) = Wallet::create(WalletCoreConfig::default(), node, 0, 0);
		assert_eq!(wallet.primary_address(), Some(keys.address));
	}

	#[test]
	fn mnemonic_seed_encodes_the_primary_spend_key() {
		let node = Arc::new(StubNodeClient::default());
		let (wallet, keys) = Wallet::create(WalletCoreConfig::default(), node, 0, 0);
		let words = wallet.mnemonic_seed(&keys.address.public_spend_key).unwrap();
		assert_eq!(words.len(), 25);
	}

	#[test]
	fn mnemonic_seed_fails_for_a_view_only_subwallet() {
		let node: Arc<dyn NodeClient> = Arc::new(StubNodeClient::default());
		let crypto = DefaultCryptoProvider::new();
		let mut rng = OsRng;
		let (_spend_private, spend_public) = crypto.generate_keypair(&mut rng);
		let (private_view_key, public_view_key) = crypto.generate_keypair(&mut rng);
		let address = Address::new(1, spend_public, public_view_key);

		let mut collection = SubwalletCollection::new();
		collection.add_subwallet(Subwallet::new(spend_public, None, address, 0, 0, true));

		let wallet = Wallet::from_parts(WalletCoreConfig::default(), Arc::new(crypto), node, Arc::new(FileContainerStorage::new()), collection, SynchronizationStatus::new(), private_view_key, 0, 0);

		let err = wallet.mnemonic_seed(&spend_public).unwrap_err();
		assert_eq!(err.downcast_ref::<ErrorKind>(), Some(&ErrorKind::KeysNotDeterministic));
	}

	#[test]
	fn save_then_open_round_trips_the_primary_address() {
		let node: Arc<dyn NodeClient> = Arc::new(StubNodeClient::default());
		let (wallet, keys) = Wallet::create(WalletCoreConfig::default(), node.clone(), 0, 0);

		let dir = std::env::temp_dir().join(format!("cryptonote-wallet-core-wallet-test-{}", std::process::id()));
		let path = dir.join("wallet.bin");
		wallet.save(&path, "hunter2").unwrap();

		let restored = Wallet::open(&path, "hunter2", WalletCoreConfig::default(), node).unwrap();
		assert_eq!(restored.primary_address(), Some(keys.address));
		let _ = std::fs::remove_dir_all(&dir);
	}
}
