//! The CryptoNote primitive library is an external collaborator (spec §1):
//! scalar multiplication on Ed25519, ring-signature generation/verification,
//! the address codec's curve math, and the mnemonic codec all live behind
//! the [`CryptoProvider`] trait. [`DefaultCryptoProvider`] is the one
//! concrete, runnable implementation shipped with this crate — grounded in
//! the monero-oxide reference pack's curve25519-dalek/sha3/subtle/zeroize
//! stack — matching the teacher's extension-hook pattern (trait + default
//! implementation) described in the design notes for output scanning.

pub mod address;
pub mod keys;
pub mod mnemonic;
pub mod provider;

pub use address::{Address, IntegratedAddress};
pub use keys::{KeyImage, PrivateKey, PublicKey};
pub use mnemonic::{DefaultMnemonicCodec, MnemonicCodec};
pub use provider::{CryptoProvider, DefaultCryptoProvider, RingSignature};

use sha3::{Digest, Keccak256};

/// Keccak-256, the hash used throughout the CryptoNote family (address
/// checksums, key derivation, key images).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
	let mut hasher = Keccak256::new();
	hasher.update(data);
	let mut out = [0u8; 32];
	out.copy_from_slice(&hasher.finalize());
	out
}
