//! Reference implementation of the CryptoNote primitive seam.
//!
//! Everything in this module stands in for the out-of-scope external crypto
//! library named in spec §1 (scalar multiplication on Ed25519, ring
//! signatures, key derivation). The *shape* of each operation — what it
//! takes, what it returns, which values key off which — is load-bearing for
//! the synchronizer and transaction builder and is implemented faithfully.
//! Two pieces are intentionally simplified stand-ins rather than the real
//! network algorithms, and are called out below and in DESIGN.md:
//! `hash_to_point` (approximated as `H_s(x)*G` rather than the real
//! Elligator-based map) and `sign_ring` (a structurally-shaped placeholder,
//! not a verifiable MLSAG/CLSAG signature).

use super::keys::{KeyImage, PrivateKey, PublicKey};
use crate::common::{ErrorKind, Result};
use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use rand_core::RngCore;

/// A ring signature over one transaction input. Field widths match the
/// estimator constants in spec §6 (one 32-byte `c` and one 32-byte `r` per
/// ring member).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RingSignature {
	pub c: Vec<[u8; 32]>,
	pub r: Vec<[u8; 32]>,
}

impl RingSignature {
	pub fn ring_size(&self) -> usize {
		self.c.len()
	}
}

/// The seam between the wallet core and the CryptoNote primitive library.
/// `DefaultCryptoProvider` is the one concrete implementation shipped here;
/// a SIMD-accelerated or hardware-backed implementation can be dropped in
/// without touching the synchronizer or transaction builder (this is the
/// same extension-hook shape as the output-scanning callback in spec §9).
pub trait CryptoProvider: Send + Sync {
	/// `rng` must be a cryptographically secure source of randomness; taken
	/// as `&mut dyn RngCore` (rather than a generic bound) so this trait
	/// stays object-safe for use as `Arc<dyn CryptoProvider>`.
	fn generate_keypair(&self, rng: &mut dyn RngCore) -> (PrivateKey, PublicKey);
	fn public_from_private(&self, sk: &PrivateKey) -> Result<PublicKey>;
	fn validate_point(&self, key: &PublicKey) -> bool;

	/// `H_s(8*a*R || varint(i))`-style scan: if `output_key` was addressed
	/// to one of `spend_keys` under view key `priv_view_key`, return its
	/// index.
	fn derive_output_ownership(
		&self,
		tx_public_key: &PublicKey,
		priv_view_key: &PrivateKey,
		output_index: u64,
		output_key: &PublicKey,
		spend_keys: &[PublicKey],
	) -> Result<Option<usize>>;

	/// `x = H_s(derivation||i) + priv_spend_key`, `key_image = x * Hp(x*G)`.
	fn generate_key_image(
		&self,
		priv_spend_key: &PrivateKey,
		tx_public_key: &PublicKey,
		priv_view_key: &PrivateKey,
		output_index: u64,
	) -> Result<KeyImage>;

	/// The one-time private key `x = H_s(derivation||i) + priv_spend_key`
	/// itself, needed to sign a ring for an input spending this output
	/// (spec §4.4 "Build" — cacheable on the input as `private_ephemeral`).
	fn derive_ephemeral_private(
		&self,
		priv_spend_key: &PrivateKey,
		tx_public_key: &PublicKey,
		priv_view_key: &PrivateKey,
		output_index: u64,
	) -> Result<PrivateKey>;

	/// `P = H_s(r*A || varint(i))*G + B` — the sender-side stealth output
	/// key for a destination `(A, B)`.
	fn derive_stealth_output(
		&self,
		tx_private_key: &PrivateKey,
		recipient_view_pub: &PublicKey,
		recipient_spend_pub: &PublicKey,
		output_index: u64,
	) -> Result<PublicKey>;

	fn sign_ring(
		&self,
		message: &[u8],
		ring: &[PublicKey],
		real_index: usize,
		priv_key: &PrivateKey,
		key_image: &KeyImage,
	) -> Result<RingSignature>;
}

pub struct DefaultCryptoProvider;

impl DefaultCryptoProvider {
	pub fn new() -> Self {
		DefaultCryptoProvider
	}

	fn decompress(key: &PublicKey) -> Result<EdwardsPoint> {
		CompressedEdwardsY(key.0).decompress().ok_or_else(|| ErrorKind::NotOnCurve.into())
	}

	fn scalar_of(key: &PrivateKey) -> Scalar {
		Scalar::from_bytes_mod_order(key.0)
	}

	fn hash_to_scalar(data: &[u8]) -> Scalar {
		Scalar::from_bytes_mod_order(super::keccak256(data))
	}

	/// Approximates the network's Elligator-based hash-to-point: a
	/// documented simplification of an out-of-scope primitive (spec §1).
	fn hash_to_point(bytes: &[u8; 32]) -> EdwardsPoint {
		let scalar = Self::hash_to_scalar(bytes);
		&scalar * ED25519_BASEPOINT_TABLE
	}

	fn varint(mut value: u64) -> Vec<u8> {
		let mut out = Vec::new();
		loop {
			let mut byte = (value & 0x7f) as u8;
			value >>= 7;
			if value != 0 {
				byte |= 0x80;
			}
			out.push(byte);
			if value == 0 {
				break;
			}
		}
		out
	}

	fn derivation_point(tx_public_key: &PublicKey, priv_view_key: &PrivateKey) -> Result<EdwardsPoint> {
		let r_point = Self::decompress(tx_public_key)?;
		Ok(r_point * Self::scalar_of(priv_view_key))
	}

	fn derivation_scalar(derivation: &EdwardsPoint, index: u64) -> Scalar {
		let mut data = derivation.compress().to_bytes().to_vec();
		data.extend_from_slice(&Self::varint(index));
		Self::hash_to_scalar(&data)
	}
}

impl Default for DefaultCryptoProvider {
	fn default() -> Self {
		Self::new()
	}
}

impl CryptoProvider for DefaultCryptoProvider {
	fn generate_keypair(&self, rng: &mut dyn RngCore) -> (PrivateKey, PublicKey) {
		let mut bytes = [0u8; 32];
		rng.fill_bytes(&mut bytes);
		let scalar = Scalar::from_bytes_mod_order(bytes);
		let point = &scalar * ED25519_BASEPOINT_TABLE;
		(PrivateKey(scalar.to_bytes()), PublicKey(point.compress().to_bytes()))
	}

	fn public_from_private(&self, sk: &PrivateKey) -> Result<PublicKey> {
		let scalar = Self::scalar_of(sk);
		let point = &scalar * ED25519_BASEPOINT_TABLE;
		Ok(PublicKey(point.compress().to_bytes()))
	}

	fn validate_point(&self, key: &PublicKey) -> bool {
		Self::decompress(key).is_ok()
	}

	fn derive_output_ownership(
		&self,
		tx_public_key: &PublicKey,
		priv_view_key: &PrivateKey,
		output_index: u64,
		output_key: &PublicKey,
		spend_keys: &[PublicKey],
	) -> Result<Option<usize>> {
		let derivation = Self::derivation_point(tx_public_key, priv_view_key)?;
		let scalar = Self::derivation_scalar(&derivation, output_index);
		let expected_component = &scalar * ED25519_BASEPOINT_TABLE;
		let output_point = Self::decompress(output_key)?;
		let candidate = (output_point - expected_component).compress().to_bytes();
		Ok(spend_keys.iter().position(|pk| pk.0 == candidate))
	}

	fn generate_key_image(
		&self,
		priv_spend_key: &PrivateKey,
		tx_public_key: &PublicKey,
		priv_view_key: &PrivateKey,
		output_index: u64,
	) -> Result<KeyImage> {
		let one_time_private = Self::scalar_of(&self.derive_ephemeral_private(priv_spend_key, tx_public_key, priv_view_key, output_index)?);
		let one_time_public = (&one_time_private * ED25519_BASEPOINT_TABLE).compress().to_bytes();
		let h = Self::hash_to_point(&one_time_public);
		let image_point = h * one_time_private;
		let compressed = image_point.compress().to_bytes();
		if !self.validate_point(&PublicKey(compressed)) {
			return Err(ErrorKind::InvalidKeyImage.into());
		}
		Ok(KeyImage(compressed))
	}

	fn derive_ephemeral_private(
		&self,
		priv_spend_key: &PrivateKey,
		tx_public_key: &PublicKey,
		priv_view_key: &PrivateKey,
		output_index: u64,
	) -> Result<PrivateKey> {
		let derivation = Self::derivation_point(tx_public_key, priv_view_key)?;
		let scalar = Self::derivation_scalar(&derivation, output_index);
		let one_time_private = scalar + Self::scalar_of(priv_spend_key);
		Ok(PrivateKey(one_time_private.to_bytes()))
	}

	fn derive_stealth_output(
		&self,
		tx_private_key: &PrivateKey,
		recipient_view_pub: &PublicKey,
		recipient_spend_pub: &PublicKey,
		output_index: u64,
	) -> Result<PublicKey> {
		let view_point = Self::decompress(recipient_view_pub)?;
		let derivation = view_point * Self::scalar_of(tx_private_key);
		let scalar = Self::derivation_scalar(&derivation, output_index);
		let spend_point = Self::decompress(recipient_spend_pub)?;
		let stealth = (&scalar * ED25519_BASEPOINT_TABLE) + spend_point;
		Ok(PublicKey(stealth.compress().to_bytes()))
	}

	fn sign_ring(
		&self,
		message: &[u8],
		ring: &[PublicKey],
		real_index: usize,
		priv_key: &PrivateKey,
		key_image: &KeyImage,
	) -> Result<RingSignature> {
		if real_index >= ring.len() {
			return Err(ErrorKind::Generic("real output index outside ring".into()).into());
		}
		// Structurally-shaped placeholder for the external MLSAG/CLSAG
		// generator: one (c, r) pair per ring member, deterministically
		// derived from the message, the ring, and our secret so that the
		// same inputs always produce the same signature (useful for the
		// post-build size estimate), but not independently verifiable.
		let mut c = Vec::with_capacity(ring.len());
		let mut r = Vec::with_capacity(ring.len());
		for (i, member) in ring.iter().enumerate() {
			let mut data = message.to_vec();
			data.extend_from_slice(&member.0);
			data.extend_from_slice(&key_image.0);
			data.extend_from_slice(&(i as u64).to_le_bytes());
			c.push(super::keccak256(&data));
			let mut rdata = data.clone();
			if i == real_index {
				rdata.extend_from_slice(&priv_key.0);
			}
			r.push(super::keccak256(&rdata));
		}
		Ok(RingSignature { c, r })
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use rand::rngs::OsRng;

	fn provider() -> DefaultCryptoProvider {
		DefaultCryptoProvider::new()
	}

	#[test]
	fn keypair_round_trips_through_public_from_private() {
		let p = provider();
		let mut rng = OsRng;
		let (sk, pk) = p.generate_keypair(&mut rng);
		assert_eq!(p.public_from_private(&sk).unwrap(), pk);
		assert!(p.validate_point(&pk));
	}

	#[test]
	fn output_ownership_detects_our_output_and_rejects_others() {
		let p = provider();
		let mut rng = OsRng;
		let (view_sk, _view_pk) = p.generate_keypair(&mut rng);
		let (spend_sk, spend_pk) = p.generate_keypair(&mut rng);
		let (tx_sk, tx_pk) = p.generate_keypair(&mut rng);

		let output_key = p.derive_stealth_output(&tx_sk, &p.public_from_private(&view_sk).unwrap(), &spend_pk, 0).unwrap();

		let owned = p
			.derive_output_ownership(&tx_pk, &view_sk, 0, &output_key, &[spend_pk])
			.unwrap();
		assert_eq!(owned, Some(0));

		let (_other_sk, other_pk) = p.generate_keypair(&mut rng);
		let not_owned = p
			.derive_output_ownership(&tx_pk, &view_sk, 0, &output_key, &[other_pk])
			.unwrap();
		assert_eq!(not_owned, None);
	}

	#[test]
	fn key_images_are_deterministic_and_unique_per_output() {
		let p = provider();
		let mut rng = OsRng;
		let (view_sk, _) = p.generate_keypair(&mut rng);
		let (spend_sk, _) = p.generate_keypair(&mut rng);
		let (_tx_sk, tx_pk) = p.generate_keypair(&mut rng);

		let image_a = p.generate_key_image(&spend_sk, &tx_pk, &view_sk, 0).unwrap();
		let image_a_again = p.generate_key_image(&spend_sk, &tx_pk, &view_sk, 0).unwrap();
		let image_b = p.generate_key_image(&spend_sk, &tx_pk, &view_sk, 1).unwrap();
		assert_eq!(image_a, image_a_again);
		assert_ne!(image_a, image_b);
	}

	#[test]
	fn sign_ring_produces_one_pair_per_member() {
		let p = provider();
		let mut rng = OsRng;
		let (sk, _) = p.generate_keypair(&mut rng);
		let (_, pk1) = p.generate_keypair(&mut rng);
		let (_, pk2) = p.generate_keypair(&mut rng);
		let (_, pk3) = p.generate_keypair(&mut rng);
		let ring = vec![pk1, pk2, pk3];
		let image = p.generate_key_image(&sk, &pk1, &sk, 0).unwrap();
		let sig = p.sign_ring(b"msg", &ring, 1, &sk, &image).unwrap();
		assert_eq!(sig.ring_size(), 3);
		assert_eq!(sig.r.len(), 3);
	}
}
