//! Encrypt/decrypt the wallet snapshot blob. Layout (spec §4.5):
//! `WALLET_MAGIC || SALT(16) || AES-128-CBC(PWD_MAGIC || json, key, iv=SALT)`.

use crate::common::config::network::container as cfg;
use crate::common::{ErrorKind, Result};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::Sha256;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub struct ContainerCodec;

impl ContainerCodec {
	fn derive_key(password: &str, salt: &[u8; cfg::SALT_LEN]) -> [u8; cfg::AES_KEY_LEN] {
		let mut key = [0u8; cfg::AES_KEY_LEN];
		pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, cfg::PBKDF2_ITERATIONS, &mut key);
		key
	}

	/// Encrypts `json` (the serialized [`super::snapshot::WalletSnapshot`])
	/// under `password`, generating a fresh random salt.
	pub fn encrypt(password: &str, json: &[u8]) -> Vec<u8> {
		let mut salt = [0u8; cfg::SALT_LEN];
		rand::rngs::OsRng.fill_bytes(&mut salt);
		Self::encrypt_with_salt(password, json, salt)
	}

	fn encrypt_with_salt(password: &str, json: &[u8], salt: [u8; cfg::SALT_LEN]) -> Vec<u8> {
		let key = Self::derive_key(password, &salt);
		let mut plaintext = cfg::PASSWORD_MAGIC.to_vec();
		plaintext.extend_from_slice(json);
		let ciphertext = Aes128CbcEnc::new(&key.into(), &salt.into()).encrypt_padded_vec_mut::<Pkcs7>(&plaintext);

		let mut out = Vec::with_capacity(cfg::WALLET_MAGIC.len() + salt.len() + ciphertext.len());
		out.extend_from_slice(cfg::WALLET_MAGIC);
		out.extend_from_slice(&salt);
		out.extend_from_slice(&ciphertext);
		out
	}

	/// Inverse of [`encrypt`]: returns the plaintext JSON bytes, or
	/// `NotAWalletFile`/`WrongPassword` per spec §4.5's guard order.
	pub fn decrypt(password: &str, blob: &[u8]) -> Result<Vec<u8>> {
		if blob.len() < cfg::WALLET_MAGIC.len() || &blob[..cfg::WALLET_MAGIC.len()] != cfg::WALLET_MAGIC {
			return Err(ErrorKind::NotAWalletFile.into());
		}
		let rest = &blob[cfg::WALLET_MAGIC.len()..];
		if rest.len() < cfg::SALT_LEN {
			return Err(ErrorKind::CorruptedContainer.into());
		}
		let mut salt = [0u8; cfg::SALT_LEN];
		salt.copy_from_slice(&rest[..cfg::SALT_LEN]);
		let ciphertext = &rest[cfg::SALT_LEN..];

		let key = Self::derive_key(password, &salt);
		let plaintext = Aes128CbcDec::new(&key.into(), &salt.into())
			.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
			.map_err(|_| ErrorKind::WrongPassword)?;

		if plaintext.len() < cfg::PASSWORD_MAGIC.len() || &plaintext[..cfg::PASSWORD_MAGIC.len()] != cfg::PASSWORD_MAGIC {
			return Err(ErrorKind::WrongPassword.into());
		}
		Ok(plaintext[cfg::PASSWORD_MAGIC.len()..].to_vec())
	}

	/// Re-encrypts an existing blob's plaintext under a new password,
	/// without the caller needing to hold the decoded snapshot.
	pub fn change_password(old_password: &str, new_password: &str, blob: &[u8]) -> Result<Vec<u8>> {
		let json = Self::decrypt(old_password, blob)?;
		Ok(Self::encrypt(new_password, &json))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn round_trips_with_correct_password() {
		let json = br#"{"hello":"world"}"#;
		let blob = ContainerCodec::encrypt("hunter2", json);
		let decrypted = ContainerCodec::decrypt("hunter2", &blob).unwrap();
		assert_eq!(decrypted, json);
	}

	#[test]
	fn wrong_password_fails() {
		let json = br#"{"hello":"world"}"#;
		let blob = ContainerCodec::encrypt("hunter2", json);
		assert!(ContainerCodec::decrypt("wrong-password", &blob).is_err());
	}

	#[test]
	fn non_wallet_bytes_are_rejected() {
		assert!(ContainerCodec::decrypt("any", b"not a wallet at all").is_err());
	}

	#[test]
	fn change_password_then_old_password_fails() {
		let json = br#"{"a":1}"#;
		let blob = ContainerCodec::encrypt("old", json);
		let rotated = ContainerCodec::change_password("old", "new", &blob).unwrap();
		assert!(ContainerCodec::decrypt("old", &rotated).is_err());
		assert_eq!(ContainerCodec::decrypt("new", &rotated).unwrap(), json);
	}
}
