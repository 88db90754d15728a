use crate::common::hex::{from_hex_32, to_hex};
use crate::common::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroize;

/// A public key: a compressed Ed25519 point. Validity against the curve
/// equation is checked by [`crate::crypto::CryptoProvider::validate_point`],
/// not at construction time — the wire representation is just 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

/// A private scalar. Zeroized on drop; never `Debug`-printed in full.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct PrivateKey(pub [u8; 32]);

/// A key image: the one-way fingerprint of a spent output, unique across
/// the whole network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyImage(pub [u8; 32]);

macro_rules! hex_newtype {
	($t:ident) => {
		impl $t {
			pub fn from_hex(s: &str) -> Result<Self> {
				Ok($t(from_hex_32(s)?))
			}
			pub fn to_hex(&self) -> String {
				to_hex(&self.0)
			}
			pub fn is_zero(&self) -> bool {
				self.0 == [0u8; 32]
			}
			pub fn zero() -> Self {
				$t([0u8; 32])
			}
		}

		impl fmt::Display for $t {
			fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
				write!(f, "{}", self.to_hex())
			}
		}

		impl fmt::Debug for $t {
			fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
				write!(f, "{}({})", stringify!($t), self.to_hex())
			}
		}

		impl Serialize for $t {
			fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
				serializer.serialize_str(&self.to_hex())
			}
		}

		impl<'de> Deserialize<'de> for $t {
			fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
				let s = String::deserialize(deserializer)?;
				$t::from_hex(&s).map_err(serde::de::Error::custom)
			}
		}
	};
}

hex_newtype!(PublicKey);
hex_newtype!(PrivateKey);
hex_newtype!(KeyImage);

impl PrivateKey {
	/// 64-hex-character validity check used when deciding whether to reuse
	/// a cached ephemeral private key (spec §4.4 "Build").
	pub fn looks_like_valid_cached_key(s: &str) -> bool {
		s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn hex_round_trip() {
		let key = PublicKey([7u8; 32]);
		let hex = key.to_hex();
		assert_eq!(PublicKey::from_hex(&hex).unwrap(), key);
	}

	#[test]
	fn rejects_wrong_length() {
		assert!(PublicKey::from_hex("abcd").is_err());
	}

	#[test]
	fn serde_round_trip() {
		let key = KeyImage([3u8; 32]);
		let json = serde_json::to_string(&key).unwrap();
		let back: KeyImage = serde_json::from_str(&json).unwrap();
		assert_eq!(back, key);
	}
}
