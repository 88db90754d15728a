//! Mnemonic seed codec: 25-word Electrum-style encoding of a private spend
//! key, with a trailing checksum word, as used to hand a wallet's deciding
//! key across to a human. The word list math (this is genuinely an external
//! collaborator per spec §1) is a compact deterministic stand-in rather than
//! the published CryptoNote word list.

use super::keys::PrivateKey;
use crate::common::{ErrorKind, Result};

const WORD_COUNT: usize = 25;
const WORDLIST_SIZE: usize = 1626;

/// Behind a trait for the same reason [`super::CryptoProvider`] is: a real
/// deployment swaps in the network's exact word list without touching
/// callers.
pub trait MnemonicCodec: Send + Sync {
	fn encode(&self, key: &PrivateKey) -> Vec<String>;
	fn decode(&self, words: &[String]) -> Result<PrivateKey>;
}

pub struct DefaultMnemonicCodec {
	wordlist: Vec<String>,
}

impl DefaultMnemonicCodec {
	pub fn new() -> Self {
		let wordlist = (0..WORDLIST_SIZE).map(|i| format!("word{:04}", i)).collect();
		DefaultMnemonicCodec { wordlist }
	}

	fn index_of(&self, word: &str) -> Result<u32> {
		self.wordlist
			.iter()
			.position(|w| w == word)
			.map(|p| p as u32)
			.ok_or_else(|| ErrorKind::InvalidMnemonicWord(word.to_string()).into())
	}

	fn checksum_word<'a>(&self, words: &'a [String]) -> &'a String {
		let trimmed: String = words.iter().map(|w| &w[..w.len().min(3)]).collect();
		let index = crc32(trimmed.as_bytes()) as usize % words.len();
		&words[index]
	}
}

impl Default for DefaultMnemonicCodec {
	fn default() -> Self {
		Self::new()
	}
}

impl MnemonicCodec for DefaultMnemonicCodec {
	fn encode(&self, key: &PrivateKey) -> Vec<String> {
		let mut words = Vec::with_capacity(WORD_COUNT);
		// four bytes -> three words, eight groups covers the 32-byte key
		for chunk in key.0.chunks(4) {
			let mut buf = [0u8; 4];
			buf[..chunk.len()].copy_from_slice(chunk);
			let value = u32::from_le_bytes(buf) as u64;
			let n = WORDLIST_SIZE as u64;
			let w1 = (value % n) as usize;
			let w2 = ((value / n + w1 as u64) % n) as usize;
			let w3 = ((value / n / n + w2 as u64) % n) as usize;
			words.push(self.wordlist[w1].clone());
			words.push(self.wordlist[w2].clone());
			words.push(self.wordlist[w3].clone());
		}
		let checksum = self.checksum_word(&words).clone();
		words.push(checksum);
		words
	}

	fn decode(&self, words: &[String]) -> Result<PrivateKey> {
		if words.len() != WORD_COUNT {
			return Err(ErrorKind::InvalidMnemonicLength(words.len()).into());
		}
		let body = &words[..words.len() - 1];
		let expected_checksum = self.checksum_word(body);
		if expected_checksum != &words[WORD_COUNT - 1] {
			return Err(ErrorKind::InvalidMnemonicChecksum.into());
		}

		let mut out = [0u8; 32];
		let n = WORDLIST_SIZE as u64;
		for (i, chunk) in body.chunks(3).enumerate() {
			let w1 = self.index_of(&chunk[0])? as u64;
			let w2 = self.index_of(&chunk[1])? as u64;
			let w3 = self.index_of(&chunk[2])? as u64;
			let a = w1;
			let b = (n + w2 - w1) % n;
			let c = (n + w3 - w2) % n;
			let value = a + b * n + c * n * n;
			let bytes = (value as u32).to_le_bytes();
			let start = i * 4;
			let len = (32 - start).min(4);
			out[start..start + len].copy_from_slice(&bytes[..len]);
		}
		Ok(PrivateKey(out))
	}
}

fn crc32(data: &[u8]) -> u32 {
	let mut crc: u32 = 0xFFFF_FFFF;
	for &byte in data {
		crc ^= byte as u32;
		for _ in 0..8 {
			let mask = (crc & 1).wrapping_neg();
			crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
		}
	}
	!crc
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn encodes_to_twenty_five_words() {
		let codec = DefaultMnemonicCodec::new();
		let key = PrivateKey([5u8; 32]);
		let words = codec.encode(&key);
		assert_eq!(words.len(), WORD_COUNT);
	}

	#[test]
	fn round_trips_through_decode() {
		let codec = DefaultMnemonicCodec::new();
		let key = PrivateKey([42u8; 32]);
		let words = codec.encode(&key);
		let decoded = codec.decode(&words).unwrap();
		assert_eq!(decoded, key);
	}

	#[test]
	fn rejects_wrong_word_count() {
		let codec = DefaultMnemonicCodec::new();
		let words: Vec<String> = vec!["word0000".to_string(); 10];
		assert!(codec.decode(&words).is_err());
	}

	#[test]
	fn rejects_bad_checksum_word() {
		let codec = DefaultMnemonicCodec::new();
		let key = PrivateKey([1u8; 32]);
		let mut words = codec.encode(&key);
		let last = words.len() - 1;
		words[last] = "word1234".to_string();
		assert!(codec.decode(&words).is_err());
	}
}
