//! Base58 as used by CryptoNote addresses: data is encoded in fixed 8-byte
//! blocks that map onto fixed-width groups of characters (the "block"
//! variant), not the variable-width Bitcoin encoding. The block-size table
//! and overall shape mirror the teacher's `common/base58.rs`
//! (`ToBase58`/`FromBase58` traits over a 58-character alphabet with a
//! digit lookup table); the block-chunking algorithm itself is the
//! CryptoNote-network convention rather than the teacher's Bitcoin-style
//! scheme, since addresses in this family are encoded that way.

use super::{ErrorKind, Result};

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const ALPHABET_SIZE: u64 = 58;
const FULL_BLOCK_SIZE: usize = 8;
const FULL_ENCODED_BLOCK_SIZE: usize = 11;
const ENCODED_BLOCK_SIZES: [usize; 9] = [0, 2, 3, 5, 6, 7, 9, 10, 11];

fn reverse_alphabet(c: u8) -> Result<u64> {
	ALPHABET
		.iter()
		.position(|&a| a == c)
		.map(|p| p as u64)
		.ok_or(ErrorKind::InvalidBase58Character(c as char, 0).into())
}

fn decoded_block_size(encoded_size: usize) -> Result<usize> {
	ENCODED_BLOCK_SIZES
		.iter()
		.position(|&s| s == encoded_size)
		.ok_or_else(|| ErrorKind::InvalidBase58Length.into())
}

fn encode_block(block: &[u8], out: &mut String) {
	let size = ENCODED_BLOCK_SIZES[block.len()];
	let mut num: u64 = 0;
	for &b in block {
		num = (num << 8) | b as u64;
	}
	let mut chars = vec![ALPHABET[0]; size];
	let mut i = size;
	while num > 0 {
		i -= 1;
		chars[i] = ALPHABET[(num % ALPHABET_SIZE) as usize];
		num /= ALPHABET_SIZE;
	}
	out.push_str(std::str::from_utf8(&chars).expect("alphabet is ascii"));
}

fn decode_block(block: &[u8], decoded_size: usize, out: &mut Vec<u8>) -> Result<()> {
	let mut num: u128 = 0;
	let mut order: u128 = 1;
	for &c in block.iter().rev() {
		let digit = reverse_alphabet(c)?;
		num += digit as u128 * order;
		order *= ALPHABET_SIZE as u128;
	}
	if num > (u64::MAX as u128) {
		return Err(ErrorKind::InvalidBase58Length.into());
	}
	let num = num as u64;
	let bytes = num.to_be_bytes();
	out.extend_from_slice(&bytes[8 - decoded_size..]);
	Ok(())
}

/// Encode raw bytes into CryptoNote block-style base58.
pub fn encode(data: &[u8]) -> String {
	let mut out = String::with_capacity((data.len() / FULL_BLOCK_SIZE + 1) * FULL_ENCODED_BLOCK_SIZE);
	let full_blocks = data.len() / FULL_BLOCK_SIZE;
	for i in 0..full_blocks {
		encode_block(&data[i * FULL_BLOCK_SIZE..(i + 1) * FULL_BLOCK_SIZE], &mut out);
	}
	let remainder = &data[full_blocks * FULL_BLOCK_SIZE..];
	if !remainder.is_empty() {
		encode_block(remainder, &mut out);
	}
	out
}

/// Decode CryptoNote block-style base58 back into raw bytes.
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
	let bytes = encoded.as_bytes();
	let full_blocks = bytes.len() / FULL_ENCODED_BLOCK_SIZE;
	let remainder_len = bytes.len() % FULL_ENCODED_BLOCK_SIZE;
	let mut out = Vec::with_capacity(full_blocks * FULL_BLOCK_SIZE + FULL_BLOCK_SIZE);
	for i in 0..full_blocks {
		decode_block(
			&bytes[i * FULL_ENCODED_BLOCK_SIZE..(i + 1) * FULL_ENCODED_BLOCK_SIZE],
			FULL_BLOCK_SIZE,
			&mut out,
		)?;
	}
	if remainder_len > 0 {
		let decoded_size = decoded_block_size(remainder_len)?;
		decode_block(&bytes[full_blocks * FULL_ENCODED_BLOCK_SIZE..], decoded_size, &mut out)?;
	}
	Ok(out)
}

/// Append a 4-byte Keccak-256 checksum and base58-encode, as used by
/// `Address::encode`.
pub fn encode_check(payload: &[u8]) -> String {
	let mut full = payload.to_vec();
	let checksum = crate::crypto::keccak256(payload);
	full.extend_from_slice(&checksum[..4]);
	encode(&full)
}

/// Inverse of [`encode_check`]: decode and verify the trailing checksum.
pub fn decode_check(encoded: &str) -> Result<Vec<u8>> {
	let mut data = decode(encoded)?;
	if data.len() < 4 {
		return Err(ErrorKind::InvalidBase58Checksum.into());
	}
	let checksum_index = data.len() - 4;
	let given_checksum = data.split_off(checksum_index);
	let expected = crate::crypto::keccak256(&data);
	if &expected[..4] != given_checksum.as_slice() {
		return Err(ErrorKind::InvalidBase58Checksum.into());
	}
	Ok(data)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn round_trips_arbitrary_lengths() {
		for len in 0..40 {
			let data: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
			let encoded = encode(&data);
			let decoded = decode(&encoded).unwrap();
			assert_eq!(decoded, data, "len={}", len);
		}
	}

	#[test]
	fn checked_round_trip() {
		let data = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10];
		let encoded = encode_check(&data);
		assert_eq!(decode_check(&encoded).unwrap(), data);
	}

	#[test]
	fn checked_round_trip_rejects_tamper() {
		let data = vec![9u8; 37];
		let mut encoded = encode_check(&data).into_bytes();
		// flip the final character to corrupt the checksum
		let last = encoded.len() - 1;
		encoded[last] = if encoded[last] == b'1' { b'2' } else { b'1' };
		let encoded = String::from_utf8(encoded).unwrap();
		assert!(decode_check(&encoded).is_err());
	}

	#[test]
	fn rejects_invalid_character() {
		assert!(decode("0OIl").is_err());
	}
}
