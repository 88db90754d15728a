//! Public addresses: base58-encoded `prefix || pubSpendKey || pubViewKey ||
//! checksum`, with an optional payment-id-bearing integrated variant.

use super::keys::PublicKey;
use crate::common::base58;
use crate::common::{ErrorKind, Result};
use serde::{Deserialize, Serialize};

const PAYMENT_ID_LEN: usize = 32;

/// A standard wallet address: spend key + view key under a network prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Address {
	pub prefix: u64,
	pub public_spend_key: PublicKey,
	pub public_view_key: PublicKey,
}

impl Address {
	pub fn new(prefix: u64, public_spend_key: PublicKey, public_view_key: PublicKey) -> Self {
		Address { prefix, public_spend_key, public_view_key }
	}

	fn payload(&self) -> Vec<u8> {
		let mut data = encode_varint(self.prefix);
		data.extend_from_slice(&self.public_spend_key.0);
		data.extend_from_slice(&self.public_view_key.0);
		data
	}

	pub fn to_base58(&self) -> String {
		base58::encode_check(&self.payload())
	}

	pub fn from_base58(s: &str) -> Result<Self> {
		let payload = base58::decode_check(s)?;
		let (prefix, rest) = decode_varint(&payload)?;
		if rest.len() != 64 {
			return Err(ErrorKind::InvalidAddressLength.into());
		}
		let mut spend = [0u8; 32];
		let mut view = [0u8; 32];
		spend.copy_from_slice(&rest[0..32]);
		view.copy_from_slice(&rest[32..64]);
		Ok(Address { prefix, public_spend_key: PublicKey(spend), public_view_key: PublicKey(view) })
	}

	/// Attaches a payment id, producing an [`IntegratedAddress`].
	pub fn integrate(&self, payment_id: [u8; PAYMENT_ID_LEN]) -> IntegratedAddress {
		IntegratedAddress { address: *self, payment_id }
	}
}

/// An [`Address`] with an embedded 32-byte payment id, encoded as a longer
/// base58 string under the same network prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct IntegratedAddress {
	pub address: Address,
	pub payment_id: [u8; PAYMENT_ID_LEN],
}

impl IntegratedAddress {
	pub fn to_base58(&self) -> String {
		let mut payload = self.address.payload();
		payload.extend_from_slice(&self.payment_id);
		base58::encode_check(&payload)
	}

	pub fn from_base58(s: &str) -> Result<Self> {
		let payload = base58::decode_check(s)?;
		let (prefix, rest) = decode_varint(&payload)?;
		if rest.len() != 64 + PAYMENT_ID_LEN {
			return Err(ErrorKind::InvalidAddressLength.into());
		}
		let mut spend = [0u8; 32];
		let mut view = [0u8; 32];
		let mut payment_id = [0u8; PAYMENT_ID_LEN];
		spend.copy_from_slice(&rest[0..32]);
		view.copy_from_slice(&rest[32..64]);
		payment_id.copy_from_slice(&rest[64..64 + PAYMENT_ID_LEN]);
		Ok(IntegratedAddress {
			address: Address { prefix, public_spend_key: PublicKey(spend), public_view_key: PublicKey(view) },
			payment_id,
		})
	}
}

fn encode_varint(mut value: u64) -> Vec<u8> {
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

fn decode_varint(data: &[u8]) -> Result<(u64, &[u8])> {
	let mut value: u64 = 0;
	let mut shift = 0u32;
	for (i, &byte) in data.iter().enumerate() {
		value |= ((byte & 0x7f) as u64) << shift;
		if byte & 0x80 == 0 {
			return Ok((value, &data[i + 1..]));
		}
		shift += 7;
		if shift >= 64 {
			return Err(ErrorKind::InvalidAddressPrefix.into());
		}
	}
	Err(ErrorKind::InvalidAddressLength.into())
}

#[cfg(test)]
mod test {
	use super::*;

	fn sample_address() -> Address {
		Address::new(3_914_525, PublicKey([1u8; 32]), PublicKey([2u8; 32]))
	}

	#[test]
	fn address_round_trips_through_base58() {
		let addr = sample_address();
		let encoded = addr.to_base58();
		let decoded = Address::from_base58(&encoded).unwrap();
		assert_eq!(decoded, addr);
	}

	#[test]
	fn integrated_address_round_trips_and_carries_payment_id() {
		let addr = sample_address();
		let payment_id = [9u8; PAYMENT_ID_LEN];
		let integrated = addr.integrate(payment_id);
		let encoded = integrated.to_base58();
		let decoded = IntegratedAddress::from_base58(&encoded).unwrap();
		assert_eq!(decoded.address, addr);
		assert_eq!(decoded.payment_id, payment_id);
	}

	#[test]
	fn integrated_address_is_longer_than_plain_address() {
		let addr = sample_address();
		let plain = addr.to_base58();
		let integrated = addr.integrate([0u8; PAYMENT_ID_LEN]).to_base58();
		assert!(integrated.len() > plain.len());
	}

	#[test]
	fn corrupted_address_fails_checksum() {
		let addr = sample_address();
		let mut encoded = addr.to_base58();
		let last = encoded.pop().unwrap();
		let replacement = if last == 'a' { 'b' } else { 'a' };
		encoded.push(replacement);
		assert!(Address::from_base58(&encoded).is_err());
	}
}
