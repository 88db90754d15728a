//! Ring decoy selection (spec §4.4 "Ring decoys").

use crate::common::{ErrorKind, Result};
use crate::crypto::PublicKey;

/// Builds one ring for a real output, given the (up to `mixin + 1`) decoys
/// the node returned for that amount. Drops any decoy that happens to be our
/// own global index, rejects if fewer than `mixin` remain, then sorts the
/// ring by global index so the real member's position reveals nothing.
///
/// Returns `(ring_members, index_of_real_output)`.
pub fn build_ring(real: (u64, PublicKey), fetched: &[(u64, PublicKey)], mixin: u64) -> Result<(Vec<PublicKey>, usize)> {
	let mut decoys: Vec<(u64, PublicKey)> = fetched.iter().copied().filter(|(global_index, _)| *global_index != real.0).collect();

	if (decoys.len() as u64) < mixin {
		return Err(ErrorKind::NotEnoughDecoys { requested: mixin, available: decoys.len() as u64 }.into());
	}
	decoys.truncate(mixin as usize);
	decoys.push(real);
	decoys.sort_by_key(|(global_index, _)| *global_index);

	let real_index = decoys
		.iter()
		.position(|(global_index, key)| *global_index == real.0 && *key == real.1)
		.ok_or(ErrorKind::CantGetDecoys)?;
	let ring = decoys.into_iter().map(|(_, key)| key).collect();
	Ok((ring, real_index))
}

#[cfg(test)]
mod test {
	use super::*;

	fn key(b: u8) -> PublicKey {
		PublicKey([b; 32])
	}

	#[test]
	fn ring_includes_real_output_sorted_by_global_index() {
		let fetched = vec![(5, key(1)), (2, key(2)), (9, key(3))];
		let (ring, index) = build_ring((7, key(9)), &fetched, 3).unwrap();
		assert_eq!(ring.len(), 4);
		assert_eq!(ring[index], key(9));
	}

	#[test]
	fn rejects_when_too_few_decoys_remain() {
		let fetched = vec![(5, key(1))];
		assert!(build_ring((7, key(9)), &fetched, 3).is_err());
	}

	#[test]
	fn own_global_index_among_decoys_is_dropped_before_counting() {
		let fetched = vec![(7, key(9)), (5, key(1)), (2, key(2)), (9, key(3))];
		let (ring, _) = build_ring((7, key(9)), &fetched, 3).unwrap();
		assert_eq!(ring.len(), 4);
		assert_eq!(ring.iter().filter(|k| **k == key(9)).count(), 1);
	}
}
