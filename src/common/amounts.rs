//! Amount formatting and "pretty amount" denomination splitting.
//!
//! A pretty amount is `d * 10^k` for `d` in `1..=9` — the only denominations
//! the network will mix. `split_amount_into_denominations` decomposes any
//! amount into the sum of such denominations, subdividing any single
//! denomination that exceeds the network's per-output size limit.

/// True iff `amount` is of the form `d * 10^k`, `d` in `1..=9`.
pub fn is_pretty_amount(amount: u64) -> bool {
	if amount == 0 {
		return false;
	}
	amount.to_string().chars().filter(|c| *c != '0').count() == 1
}

/// Decompose `amount` into pretty-amount denominations summing to `amount`,
/// subdividing any denomination over `max_output_size` into `10^n` equal
/// (still-pretty) chunks.
pub fn split_amount_into_denominations(amount: u64, max_output_size: u64) -> Vec<u64> {
	let mut result = Vec::new();
	if amount == 0 {
		return result;
	}
	let digits: Vec<u64> = amount
		.to_string()
		.chars()
		.map(|c| c.to_digit(10).unwrap() as u64)
		.collect();
	let len = digits.len();

	for (i, &d) in digits.iter().enumerate() {
		if d == 0 {
			continue;
		}
		let power = (len - i - 1) as u32;
		let denom = d * 10u64.pow(power);
		if denom <= max_output_size {
			result.push(denom);
			continue;
		}
		// subdivide into 10^n equal chunks until each chunk fits
		let mut n = 1u32;
		loop {
			if n > power {
				// cannot subdivide further (down to the bare digit); accept
				// the smallest possible chunk even if it still exceeds the
				// limit — a limit below a single digit is a misconfiguration.
				result.push(d);
				break;
			}
			let chunk = d * 10u64.pow(power - n);
			if chunk <= max_output_size {
				let count = 10u64.pow(n);
				for _ in 0..count {
					result.push(chunk);
				}
				break;
			}
			n += 1;
		}
	}
	result
}

/// Render a signed amount with thousands separators and a fixed number of
/// decimal places, e.g. `pretty_print(12_345_607, 2, "TRTL") ==
/// "123,456.07 TRTL"`.
pub fn pretty_print(amount: i64, decimal_places: u32, ticker: &str) -> String {
	let negative = amount < 0;
	let magnitude = amount.unsigned_abs();
	let divisor = 10u64.pow(decimal_places);
	let whole = magnitude / divisor;
	let frac = magnitude % divisor;

	let whole_str = whole.to_string();
	let mut grouped = String::with_capacity(whole_str.len() + whole_str.len() / 3);
	for (i, c) in whole_str.chars().enumerate() {
		if i > 0 && (whole_str.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(c);
	}

	let frac_str = format!("{:0width$}", frac, width = decimal_places as usize);
	format!(
		"{}{}.{} {}",
		if negative { "-" } else { "" },
		grouped,
		frac_str,
		ticker
	)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn pretty_print_matches_spec_vectors() {
		assert_eq!(pretty_print(12_345_607, 2, "TRTL"), "123,456.07 TRTL");
		assert_eq!(pretty_print(0, 2, "TRTL"), "0.00 TRTL");
		assert_eq!(pretty_print(-1234, 2, "TRTL"), "-12.34 TRTL");
	}

	#[test]
	fn denominations_sum_to_amount_and_are_all_pretty() {
		for amount in [1u64, 9, 10, 99, 100, 1234, 999_999, 5_000_007] {
			let parts = split_amount_into_denominations(amount, 100_000_000_000);
			assert_eq!(parts.iter().sum::<u64>(), amount);
			for p in &parts {
				assert!(is_pretty_amount(*p), "{} not pretty (from {})", p, amount);
			}
		}
	}

	#[test]
	fn denominations_are_subdivided_past_max_output_size() {
		let parts = split_amount_into_denominations(5_000, 1_000);
		assert_eq!(parts.iter().sum::<u64>(), 5_000);
		assert!(parts.iter().all(|&p| p <= 1_000));
		assert!(parts.iter().all(|&p| is_pretty_amount(p)));
	}

	#[test]
	fn zero_is_not_pretty() {
		assert!(!is_pretty_amount(0));
		assert!(is_pretty_amount(7));
		assert!(is_pretty_amount(700));
		assert!(!is_pretty_amount(77));
	}
}
