//! String formatting utilities.
//!
//! Provides hex prefix handling, truncation of long identifiers for log
//! output, and gwei-to-wei parsing for gas price arguments.

/// Wei per gwei.
const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Truncates a hex string for display, keeping the first 8 characters.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Parses a decimal gwei amount such as "4.1" into wei.
///
/// At most 9 fractional digits are accepted since 1 gwei is 10^9 wei.
pub fn parse_gwei(amount: &str) -> Result<u128, String> {
	let amount = amount.trim();
	let (whole, fraction) = match amount.split_once('.') {
		Some((whole, fraction)) => (whole, fraction),
		None => (amount, ""),
	};

	if whole.is_empty() && fraction.is_empty() {
		return Err(format!("Invalid gwei amount: '{}'", amount));
	}
	if fraction.len() > 9 {
		return Err(format!(
			"Gwei amount '{}' has more than 9 decimal places",
			amount
		));
	}

	let whole_wei = if whole.is_empty() {
		0
	} else {
		whole
			.parse::<u128>()
			.map_err(|e| format!("Invalid gwei amount '{}': {}", amount, e))?
			.checked_mul(WEI_PER_GWEI)
			.ok_or_else(|| format!("Gwei amount '{}' overflows", amount))?
	};

	let fraction_wei = if fraction.is_empty() {
		0
	} else {
		let padded = format!("{:0<9}", fraction);
		padded
			.parse::<u128>()
			.map_err(|e| format!("Invalid gwei amount '{}': {}", amount, e))?
	};

	whole_wei
		.checked_add(fraction_wei)
		.ok_or_else(|| format!("Gwei amount '{}' overflows", amount))
}
