//! Display helpers for the dashboard panels.

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use std::str::FromStr;

const MAINNET_EXPLORER: &str = "https://etherscan.io";

/// `0x1234...5678`. Inputs too short to abbreviate come back unchanged.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Age of `timestamp_ms` relative to `now_ms`, e.g. `3 mins ago`.
///
/// Anything older than 30 days is shown as a calendar date.
pub fn relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms).max(0);
    let mins = diff / 60_000;
    let hours = diff / 3_600_000;
    let days = diff / 86_400_000;

    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        plural(mins, "min")
    } else if hours < 24 {
        plural(hours, "hr")
    } else if days < 30 {
        plural(days, "day")
    } else {
        DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

fn plural(n: i64, unit: &str) -> String {
    let s = if n == 1 { "" } else { "s" };
    format!("{n} {unit}{s} ago")
}

/// Group the integer digits in threes: `1234567.89` becomes `1,234,567.89`.
pub fn format_number(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return "0".to_string();
    }
    let (sign, unsigned) = match value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", value),
    };
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    if !int.bytes().all(|b| b.is_ascii_digit()) {
        return value.to_string();
    }

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Ether amount with `decimals` fractional digits; dust shows as `< 0.0001`.
pub fn format_eth(value: &str, decimals: i64) -> String {
    let Ok(amount) = BigDecimal::from_str(value.trim()) else {
        return "0".to_string();
    };
    if amount == BigDecimal::default() {
        return "0".to_string();
    }
    if amount < BigDecimal::new(1.into(), 4) {
        return "< 0.0001".to_string();
    }
    amount
        .with_scale_round(decimals, RoundingMode::HalfUp)
        .to_plain_string()
}

/// Fee paid in ether: `gas_used * gas_price / 1e18`, six fractional digits.
pub fn gas_cost_eth(gas_used: u64, gas_price: u64) -> String {
    let wei = gas_used as u128 * gas_price as u128;
    BigDecimal::new(wei.into(), 18)
        .with_scale_round(6, RoundingMode::HalfUp)
        .to_plain_string()
}

/// Kinds of Etherscan page a value can link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerLink {
    Tx,
    Address,
    Block,
    Token,
    /// Verified source tab of a contract.
    Code,
}

pub fn explorer_url(kind: ExplorerLink, value: &str) -> String {
    match kind {
        ExplorerLink::Tx => format!("{MAINNET_EXPLORER}/tx/{value}"),
        ExplorerLink::Address => format!("{MAINNET_EXPLORER}/address/{value}"),
        ExplorerLink::Block => format!("{MAINNET_EXPLORER}/block/{value}"),
        ExplorerLink::Token => format!("{MAINNET_EXPLORER}/token/{value}"),
        ExplorerLink::Code => format!("{MAINNET_EXPLORER}/address/{value}#code"),
    }
}

/// Cut `text` to `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_710_417_600_000; // 2024-03-14T12:00:00Z

    #[test]
    fn short_address_keeps_prefix_and_suffix() {
        assert_eq!(
            short_address("0xdac17f958d2ee523a2206206994597c13d831ec7"),
            "0xdac1...1ec7"
        );
        assert_eq!(short_address("0x1234"), "0x1234");
        assert_eq!(short_address(""), "");
    }

    #[test]
    fn relative_time_buckets() {
        assert_eq!(relative_time(NOW - 30_000, NOW), "Just now");
        assert_eq!(relative_time(NOW + 5_000, NOW), "Just now");
        assert_eq!(relative_time(NOW - 60_000, NOW), "1 min ago");
        assert_eq!(relative_time(NOW - 59 * 60_000, NOW), "59 mins ago");
        assert_eq!(relative_time(NOW - 3_600_000, NOW), "1 hr ago");
        assert_eq!(relative_time(NOW - 5 * 3_600_000, NOW), "5 hrs ago");
        assert_eq!(relative_time(NOW - 86_400_000, NOW), "1 day ago");
        assert_eq!(relative_time(NOW - 29 * 86_400_000, NOW), "29 days ago");
        assert_eq!(relative_time(NOW - 40 * 86_400_000, NOW), "2024-02-03");
    }

    #[test]
    fn numbers_group_only_the_integer_part() {
        assert_eq!(format_number("0"), "0");
        assert_eq!(format_number("999"), "999");
        assert_eq!(format_number("1000"), "1,000");
        assert_eq!(format_number("1234567"), "1,234,567");
        assert_eq!(format_number("1234.5678"), "1,234.5678");
        assert_eq!(format_number("-98765.4"), "-98,765.4");
        assert_eq!(format_number(""), "0");
        assert_eq!(format_number("n/a"), "n/a");
    }

    #[test]
    fn eth_amounts() {
        assert_eq!(format_eth("1.23456789", 4), "1.2346");
        assert_eq!(format_eth("0", 4), "0");
        assert_eq!(format_eth("0.00001", 4), "< 0.0001");
        assert_eq!(format_eth("garbage", 4), "0");
    }

    #[test]
    fn gas_cost_in_ether() {
        // 21000 gas at 20 gwei
        assert_eq!(gas_cost_eth(21_000, 20_000_000_000), "0.000420");
        assert_eq!(gas_cost_eth(0, 20_000_000_000), "0.000000");
        // Products beyond u64 stay exact.
        assert_eq!(gas_cost_eth(30_000_000, 1_000_000_000_000), "30.000000");
    }

    #[test]
    fn explorer_links() {
        assert_eq!(explorer_url(ExplorerLink::Tx, "0xabc"), "https://etherscan.io/tx/0xabc");
        assert_eq!(explorer_url(ExplorerLink::Block, "19000000"), "https://etherscan.io/block/19000000");
        assert_eq!(
            explorer_url(ExplorerLink::Code, "0xabc"),
            "https://etherscan.io/address/0xabc#code"
        );
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate("transfer(address,uint256)", 8), "transfer...");
        assert_eq!(truncate("short", 8), "short");
    }
}
