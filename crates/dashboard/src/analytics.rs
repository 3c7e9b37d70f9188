//! Trailing 7-day activity summary over the loaded transactions or transfers.

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Days, NaiveDate, Utc};
use contractscope_core::models::{TokenTransfer, Transaction};
use serde::Serialize;
use std::str::FromStr;

/// Days covered by the chart, today included.
pub const WINDOW_DAYS: u64 = 7;

/// What the volume figures and chart counts refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMode {
    /// Token transfers: count of transfers, sum of token amounts.
    Token,
    /// Native transactions: count of transactions, sum of ether values.
    Native,
}

impl VolumeMode {
    /// Fractional digits used when rendering volumes.
    pub fn precision(self) -> i64 {
        match self {
            VolumeMode::Token => 2,
            VolumeMode::Native => 6,
        }
    }
}

/// One day of the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    /// Short weekday name (`Mon`, `Tue`, ...), display only.
    pub label: String,
    pub count: usize,
    pub volume: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_count: usize,
    pub total_volume: String,
    pub avg_gas_used: u64,
    /// Exactly [`WINDOW_DAYS`] entries, oldest first, ending today.
    pub chart: Vec<DayBucket>,
    pub mode: VolumeMode,
}

impl AnalyticsSummary {
    pub fn is_token_volume(&self) -> bool {
        self.mode == VolumeMode::Token
    }
}

/// Anything the chart can count.
trait Activity {
    fn timestamp_ms(&self) -> i64;
    fn amount(&self) -> &str;
}

impl Activity for Transaction {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp
    }

    fn amount(&self) -> &str {
        &self.value
    }
}

impl Activity for TokenTransfer {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp
    }

    fn amount(&self) -> &str {
        &self.value
    }
}

/// Summarise against today's UTC date. See [`aggregate_on`].
pub fn aggregate(
    transactions: &[Transaction],
    transfers: &[TokenTransfer],
) -> Option<AnalyticsSummary> {
    aggregate_on(transactions, transfers, Utc::now().date_naive())
}

/// Summarise the lists for the seven days ending on `today`.
///
/// Any transfer puts the summary in token mode and transactions then only
/// feed the gas average. With neither list populated there is nothing to show.
pub fn aggregate_on(
    transactions: &[Transaction],
    transfers: &[TokenTransfer],
    today: NaiveDate,
) -> Option<AnalyticsSummary> {
    let avg_gas_used = average_gas(transactions);

    if !transfers.is_empty() {
        Some(summarise(transfers, VolumeMode::Token, avg_gas_used, today))
    } else if !transactions.is_empty() {
        Some(summarise(transactions, VolumeMode::Native, avg_gas_used, today))
    } else {
        None
    }
}

/// Mean gas used, rounded half up. Zero for an empty list.
fn average_gas(transactions: &[Transaction]) -> u64 {
    if transactions.is_empty() {
        return 0;
    }
    let n = transactions.len() as u128;
    let total: u128 = transactions.iter().map(|tx| tx.gas_used as u128).sum();
    ((total + n / 2) / n) as u64
}

fn summarise<A: Activity>(
    items: &[A],
    mode: VolumeMode,
    avg_gas_used: u64,
    today: NaiveDate,
) -> AnalyticsSummary {
    let window = trailing_days(today);
    let mut counts = [0usize; WINDOW_DAYS as usize];
    let mut volumes: Vec<BigDecimal> = vec![BigDecimal::default(); WINDOW_DAYS as usize];
    let mut total = BigDecimal::default();

    for item in items {
        let amount = parse_amount(item.amount());
        if let Some(slot) = bucket_index(item.timestamp_ms(), today) {
            counts[slot] += 1;
            volumes[slot] += &amount;
        }
        total += amount;
    }

    let chart = window
        .into_iter()
        .zip(counts)
        .zip(volumes)
        .map(|((date, count), volume)| DayBucket {
            label: date.format("%a").to_string(),
            date,
            count,
            volume: render(&volume, mode),
        })
        .collect();

    AnalyticsSummary {
        total_count: items.len(),
        total_volume: render(&total, mode),
        avg_gas_used,
        chart,
        mode,
    }
}

/// The window's dates, oldest first.
fn trailing_days(today: NaiveDate) -> Vec<NaiveDate> {
    (0..WINDOW_DAYS)
        .rev()
        .map(|back| today.checked_sub_days(Days::new(back)).unwrap_or(today))
        .collect()
}

/// Chart slot for a timestamp, or `None` outside the window (older or future).
fn bucket_index(timestamp_ms: i64, today: NaiveDate) -> Option<usize> {
    let date = DateTime::<Utc>::from_timestamp_millis(timestamp_ms)?.date_naive();
    let days_back = (today - date).num_days();
    if (0..WINDOW_DAYS as i64).contains(&days_back) {
        Some(WINDOW_DAYS as usize - 1 - days_back as usize)
    } else {
        None
    }
}

fn parse_amount(raw: &str) -> BigDecimal {
    BigDecimal::from_str(raw.trim()).unwrap_or_else(|_| {
        tracing::debug!(value = raw, "Unparseable amount counted as zero");
        BigDecimal::default()
    })
}

fn render(value: &BigDecimal, mode: VolumeMode) -> String {
    value
        .with_scale_round(mode.precision(), RoundingMode::HalfUp)
        .to_plain_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use contractscope_core::models::TxStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    /// Noon UTC, `days_back` days before `today()`.
    fn millis(days_back: u64) -> i64 {
        today()
            .checked_sub_days(Days::new(days_back))
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
            .and_utc()
            .timestamp_millis()
    }

    fn tx(days_back: u64, value: &str, gas_used: u64) -> Transaction {
        Transaction {
            hash: format!("0x{days_back}{value}"),
            from: "0x01".into(),
            to: "0x02".into(),
            value: value.into(),
            gas_used,
            gas_price: 1,
            timestamp: millis(days_back),
            status: TxStatus::Success,
            block_number: 1,
            function_name: None,
        }
    }

    fn transfer(days_back: u64, value: &str) -> TokenTransfer {
        TokenTransfer {
            hash: format!("0x{days_back}{value}"),
            from: "0x01".into(),
            to: "0x02".into(),
            value: value.into(),
            token_symbol: "USDT".into(),
            token_name: "Tether USD".into(),
            token_decimal: 6,
            contract_address: "0xdac17f958d2ee523a2206206994597c13d831ec7".into(),
            timestamp: millis(days_back),
            block_number: 1,
        }
    }

    #[test]
    fn nothing_to_summarise() {
        assert_eq!(aggregate_on(&[], &[], today()), None);
    }

    #[test]
    fn native_mode_buckets_every_transaction() {
        let txs: Vec<_> = (0..7).map(|d| tx(d, "0.5", 21_000)).chain([tx(0, "1", 50_000)]).collect();
        let summary = aggregate_on(&txs, &[], today()).unwrap();

        assert_eq!(summary.mode, VolumeMode::Native);
        assert!(!summary.is_token_volume());
        assert_eq!(summary.total_count, 8);
        assert_eq!(summary.total_volume, "4.500000");
        assert_eq!(summary.chart.len(), 7);
        assert_eq!(summary.chart.iter().map(|b| b.count).sum::<usize>(), txs.len());
        assert_eq!(summary.chart[6].count, 2);
        assert_eq!(summary.chart[6].volume, "1.500000");
        // (7 * 21000 + 50000) / 8 = 24625
        assert_eq!(summary.avg_gas_used, 24_625);
    }

    #[test]
    fn transfers_force_token_mode() {
        let txs = vec![tx(0, "100", 30_000), tx(1, "100", 40_000)];
        let transfers = vec![transfer(0, "1.005"), transfer(2, "2")];
        let summary = aggregate_on(&txs, &transfers, today()).unwrap();

        assert_eq!(summary.mode, VolumeMode::Token);
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.total_volume, "3.01");
        assert_eq!(summary.avg_gas_used, 35_000);
        assert_eq!(summary.chart[6].count, 1);
        assert_eq!(summary.chart[4].count, 1);
        assert_eq!(summary.chart[5].count, 0);
    }

    #[test]
    fn chart_is_seven_days_oldest_first() {
        let summary = aggregate_on(&[tx(0, "1", 1)], &[], today()).unwrap();
        let dates: Vec<_> = summary.chart.iter().map(|b| b.date).collect();

        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        assert_eq!(dates[6], today());
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        // 2024-03-14 is a Thursday
        assert_eq!(summary.chart[6].label, "Thu");
        assert_eq!(summary.chart[0].label, "Fri");
    }

    #[test]
    fn same_weekday_a_week_ago_does_not_collide() {
        let transfers = vec![transfer(0, "1"), transfer(7, "1"), transfer(14, "1")];
        let summary = aggregate_on(&[], &transfers, today()).unwrap();

        assert_eq!(summary.chart[6].count, 1);
        assert_eq!(summary.chart.iter().map(|b| b.count).sum::<usize>(), 1);
        // Out-of-window items still count toward the totals.
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.total_volume, "3.00");
    }

    #[test]
    fn future_dated_items_stay_out_of_the_chart() {
        let mut ahead = transfer(0, "5");
        ahead.timestamp += 2 * 86_400_000;
        let summary = aggregate_on(&[], &[ahead], today()).unwrap();
        assert_eq!(summary.chart.iter().map(|b| b.count).sum::<usize>(), 0);
        assert_eq!(summary.total_volume, "5.00");
    }

    #[test]
    fn volume_ignores_input_order() {
        let mut transfers: Vec<_> = ["0.1", "0.2", "1234.5678", "0.0049", "7"]
            .iter()
            .enumerate()
            .map(|(i, v)| transfer(i as u64, v))
            .collect();
        let forward = aggregate_on(&[], &transfers, today()).unwrap();
        transfers.reverse();
        let backward = aggregate_on(&[], &transfers, today()).unwrap();

        assert_eq!(forward.total_volume, backward.total_volume);
        assert_eq!(forward.total_volume, "1241.87");
        assert_eq!(forward.chart, backward.chart);
    }

    #[test]
    fn garbage_amounts_count_as_zero_volume() {
        let summary = aggregate_on(&[tx(0, "n/a", 0), tx(0, "2", 0)], &[], today()).unwrap();
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.total_volume, "2.000000");
    }

    #[test]
    fn twenty_transfers_today_fill_only_todays_bucket() {
        let transfers: Vec<_> = (0..20).map(|_| transfer(0, "10")).collect();
        let summary = aggregate_on(&[], &transfers, today()).unwrap();

        assert!(summary.is_token_volume());
        assert_eq!(summary.chart[6].count, 20);
        assert!(summary.chart[..6].iter().all(|b| b.count == 0));
        assert_eq!(summary.total_volume, "200.00");
    }

    #[test]
    fn gas_average_rounds_half_up() {
        assert_eq!(average_gas(&[tx(0, "0", 1), tx(0, "0", 2)]), 2);
        assert_eq!(average_gas(&[]), 0);
    }
}
