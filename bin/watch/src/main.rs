//! Contractscope Watch: a terminal dashboard for one contract at a time.
//!
//! Flow:
//! 1. Connect the session to the API server (and the websocket feed, if configured)
//! 2. Run the refresh loop in the background
//! 3. Read commands from stdin until `quit` or Ctrl-C
//!
//! Commands: `load <address>`, `more transactions|transfers`, `refresh`, `show`, `quit`.

use chrono::Utc;
use contractscope_core::{Settings, telemetry};
use contractscope_dashboard::{
    ApiClient, Category, DashboardSession, DashboardState, LoadMore, LoadOutcome,
    format::{self, ExplorerLink},
};
use eyre::Result;
use std::{str::FromStr, sync::Arc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

/// Rows printed per list by `show`.
const SHOWN_ROWS: usize = 10;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Load(String),
    More(Category),
    Refresh,
    Show,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();

        match (verb.as_str(), arg) {
            ("load", Some(address)) => Ok(Command::Load(address.to_string())),
            ("load", None) => Err("usage: load <address>".into()),
            ("more", Some(list)) => match list.to_ascii_lowercase().as_str() {
                "transactions" | "txs" => Ok(Command::More(Category::Transactions)),
                "transfers" => Ok(Command::More(Category::Transfers)),
                other => Err(format!("unknown list `{other}`, expected transactions or transfers")),
            },
            ("more", None) => Err("usage: more transactions|transfers".into()),
            ("refresh", _) => Ok(Command::Refresh),
            ("show", _) => Ok(Command::Show),
            ("quit" | "exit", _) => Ok(Command::Quit),
            (other, _) => Err(format!("unknown command `{other}`")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Initialisation ──────────────────────────────────────────────────
    telemetry::init();
    let settings = Settings::from_env()?;

    tracing::info!(api = %settings.api_base_url, live = settings.ws_url.is_some(), "Starting Contractscope Watch");

    let client = ApiClient::new(&settings)?;
    let session = Arc::new(DashboardSession::new(client, &settings));

    let (stop, stopped) = oneshot::channel::<()>();
    let runner = tokio::spawn({
        let session = session.clone();
        async move {
            session
                .run(async {
                    let _ = stopped.await;
                })
                .await
        }
    });

    // ── Command Loop ────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully…");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(&session, command).await,
                    Err(usage) => tracing::warn!("{}", usage),
                }
            }
        }
    }

    let _ = stop.send(());
    runner.await?;
    tracing::info!("Watch stopped.");
    Ok(())
}

async fn execute(session: &DashboardSession<ApiClient>, command: Command) {
    match command {
        Command::Load(input) => match session.load_contract(&input).await {
            Ok(LoadOutcome::Applied) => print_state(&session.snapshot()),
            Ok(LoadOutcome::Superseded) => tracing::debug!("Load superseded by a newer one"),
            Err(e) => tracing::error!(error = %e, "Failed to load contract"),
        },
        Command::More(category) => match session.load_more(category).await {
            LoadMore::Appended(n) => {
                let state = session.snapshot();
                tracing::info!(?category, added = n, total = state.len(category), page = state.cursor(category), "Loaded more");
            }
            LoadMore::Exhausted => tracing::info!(?category, "No more items"),
            LoadMore::Skipped => tracing::info!(?category, "Nothing loaded or already loading"),
            LoadMore::Failed => tracing::warn!(?category, "Failed to load more"),
            LoadMore::Superseded => tracing::debug!(?category, "Page dropped after a refresh"),
        },
        Command::Refresh => match session.refresh().await {
            Some(Ok(_)) => print_state(&session.snapshot()),
            Some(Err(e)) => tracing::error!(error = %e, "Refresh failed"),
            None => tracing::info!("No contract loaded"),
        },
        Command::Show => print_state(&session.snapshot()),
        Command::Quit => {}
    }
}

// ─── Rendering ──────────────────────────────────────────────────────────────

fn print_state(state: &DashboardState) {
    if let Some(error) = &state.error {
        println!("error: {error}");
    }
    let Some(contract) = &state.contract else {
        println!("no contract loaded");
        return;
    };

    println!();
    println!(
        "{} ({:?}) {}",
        contract.name,
        contract.token_type,
        format::short_address(contract.address.as_str())
    );
    println!(
        "  compiler {} | verified {} | optimization {} ({} runs)",
        contract.compiler,
        if contract.verified { "yes" } else { "no" },
        if contract.optimization_used { "on" } else { "off" },
        contract.runs
    );
    println!("  {}", format::explorer_url(ExplorerLink::Code, contract.address.as_str()));

    if let Some(price) = &state.price {
        println!(
            "  price ${} | 24h {:+.2}% | mcap ${} | vol ${}",
            price.price,
            price.price_change_24h,
            format::format_number(&format!("{:.0}", price.market_cap)),
            format::format_number(&format!("{:.0}", price.volume_24h)),
        );
    }

    if let Some(analytics) = &state.analytics {
        let unit = if analytics.is_token_volume() { "tokens" } else { "ETH" };
        println!(
            "  7d: {} items | volume {} {} | avg gas {}",
            format::format_number(&analytics.total_count.to_string()),
            format::format_number(&analytics.total_volume),
            unit,
            format::format_number(&analytics.avg_gas_used.to_string()),
        );
        for day in &analytics.chart {
            println!("    {} {} {:>5} {}", day.label, day.date, day.count, day.volume);
        }
    }

    let now = Utc::now().timestamp_millis();

    println!("  transactions ({}, page {}):", state.transactions.len(), state.tx_page);
    for tx in state.transactions.iter().take(SHOWN_ROWS) {
        println!(
            "    {} {} -> {} {} ETH fee {} {:?} {} {}",
            format::short_address(&tx.hash),
            format::short_address(&tx.from),
            format::short_address(&tx.to),
            format::format_eth(&tx.value, 4),
            format::gas_cost_eth(tx.gas_used, tx.gas_price),
            tx.status,
            format::truncate(tx.function_name.as_deref().unwrap_or("Transfer"), 24),
            format::relative_time(tx.timestamp, now),
        );
    }

    println!("  transfers ({}, page {}):", state.transfers.len(), state.transfer_page);
    for transfer in state.transfers.iter().take(SHOWN_ROWS) {
        println!(
            "    {} {} -> {} {} {} {}",
            format::short_address(&transfer.hash),
            format::short_address(&transfer.from),
            format::short_address(&transfer.to),
            format::format_number(&transfer.value),
            transfer.token_symbol,
            format::relative_time(transfer.timestamp, now),
        );
    }
}
