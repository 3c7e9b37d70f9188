//! One user's dashboard: the loaded contract, its pages and their refresh cycle.
//!
//! Flow of [`DashboardSession::load_contract`]:
//! 1. Validate the address (no request for a malformed one)
//! 2. Fetch contract metadata; failure here aborts and clears the view
//! 3. Fetch the first transaction and transfer pages, each best-effort
//! 4. Summarise them, reset both cursors, publish the new state
//! 5. Best-effort price for tokens, then make sure live updates are listening
//!
//! Every load takes a fresh request generation. A response that arrives after
//! a newer load started is dropped instead of overwriting newer state.

use contractscope_core::{
    AppError, ContractAddress, Settings,
    models::{ContractSummary, PriceInfo, TokenTransfer, Transaction},
};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, MissedTickBehavior};

use crate::analytics::{AnalyticsSummary, aggregate};
use crate::live::{EventFeed, LiveUpdates, WsEventFeed};
use crate::source::ContractDataSource;

/// The two independently paginated lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Transactions,
    Transfers,
}

/// Result of a full load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetched data is now the session's state.
    Applied,
    /// A newer load started meanwhile; this one's data was dropped.
    Superseded,
}

/// Result of [`DashboardSession::load_more`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// Items appended; the cursor advanced.
    Appended(usize),
    /// The next page came back empty; the cursor stays.
    Exhausted,
    /// Nothing loaded yet, or a load for this list is already in flight.
    Skipped,
    /// The request failed; state untouched.
    Failed,
    /// A full load replaced the lists while the page was in flight.
    Superseded,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub address: Option<ContractAddress>,
    pub contract: Option<ContractSummary>,
    pub transactions: Vec<Transaction>,
    pub transfers: Vec<TokenTransfer>,
    pub analytics: Option<AnalyticsSummary>,
    pub price: Option<PriceInfo>,
    /// User-facing message of the last failed load.
    pub error: Option<String>,
    pub tx_page: u32,
    pub transfer_page: u32,
    pub loading: bool,
    pub loading_more_transactions: bool,
    pub loading_more_transfers: bool,
    /// Bumped by every full load as it starts.
    generation: u64,
    /// Generation whose lists are currently shown.
    lists_generation: u64,
}

impl DashboardState {
    pub fn is_loaded(&self) -> bool {
        self.contract.is_some()
    }

    pub fn cursor(&self, category: Category) -> u32 {
        match category {
            Category::Transactions => self.tx_page,
            Category::Transfers => self.transfer_page,
        }
    }

    pub fn len(&self, category: Category) -> usize {
        match category {
            Category::Transactions => self.transactions.len(),
            Category::Transfers => self.transfers.len(),
        }
    }

    fn loading_more_mut(&mut self, category: Category) -> &mut bool {
        match category {
            Category::Transactions => &mut self.loading_more_transactions,
            Category::Transfers => &mut self.loading_more_transfers,
        }
    }

    fn clear(&mut self) {
        self.lists_generation = self.generation;
        self.address = None;
        self.contract = None;
        self.transactions.clear();
        self.transfers.clear();
        self.analytics = None;
        self.price = None;
        self.tx_page = 0;
        self.transfer_page = 0;
    }
}

/// One fetched page, before it is appended.
enum Page {
    Transactions(Vec<Transaction>),
    Transfers(Vec<TokenTransfer>),
}

impl Page {
    fn len(&self) -> usize {
        match self {
            Page::Transactions(items) => items.len(),
            Page::Transfers(items) => items.len(),
        }
    }
}

/// Session-scoped dashboard context.
///
/// All methods take `&self`; state lives behind a mutex that is never held
/// across an await, so loads, page loads and refreshes may interleave.
pub struct DashboardSession<S> {
    source: S,
    feed: Option<Arc<dyn EventFeed>>,
    page_size: u32,
    refresh_interval: Duration,
    state: Mutex<DashboardState>,
    live: Mutex<LiveUpdates>,
    pushed_tx: mpsc::Sender<ContractAddress>,
    pushed_rx: Mutex<Option<mpsc::Receiver<ContractAddress>>>,
}

/// Pushed events waiting for the refresh loop. One pending refresh covers
/// any number of events.
const PUSHED_BACKLOG: usize = 1;

/// Who asked for a full load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    /// A search: failure clears the view.
    Search,
    /// A timed or pushed reload: failure keeps the view so the next one can retry.
    Refresh,
}

impl<S: ContractDataSource> DashboardSession<S> {
    /// Build a session. Live updates use `settings.ws_url` when set.
    pub fn new(source: S, settings: &Settings) -> Self {
        let feed = settings
            .ws_url
            .as_ref()
            .map(|url| Arc::new(WsEventFeed::new(url.clone())) as Arc<dyn EventFeed>);
        let (pushed_tx, pushed_rx) = mpsc::channel(PUSHED_BACKLOG);

        Self {
            source,
            feed,
            page_size: settings.page_size.max(1),
            refresh_interval: settings.refresh_interval(),
            state: Mutex::new(DashboardState::default()),
            live: Mutex::new(LiveUpdates::None),
            pushed_tx,
            pushed_rx: Mutex::new(Some(pushed_rx)),
        }
    }

    /// Replace the live update feed.
    pub fn with_feed(mut self, feed: Option<Arc<dyn EventFeed>>) -> Self {
        self.feed = feed;
        self
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DashboardState {
        self.state().clone()
    }

    /// Contract the live channel currently listens to.
    pub fn live_address(&self) -> Option<ContractAddress> {
        self.live().address().cloned()
    }

    /// Search action: load `input` from scratch.
    pub async fn load_contract(&self, input: &str) -> Result<LoadOutcome, AppError> {
        let address = match ContractAddress::parse(input) {
            Ok(address) => address,
            Err(e) => {
                tracing::info!(input, "Rejected malformed address");
                self.state().error = Some(e.to_string());
                return Err(e);
            }
        };
        self.load(address, LoadKind::Search).await
    }

    /// Re-run the full load for the loaded contract. `None` when nothing is loaded.
    ///
    /// A failed refresh records the error but keeps the contract loaded, so
    /// the next tick retries it.
    pub async fn refresh(&self) -> Option<Result<LoadOutcome, AppError>> {
        let address = {
            let state = self.state();
            if !state.is_loaded() {
                return None;
            }
            state.address.clone()?
        };
        tracing::debug!(address = %address, "Refreshing contract");
        Some(self.load(address, LoadKind::Refresh).await)
    }

    /// Fetch the next page of `category` and append it.
    ///
    /// The page is dropped if other lists replaced the shown ones while it was
    /// in flight, including a load that had already started when it was requested.
    pub async fn load_more(&self, category: Category) -> LoadMore {
        let (address, page, lists_generation) = {
            let mut state = self.state();
            let Some(address) = state.address.clone() else {
                return LoadMore::Skipped;
            };
            if !state.is_loaded() || *state.loading_more_mut(category) {
                return LoadMore::Skipped;
            }
            *state.loading_more_mut(category) = true;
            (address, state.cursor(category) + 1, state.lists_generation)
        };

        tracing::debug!(address = %address, ?category, page, "Loading more");
        let fetched = match category {
            Category::Transactions => self
                .source
                .transactions(&address, page, self.page_size)
                .await
                .map(|p| Page::Transactions(p.transactions)),
            Category::Transfers => self
                .source
                .transfers(&address, page, self.page_size)
                .await
                .map(|p| Page::Transfers(p.transfers)),
        };

        let mut state = self.state();
        *state.loading_more_mut(category) = false;
        let replaced = state.lists_generation != lists_generation
            || state.address.as_ref() != Some(&address);
        if replaced {
            tracing::debug!(address = %address, ?category, page, "Dropping page for lists no longer shown");
            return LoadMore::Superseded;
        }

        let page_items = match fetched {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(address = %address, ?category, page, error = %e, "Error loading more");
                return LoadMore::Failed;
            }
        };

        let count = page_items.len();
        if count == 0 {
            return LoadMore::Exhausted;
        }
        match page_items {
            Page::Transactions(items) => {
                state.transactions.extend(items);
                state.tx_page = page;
            }
            Page::Transfers(items) => {
                state.transfers.extend(items);
                state.transfer_page = page;
            }
        }
        LoadMore::Appended(count)
    }

    /// Refresh on every tick of the refresh interval and on every pushed event
    /// for the active contract, until `shutdown` resolves. Tears the session
    /// down on exit.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let taken = self
            .pushed_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut pushed) = taken else {
            tracing::warn!("Refresh loop already running");
            return;
        };

        let period = self.refresh_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Stopping refresh loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.refresh_quietly().await;
                }
                Some(address) = pushed.recv() => {
                    // Several events from one block collapse into one refresh.
                    while pushed.try_recv().is_ok() {}
                    let active = self.state().address.clone();
                    if active.as_ref() == Some(&address) {
                        self.refresh_quietly().await;
                    } else {
                        tracing::debug!(address = %address, "Ignoring event for inactive contract");
                    }
                }
            }
        }

        *self.pushed_rx.lock().unwrap_or_else(PoisonError::into_inner) = Some(pushed);
        self.close();
    }

    /// Tear down the live channel.
    pub fn close(&self) {
        self.live().close();
    }

    async fn refresh_quietly(&self) {
        if let Some(Err(e)) = self.refresh().await {
            tracing::warn!(error = %e, "Refresh failed");
        }
    }

    async fn load(&self, address: ContractAddress, kind: LoadKind) -> Result<LoadOutcome, AppError> {
        let (generation, switching) = {
            let mut state = self.state();
            state.generation += 1;
            state.loading = true;
            state.error = None;
            (state.generation, state.address.as_ref() != Some(&address))
        };
        if switching {
            self.close();
        }

        tracing::info!(address = %address, generation, "Fetching contract");

        let contract = match self.source.contract(&address).await {
            Ok(contract) => contract,
            Err(e) => {
                let mut state = self.state();
                if state.generation != generation {
                    return Ok(LoadOutcome::Superseded);
                }
                tracing::warn!(address = %address, error = %e, ?kind, "Contract lookup failed");
                state.error = Some(e.to_string());
                state.loading = false;
                if kind == LoadKind::Refresh && !switching {
                    return Err(e);
                }
                state.clear();
                drop(state);
                self.close();
                return Err(e);
            }
        };

        let (transactions, transfers) = tokio::join!(
            self.source.transactions(&address, 1, self.page_size),
            self.source.transfers(&address, 1, self.page_size),
        );
        let transactions = transactions.map(|p| p.transactions).unwrap_or_else(|e| {
            tracing::warn!(address = %address, error = %e, "Transactions unavailable, continuing without them");
            Vec::new()
        });
        let transfers = transfers.map(|p| p.transfers).unwrap_or_else(|e| {
            tracing::warn!(address = %address, error = %e, "Transfers unavailable, continuing without them");
            Vec::new()
        });

        let analytics = aggregate(&transactions, &transfers);
        let is_token = contract.token_type.is_token();

        {
            let mut state = self.state();
            if state.generation != generation {
                tracing::debug!(address = %address, generation, "Dropping superseded load");
                return Ok(LoadOutcome::Superseded);
            }
            if switching || !is_token {
                state.price = None;
            }
            tracing::info!(
                address = %address,
                name = %contract.name,
                transactions = transactions.len(),
                transfers = transfers.len(),
                "Contract loaded"
            );
            state.lists_generation = generation;
            state.address = Some(address.clone());
            state.contract = Some(contract);
            state.transactions = transactions;
            state.transfers = transfers;
            state.analytics = analytics;
            state.tx_page = 1;
            state.transfer_page = 1;
            state.loading = false;
        }

        if is_token {
            self.fetch_price(&address, generation).await;
        }
        if self.is_current(generation) {
            self.ensure_live(&address);
        }

        Ok(LoadOutcome::Applied)
    }

    async fn fetch_price(&self, address: &ContractAddress, generation: u64) {
        match self.source.price(address).await {
            Ok(price) => {
                let mut state = self.state();
                if state.generation == generation {
                    state.price = Some(price);
                }
            }
            Err(e) => {
                tracing::info!(address = %address, error = %e, "Price data not available");
            }
        }
    }

    /// Open the live channel for `address` unless it is already listening.
    fn ensure_live(&self, address: &ContractAddress) {
        let mut live = self.live();
        if live.is_listening_to(address) {
            return;
        }
        live.close();

        let pushed = self.pushed_tx.clone();
        *live = LiveUpdates::open(
            self.feed.clone(),
            address,
            Arc::new(move |changed: &ContractAddress| {
                match pushed.try_send(changed.clone()) {
                    // A refresh is already queued.
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(address = %changed, "Session gone, dropping event");
                    }
                }
            }),
        );
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state().generation == generation
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live(&self) -> MutexGuard<'_, LiveUpdates> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
