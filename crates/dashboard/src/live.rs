//! Optional push notifications for the active contract.
//!
//! A session holds exactly one [`LiveUpdates`]. Without a configured feed it
//! stays [`LiveUpdates::None`] and the session relies on timed refreshes.

use alloy::{
    primitives::Address,
    providers::{Provider, ProviderBuilder, WsConnect},
    rpc::types::Filter,
};
use async_trait::async_trait;
use contractscope_core::ContractAddress;
use futures::{StreamExt, stream::BoxStream};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Callback fired once per pushed event for the subscribed contract.
pub type UpdateCallback = Arc<dyn Fn(&ContractAddress) + Send + Sync>;

/// A source of "something happened on this contract" events.
#[async_trait]
pub trait EventFeed: Send + Sync {
    async fn subscribe(&self, address: &ContractAddress) -> eyre::Result<BoxStream<'static, ()>>;
}

/// `eth_subscribe("logs", {address})` over a websocket RPC endpoint.
#[derive(Debug, Clone)]
pub struct WsEventFeed {
    url: String,
}

impl WsEventFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl EventFeed for WsEventFeed {
    async fn subscribe(&self, address: &ContractAddress) -> eyre::Result<BoxStream<'static, ()>> {
        let contract: Address = address.as_str().parse()?;
        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(self.url.clone()))
            .await?;
        tracing::info!(address = %address, "Websocket connected");

        let subscription = provider
            .subscribe_logs(&Filter::new().address(contract))
            .await?;

        // The provider rides along in the stream state so the socket lives as
        // long as the subscription.
        let logs = Box::pin(subscription.into_stream());
        let stream = futures::stream::unfold((provider, logs), |(provider, mut logs)| async move {
            let log = logs.next().await?;
            tracing::debug!(block = ?log.block_number, "New contract event");
            Some(((), (provider, logs)))
        });
        Ok(stream.boxed())
    }
}

/// Handle on a running subscription task. Dropping it aborts the task.
#[derive(Debug)]
pub struct Subscription {
    address: ContractAddress,
    task: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The session's live update channel.
#[derive(Debug, Default)]
pub enum LiveUpdates {
    #[default]
    None,
    Subscribed(Subscription),
}

impl LiveUpdates {
    /// Start listening for `address` on `feed`, or stay [`LiveUpdates::None`]
    /// when no feed is configured.
    ///
    /// Connection happens in the background; a failure there is logged and the
    /// task ends, leaving the session on polling alone. Must be called from
    /// within a tokio runtime.
    pub fn open(
        feed: Option<Arc<dyn EventFeed>>,
        address: &ContractAddress,
        on_update: UpdateCallback,
    ) -> Self {
        let Some(feed) = feed else {
            tracing::debug!("Live updates not configured, using polling instead");
            return LiveUpdates::None;
        };

        let target = address.clone();
        let task = tokio::spawn(async move {
            let mut events = match feed.subscribe(&target).await {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!(address = %target, error = %e, "Failed to set up live updates");
                    return;
                }
            };
            while events.next().await.is_some() {
                on_update(&target);
            }
            tracing::info!(address = %target, "Live update stream closed");
        });

        LiveUpdates::Subscribed(Subscription {
            address: address.clone(),
            task,
        })
    }

    /// Contract this channel listens to, if any.
    pub fn address(&self) -> Option<&ContractAddress> {
        match self {
            LiveUpdates::None => None,
            LiveUpdates::Subscribed(sub) => Some(&sub.address),
        }
    }

    /// Whether a subscription for `address` is still running.
    pub fn is_listening_to(&self, address: &ContractAddress) -> bool {
        match self {
            LiveUpdates::None => false,
            LiveUpdates::Subscribed(sub) => sub.address == *address && !sub.task.is_finished(),
        }
    }

    /// Tear the channel down.
    pub fn close(&mut self) {
        if let LiveUpdates::Subscribed(sub) = std::mem::take(self) {
            tracing::debug!(address = %sub.address, "Closing live updates");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Feed driven by the test through an unbounded channel per subscription.
    #[derive(Default)]
    pub(crate) struct ChannelFeed {
        senders: Mutex<Vec<(ContractAddress, mpsc::UnboundedSender<()>)>>,
        pub(crate) fail: bool,
    }

    impl ChannelFeed {
        /// Push an event to every live subscriber of `address`.
        pub(crate) fn emit(&self, address: &ContractAddress) -> usize {
            let senders = self.senders.lock().unwrap();
            senders
                .iter()
                .filter(|(a, tx)| a == address && tx.send(()).is_ok())
                .count()
        }

        pub(crate) fn subscriptions(&self) -> usize {
            self.senders.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EventFeed for ChannelFeed {
        async fn subscribe(
            &self,
            address: &ContractAddress,
        ) -> eyre::Result<BoxStream<'static, ()>> {
            if self.fail {
                eyre::bail!("connection refused");
            }
            let (tx, rx) = mpsc::unbounded_channel();
            self.senders.lock().unwrap().push((address.clone(), tx));
            Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            })
            .boxed())
        }
    }

    fn address(n: u8) -> ContractAddress {
        ContractAddress::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn counter() -> (Arc<AtomicUsize>, UpdateCallback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let cb_hits = hits.clone();
        (hits, Arc::new(move |_: &ContractAddress| {
            cb_hits.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn no_feed_means_no_channel() {
        let (_, cb) = counter();
        let live = LiveUpdates::open(None, &address(1), cb);
        assert!(matches!(live, LiveUpdates::None));
        assert_eq!(live.address(), None);
    }

    #[tokio::test]
    async fn events_reach_the_callback() {
        let feed = Arc::new(ChannelFeed::default());
        let (hits, cb) = counter();
        let live = LiveUpdates::open(Some(feed.clone()), &address(1), cb);
        settle().await;

        assert!(live.is_listening_to(&address(1)));
        assert!(!live.is_listening_to(&address(2)));
        assert_eq!(feed.emit(&address(1)), 1);
        feed.emit(&address(1));
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn closing_stops_delivery() {
        let feed = Arc::new(ChannelFeed::default());
        let (hits, cb) = counter();
        let mut live = LiveUpdates::open(Some(feed.clone()), &address(1), cb);
        settle().await;

        live.close();
        settle().await;
        assert!(matches!(live, LiveUpdates::None));
        assert_eq!(feed.emit(&address(1)), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_subscription_degrades_quietly() {
        let feed = Arc::new(ChannelFeed {
            fail: true,
            ..Default::default()
        });
        let (_, cb) = counter();
        let live = LiveUpdates::open(Some(feed), &address(1), cb);
        settle().await;
        assert!(!live.is_listening_to(&address(1)));
    }
}
