// Queue Watcher - pushes fresh views to an observer whenever the queue changes

use crate::application::constants::{MAX_REFRESH_ATTEMPTS, REFRESH_RETRY_DELAY};
use crate::application::queue::{CustomerQueueStatus, QueueService, QueueView};
use crate::application::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::{ChangeFilter, ChangeNotifier, RefreshSignal, Table};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why a watch loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Change notifier went away
    SubscriptionClosed,
    /// Receiving half of the sink was dropped
    ObserverGone,
    Shutdown,
}

enum Wake {
    Signal(Option<RefreshSignal>),
    ObserverGone,
    Shutdown,
}

pub struct QueueWatcher {
    queue: Arc<QueueService>,
    notifier: Arc<dyn ChangeNotifier>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl QueueWatcher {
    pub fn new(queue: Arc<QueueService>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            queue,
            notifier,
            max_attempts: MAX_REFRESH_ATTEMPTS,
            retry_delay: REFRESH_RETRY_DELAY,
        }
    }

    /// Override refresh retry policy
    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Stream the operator view of `shop_id` into `sink`
    pub async fn watch_shop(
        &self,
        shop_id: &str,
        sink: mpsc::Sender<QueueView>,
        shutdown: ShutdownToken,
    ) -> WatchOutcome {
        let queue = Arc::clone(&self.queue);
        let shop = shop_id.to_string();
        self.run(
            "shop",
            shop_id,
            ChangeFilter::shop(shop_id),
            sink,
            shutdown,
            move || {
                let queue = Arc::clone(&queue);
                let shop = shop.clone();
                async move { queue.shop_view(&shop).await }
            },
        )
        .await
    }

    /// Stream a customer's status into `sink` (`None` while not queued)
    pub async fn watch_customer(
        &self,
        customer_id: &str,
        sink: mpsc::Sender<Option<CustomerQueueStatus>>,
        shutdown: ShutdownToken,
    ) -> WatchOutcome {
        let queue = Arc::clone(&self.queue);
        let customer = customer_id.to_string();
        // Positions move whenever anyone at the customer's shop changes
        self.run(
            "customer",
            customer_id,
            ChangeFilter::table(Table::QueueEntries),
            sink,
            shutdown,
            move || {
                let queue = Arc::clone(&queue);
                let customer = customer.clone();
                async move { queue.customer_status(&customer).await }
            },
        )
        .await
    }

    async fn run<T, F, Fut>(
        &self,
        kind: &'static str,
        key: &str,
        filter: ChangeFilter,
        sink: mpsc::Sender<T>,
        mut shutdown: ShutdownToken,
        fetch: F,
    ) -> WatchOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Subscribe before the first fetch so no change slips in between
        let mut subscription = self.notifier.subscribe(filter);
        info!(kind, key, "Watcher started");

        if let Some(view) = self.fetch_with_retry(kind, key, &fetch, &mut shutdown).await {
            if sink.send(view).await.is_err() {
                return Self::finish(kind, key, WatchOutcome::ObserverGone);
            }
        }

        loop {
            let wake = tokio::select! {
                _ = shutdown.wait() => Wake::Shutdown,
                _ = sink.closed() => Wake::ObserverGone,
                signal = subscription.next() => Wake::Signal(signal),
            };

            match wake {
                Wake::Shutdown => return Self::finish(kind, key, WatchOutcome::Shutdown),
                Wake::ObserverGone => return Self::finish(kind, key, WatchOutcome::ObserverGone),
                Wake::Signal(None) => {
                    return Self::finish(kind, key, WatchOutcome::SubscriptionClosed)
                }
                Wake::Signal(Some(signal)) => {
                    if signal.missed > 0 {
                        debug!(
                            kind,
                            key,
                            missed = signal.missed,
                            "Watcher lagged, refreshing once"
                        );
                    }
                    if let Some(view) = self
                        .fetch_with_retry(kind, key, &fetch, &mut shutdown)
                        .await
                    {
                        if sink.send(view).await.is_err() {
                            return Self::finish(kind, key, WatchOutcome::ObserverGone);
                        }
                    }
                }
            }
        }
    }

    /// Fetch with bounded retries; a failed round is skipped, never surfaced
    async fn fetch_with_retry<T, F, Fut>(
        &self,
        kind: &'static str,
        key: &str,
        fetch: &F,
        shutdown: &mut ShutdownToken,
    ) -> Option<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        for attempt in 1..=self.max_attempts {
            match fetch().await {
                Ok(view) => return Some(view),
                Err(e) if e.is_external() && attempt < self.max_attempts => {
                    warn!(kind, key, attempt, error = %e, "Refresh failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay) => {}
                        _ = shutdown.wait() => return None,
                    }
                }
                Err(e) => {
                    warn!(kind, key, attempt, error = %e, "Refresh skipped");
                    return None;
                }
            }
        }
        None
    }

    fn finish(kind: &'static str, key: &str, outcome: WatchOutcome) -> WatchOutcome {
        info!(kind, key, ?outcome, "Watcher stopped");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::queue::{JoinRequest, QueueConfig};
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::Shop;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::queue_repository::mocks::InMemoryQueueStore;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use crate::port::{BroadcastChangeNotifier, ShopRepository};

    const WAIT: Duration = Duration::from_secs(2);

    async fn setup() -> (Arc<QueueService>, Arc<BroadcastChangeNotifier>) {
        let notifier = Arc::new(BroadcastChangeNotifier::default());
        let store = InMemoryQueueStore::new(notifier.clone());
        ShopRepository::insert(&store, &Shop::new("shop-1", "Fade Factory", "1 Main St", 0))
            .await
            .unwrap();
        let service = QueueService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            Arc::new(SequentialIdProvider::new("entry")),
            Arc::new(ManualTimeProvider::new(1_000)),
            QueueConfig::default(),
        );
        (Arc::new(service), notifier)
    }

    fn join(customer: &str) -> JoinRequest {
        JoinRequest {
            shop_id: "shop-1".to_string(),
            customer_id: customer.to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_watch_shop_emits_initial_and_refreshed_views() {
        let (service, notifier) = setup().await;
        let watcher = QueueWatcher::new(service.clone(), notifier);
        let (tx, mut rx) = mpsc::channel(8);
        let (stop, token) = shutdown_channel();

        let handle = tokio::spawn(async move { watcher.watch_shop("shop-1", tx, token).await });

        let initial = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(initial.waiting_count(), 0);

        service.join(join("A")).await.unwrap();
        let refreshed = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(refreshed.waiting_count(), 1);
        assert_eq!(refreshed.waiting[0].position, Some(1));

        stop.shutdown();
        assert_eq!(handle.await.unwrap(), WatchOutcome::Shutdown);
    }

    #[tokio::test]
    async fn test_watch_stops_when_observer_drops() {
        let (service, notifier) = setup().await;
        let watcher = QueueWatcher::new(service, notifier);
        let (tx, mut rx) = mpsc::channel(8);
        let (_stop, token) = shutdown_channel();

        let handle = tokio::spawn(async move { watcher.watch_shop("shop-1", tx, token).await });
        rx.recv().await.unwrap();
        drop(rx);

        let outcome = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
        assert_eq!(outcome, WatchOutcome::ObserverGone);
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_stops_watch() {
        let (service, notifier) = setup().await;
        let watcher = QueueWatcher::new(service, notifier);
        let (tx, mut rx) = mpsc::channel(8);
        let (stop, token) = shutdown_channel();

        let handle = tokio::spawn(async move { watcher.watch_shop("shop-1", tx, token).await });
        rx.recv().await.unwrap();

        drop(stop);
        let outcome = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
        assert_eq!(outcome, WatchOutcome::Shutdown);
    }

    #[tokio::test]
    async fn test_closed_subscription_ends_watch() {
        let (service, _) = setup().await;
        // Hands out subscriptions whose sender is already gone
        struct ClosedNotifier;
        impl ChangeNotifier for ClosedNotifier {
            fn subscribe(&self, filter: ChangeFilter) -> crate::port::Subscription {
                let (tx, rx) = tokio::sync::broadcast::channel(1);
                drop(tx);
                crate::port::Subscription::new(rx, filter)
            }
            fn publish(&self, _event: crate::port::ChangeEvent) {}
        }

        let watcher = QueueWatcher::new(service, Arc::new(ClosedNotifier));
        let (tx, mut rx) = mpsc::channel(8);
        let (_stop, token) = shutdown_channel();

        let outcome = watcher.watch_shop("shop-1", tx, token).await;
        assert_eq!(outcome, WatchOutcome::SubscriptionClosed);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_shop_is_skipped_not_surfaced() {
        let (service, notifier) = setup().await;
        let watcher =
            QueueWatcher::new(service, notifier).with_retry(3, Duration::from_millis(1));
        let (tx, mut rx) = mpsc::channel::<QueueView>(8);
        let (stop, token) = shutdown_channel();

        let handle = tokio::spawn(async move { watcher.watch_shop("missing", tx, token).await });
        let nothing = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(nothing.is_err());

        stop.shutdown();
        assert_eq!(handle.await.unwrap(), WatchOutcome::Shutdown);
    }

    #[tokio::test]
    async fn test_watch_customer_follows_position() {
        let (service, notifier) = setup().await;
        let watcher = QueueWatcher::new(service.clone(), notifier);
        let (tx, mut rx) = mpsc::channel(8);
        let (stop, token) = shutdown_channel();

        let handle = tokio::spawn(async move { watcher.watch_customer("B", tx, token).await });
        assert_eq!(rx.recv().await.unwrap(), None);

        service.join(join("A")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), None);

        service.join(join("B")).await.unwrap();
        let status = rx.recv().await.unwrap().unwrap();
        assert_eq!(status.entry.position, Some(2));

        service.call_next("shop-1").await.unwrap();
        let status = rx.recv().await.unwrap().unwrap();
        assert_eq!(status.entry.position, Some(1));
        assert_eq!(status.people_ahead, 0);

        stop.shutdown();
        assert_eq!(handle.await.unwrap(), WatchOutcome::Shutdown);
    }
}
