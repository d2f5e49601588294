// Change Notifier Port
//
// Subscribers only learn that *something* changed. Event payloads are routing
// hints for filtering; consumers must re-fetch authoritative state.

use crate::domain::ShopId;
use tokio::sync::broadcast;

/// Default broadcast buffer; slower subscribers lag and get a coalesced signal
pub const DEFAULT_NOTIFIER_CAPACITY: usize = 256;

/// Tables that emit row changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    QueueEntries,
    Shops,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
}

/// One row-level change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: String,
    /// Shop the row belongs to (the row itself for `Table::Shops`)
    pub shop_id: Option<ShopId>,
}

impl ChangeEvent {
    pub fn entry(
        kind: ChangeKind,
        entry_id: impl Into<String>,
        shop_id: impl Into<String>,
    ) -> Self {
        Self {
            table: Table::QueueEntries,
            kind,
            row_id: entry_id.into(),
            shop_id: Some(shop_id.into()),
        }
    }

    pub fn shop(kind: ChangeKind, shop_id: impl Into<String>) -> Self {
        let shop_id = shop_id.into();
        Self {
            table: Table::Shops,
            kind,
            row_id: shop_id.clone(),
            shop_id: Some(shop_id),
        }
    }
}

/// Subscription predicate; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: Option<Table>,
    pub shop_id: Option<ShopId>,
}

impl ChangeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn table(table: Table) -> Self {
        Self {
            table: Some(table),
            shop_id: None,
        }
    }

    /// Entry and shop changes of one shop
    pub fn shop(shop_id: impl Into<String>) -> Self {
        Self {
            table: None,
            shop_id: Some(shop_id.into()),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        let table_ok = self.table.map_or(true, |t| t == event.table);
        let shop_ok = match (&self.shop_id, &event.shop_id) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted == actual,
            (Some(_), None) => false,
        };
        table_ok && shop_ok
    }
}

/// "Re-fetch now" signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSignal {
    /// Events dropped because the subscriber lagged (folded into this signal)
    pub missed: u64,
}

/// Handle yielding refresh signals until the notifier goes away
///
/// Dropping it has no effect on stored state. Resubscribe to restart.
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
}

impl Subscription {
    pub fn new(rx: broadcast::Receiver<ChangeEvent>, filter: ChangeFilter) -> Self {
        Self { rx, filter }
    }

    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    /// Wait for the next matching change
    ///
    /// Returns `None` once the notifier is closed.
    pub async fn next(&mut self) -> Option<RefreshSignal> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(RefreshSignal { missed: 0 });
                }
                Ok(_) => continue,
                // Lost events may have matched; one refresh covers them all
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    return Some(RefreshSignal { missed });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Change notifier port
pub trait ChangeNotifier: Send + Sync {
    /// Start observing changes matching `filter`
    fn subscribe(&self, filter: ChangeFilter) -> Subscription;

    /// Announce a committed change (best-effort, never fails the write)
    fn publish(&self, event: ChangeEvent);
}

/// In-process notifier backed by a tokio broadcast channel
pub struct BroadcastChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl BroadcastChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFIER_CAPACITY)
    }
}

impl ChangeNotifier for BroadcastChangeNotifier {
    fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        Subscription::new(self.tx.subscribe(), filter)
    }

    fn publish(&self, event: ChangeEvent) {
        // Err only means nobody is listening right now
        if self.tx.send(event).is_err() {
            tracing::trace!("Change published with no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_subscription_receives_matching_events() {
        let notifier = BroadcastChangeNotifier::default();
        let mut sub = notifier.subscribe(ChangeFilter::shop("shop-1"));

        notifier.publish(ChangeEvent::entry(ChangeKind::Insert, "e-1", "shop-2"));
        notifier.publish(ChangeEvent::entry(ChangeKind::Insert, "e-2", "shop-1"));

        let signal = sub.next().await;
        assert_eq!(signal, Some(RefreshSignal { missed: 0 }));

        // Nothing else pending for shop-1
        let pending = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_subscription_ends_when_notifier_dropped() {
        let notifier = BroadcastChangeNotifier::default();
        let mut sub = notifier.subscribe(ChangeFilter::all());
        drop(notifier);
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_gets_single_coalesced_signal() {
        let notifier = BroadcastChangeNotifier::new(2);
        let mut sub = notifier.subscribe(ChangeFilter::all());
        for i in 0..5 {
            notifier.publish(ChangeEvent::shop(ChangeKind::Update, format!("s-{}", i)));
        }
        let first = sub.next().await.unwrap();
        assert!(first.missed > 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_harmless() {
        let notifier = BroadcastChangeNotifier::default();
        notifier.publish(ChangeEvent::shop(ChangeKind::Insert, "s-1"));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_filter_matching() {
        let event = ChangeEvent::entry(ChangeKind::Update, "e-1", "shop-1");
        assert!(ChangeFilter::all().matches(&event));
        assert!(ChangeFilter::table(Table::QueueEntries).matches(&event));
        assert!(!ChangeFilter::table(Table::Shops).matches(&event));
        assert!(ChangeFilter::shop("shop-1").matches(&event));
        assert!(!ChangeFilter::shop("shop-9").matches(&event));
    }
}
