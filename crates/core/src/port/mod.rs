// Port Layer - Interfaces for external collaborators

pub mod change_notifier;
pub mod geocoder;
pub mod id_provider; // For deterministic testing
pub mod loader;
pub mod queue_repository;
pub mod shop_repository;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use change_notifier::{
    BroadcastChangeNotifier, ChangeEvent, ChangeFilter, ChangeKind, ChangeNotifier,
    RefreshSignal, Subscription, Table,
};
pub use geocoder::{DisabledGeocoder, GeoBias, Geocoder};
pub use id_provider::IdProvider;
pub use loader::{LazyLoader, ResourceLoader};
pub use queue_repository::QueueRepository;
pub use shop_repository::ShopRepository;
pub use time_provider::TimeProvider;
pub use transaction::{QueueRepositoryTransaction, Transaction, TransactionalQueueRepository};
