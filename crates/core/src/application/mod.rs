// Application Layer - Use Cases and Business Logic

pub mod analytics;
pub mod constants;
pub mod discovery;
pub mod queue;
pub mod shop_setup;
pub mod shutdown;
pub mod watcher;

// Re-exports
pub use analytics::AnalyticsService;
pub use discovery::{rank_by_distance, ShopDiscovery, ShopListing};
pub use queue::{CustomerQueueStatus, JoinRequest, QueueConfig, QueueService, QueueView};
pub use shop_setup::{CreateShopRequest, ShopService};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use watcher::{QueueWatcher, WatchOutcome};
