// QueueEase Infrastructure - SQLite Adapter
// Implements: QueueRepository, TransactionalQueueRepository, ShopRepository

mod connection;
mod error;
mod migration;
mod queue_repository;
mod shop_repository;
mod transaction;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use queue_repository::SqliteQueueRepository;
pub use shop_repository::SqliteShopRepository;
pub use transaction::SqliteQueueTransaction;
