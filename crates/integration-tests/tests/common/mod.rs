//! Shared SQLite-backed harness
#![allow(dead_code)]

use queueease_core::application::{JoinRequest, QueueConfig, QueueService};
use queueease_core::domain::{QueueEntry, Shop};
use queueease_core::port::id_provider::mocks::SequentialIdProvider;
use queueease_core::port::time_provider::mocks::ManualTimeProvider;
use queueease_core::port::{BroadcastChangeNotifier, ChangeNotifier, ShopRepository};
use queueease_infra_sqlite::{
    create_pool, run_migrations, SqliteQueueRepository, SqliteShopRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// 2023-11-14T22:13:20Z
pub const T0: i64 = 1_700_000_000_000;
pub const MINUTE: i64 = 60_000;

pub struct Stack {
    pub pool: SqlitePool,
    pub notifier: Arc<dyn ChangeNotifier>,
    pub queue_repo: Arc<SqliteQueueRepository>,
    pub shop_repo: Arc<SqliteShopRepository>,
    pub clock: Arc<ManualTimeProvider>,
    pub queue: Arc<QueueService>,
}

pub async fn stack(config: QueueConfig) -> Stack {
    stack_at(":memory:", config).await
}

/// Fresh database file path under the temp dir
pub fn temp_db(label: &str) -> String {
    std::env::temp_dir()
        .join(format!("queueease_{}_{}.db", label, uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string()
}

/// Remove a database file created by [`temp_db`] along with its WAL files
pub fn remove_db(url: &str) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", url, suffix));
    }
}

pub async fn stack_at(database_url: &str, config: QueueConfig) -> Stack {
    let pool = create_pool(database_url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let notifier: Arc<dyn ChangeNotifier> = Arc::new(BroadcastChangeNotifier::default());
    let queue_repo = Arc::new(SqliteQueueRepository::new(pool.clone(), notifier.clone()));
    let shop_repo = Arc::new(SqliteShopRepository::new(pool.clone(), notifier.clone()));
    let clock = Arc::new(ManualTimeProvider::new(T0));

    let queue = Arc::new(QueueService::new(
        queue_repo.clone(),
        queue_repo.clone(),
        shop_repo.clone(),
        Arc::new(SequentialIdProvider::new(format!("entry-{}", uuid::Uuid::new_v4()))),
        clock.clone(),
        config,
    ));

    Stack {
        pool,
        notifier,
        queue_repo,
        shop_repo,
        clock,
        queue,
    }
}

impl Stack {
    pub async fn add_shop(&self, id: &str, average_service_time: u32) -> Shop {
        let mut shop = Shop::new(id, format!("Shop {}", id), format!("{} Main St", id), T0);
        shop.average_service_time = average_service_time;
        self.shop_repo.insert(&shop).await.unwrap();
        shop
    }

    pub async fn add_shop_at(&self, id: &str, lat: f64, lng: f64) -> Shop {
        let mut shop = Shop::new(id, format!("Shop {}", id), format!("{} Main St", id), T0);
        shop.latitude = Some(lat);
        shop.longitude = Some(lng);
        self.shop_repo.insert(&shop).await.unwrap();
        shop
    }

    /// Join one minute after the previous join
    pub async fn join(&self, shop_id: &str, customer_id: &str) -> QueueEntry {
        self.clock.advance(MINUTE);
        self.queue
            .join(JoinRequest {
                shop_id: shop_id.to_string(),
                customer_id: customer_id.to_string(),
                notes: None,
            })
            .await
            .unwrap()
    }
}

/// `(customer, position, estimated wait)` of the waiting line
pub async fn waiting_line(queue: &QueueService, shop_id: &str) -> Vec<(String, u32, u32)> {
    queue
        .shop_view(shop_id)
        .await
        .unwrap()
        .waiting
        .into_iter()
        .map(|e| {
            (
                e.customer_id,
                e.position.unwrap_or_default(),
                e.estimated_wait_time.unwrap_or_default(),
            )
        })
        .collect()
}

pub fn line(entries: &[(&str, u32, u32)]) -> Vec<(String, u32, u32)> {
    entries
        .iter()
        .map(|(c, p, w)| (c.to_string(), *p, *w))
        .collect()
}
