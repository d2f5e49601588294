// SQLite ShopRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use queueease_core::domain::{GeoPoint, Shop, DEFAULT_AVERAGE_SERVICE_TIME};
use queueease_core::error::{AppError, Result};
use queueease_core::port::{ChangeEvent, ChangeKind, ChangeNotifier, ShopRepository};
use sqlx::sqlite::SqliteQueryResult;
use sqlx::SqlitePool;
use std::sync::Arc;

const SHOP_COLUMNS: &str = "id, owner_id, name, address, latitude, longitude, is_open, \
     average_service_time, rating, price_range, phone, description, created_at";

pub struct SqliteShopRepository {
    pool: SqlitePool,
    notifier: Arc<dyn ChangeNotifier>,
}

impl SqliteShopRepository {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { pool, notifier }
    }

    fn ensure_touched(id: &str, result: SqliteQueryResult) -> Result<()> {
        if result.rows_affected() == 0 {
            Err(AppError::NotFound(format!("Shop {} not found", id)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ShopRepository for SqliteShopRepository {
    async fn insert(&self, shop: &Shop) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shops (
                id, owner_id, name, address, latitude, longitude, is_open,
                average_service_time, rating, price_range, phone, description, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&shop.id)
        .bind(&shop.owner_id)
        .bind(&shop.name)
        .bind(&shop.address)
        .bind(shop.latitude)
        .bind(shop.longitude)
        .bind(shop.is_open)
        .bind(i64::from(shop.average_service_time))
        .bind(shop.rating)
        .bind(&shop.price_range)
        .bind(&shop.phone)
        .bind(&shop.description)
        .bind(shop.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.notifier
            .publish(ChangeEvent::shop(ChangeKind::Insert, &shop.id));
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Shop>> {
        let sql = format!("SELECT {} FROM shops WHERE id = ?", SHOP_COLUMNS);
        let row = sqlx::query_as::<_, ShopRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ShopRow::into_shop))
    }

    async fn list_open(&self) -> Result<Vec<Shop>> {
        let sql = format!(
            "SELECT {} FROM shops WHERE is_open = 1 ORDER BY created_at ASC, id ASC",
            SHOP_COLUMNS
        );
        let rows = sqlx::query_as::<_, ShopRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ShopRow::into_shop).collect())
    }

    async fn set_open(&self, id: &str, is_open: bool) -> Result<()> {
        let result = sqlx::query("UPDATE shops SET is_open = ? WHERE id = ?")
            .bind(is_open)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Self::ensure_touched(id, result)?;

        self.notifier.publish(ChangeEvent::shop(ChangeKind::Update, id));
        Ok(())
    }

    async fn set_location(&self, id: &str, point: Option<GeoPoint>) -> Result<()> {
        let result = sqlx::query("UPDATE shops SET latitude = ?, longitude = ? WHERE id = ?")
            .bind(point.map(|p| p.lat))
            .bind(point.map(|p| p.lng))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Self::ensure_touched(id, result)?;

        self.notifier.publish(ChangeEvent::shop(ChangeKind::Update, id));
        Ok(())
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    id: String,
    owner_id: Option<String>,
    name: String,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    is_open: bool,
    average_service_time: i64,
    rating: Option<f64>,
    price_range: Option<String>,
    phone: Option<String>,
    description: Option<String>,
    created_at: i64,
}

impl ShopRow {
    fn into_shop(self) -> Shop {
        Shop {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            is_open: self.is_open,
            // CHECK constraint keeps this in 1..=480
            average_service_time: u32::try_from(self.average_service_time)
                .unwrap_or(DEFAULT_AVERAGE_SERVICE_TIME),
            rating: self.rating,
            price_range: self.price_range,
            phone: self.phone,
            description: self.description,
            created_at: self.created_at,
        }
    }
}
