//! RPC Method Handlers
//!
//! Thin translation between JSON-RPC params and the application services.

use crate::error::to_rpc_error;
use crate::types::{
    AnalyticsRequest, CallNextRequest, CallNextResponse, CompleteRequest, CreateShopRequest,
    CustomerStatusRequest, CustomerStatusResponse, DiscoverRequest, DiscoverResponse,
    JoinQueueRequest, LeaveQueueRequest, SetOpenRequest, ShopViewRequest, ShopViewResponse,
    UpdateLocationRequest,
};
use jsonrpsee::types::ErrorObjectOwned;
use queueease_core::application::{
    AnalyticsService, JoinRequest, QueueService, ShopDiscovery, ShopService,
};
use queueease_core::domain::analytics::utc_date;
use queueease_core::domain::{DailyAnalytics, GeoPoint, QueueEntry, Shop};
use queueease_core::error::AppError;
use queueease_core::port::TimeProvider;
use std::sync::Arc;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected services
pub struct RpcHandler {
    queue: Arc<QueueService>,
    shops: Arc<ShopService>,
    discovery: Arc<ShopDiscovery>,
    analytics: Arc<AnalyticsService>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RpcHandler {
    pub fn new(
        queue: Arc<QueueService>,
        shops: Arc<ShopService>,
        discovery: Arc<ShopDiscovery>,
        analytics: Arc<AnalyticsService>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            queue,
            shops,
            discovery,
            analytics,
            time_provider,
        }
    }

    /// queue.join.v1
    pub async fn join(&self, params: JoinQueueRequest) -> RpcResult<QueueEntry> {
        let req = JoinRequest {
            shop_id: params.shop_id,
            customer_id: params.customer_id,
            notes: params.notes,
        };
        self.queue.join(req).await.map_err(to_rpc_error)
    }

    /// queue.leave.v1
    pub async fn leave(&self, params: LeaveQueueRequest) -> RpcResult<QueueEntry> {
        self.queue
            .leave(&params.entry_id, params.customer_id.as_deref())
            .await
            .map_err(to_rpc_error)
    }

    /// queue.call_next.v1
    pub async fn call_next(&self, params: CallNextRequest) -> RpcResult<CallNextResponse> {
        let called = self
            .queue
            .call_next(&params.shop_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(CallNextResponse { called })
    }

    /// queue.complete.v1
    pub async fn complete(&self, params: CompleteRequest) -> RpcResult<QueueEntry> {
        self.queue
            .complete(&params.entry_id, params.shop_id.as_deref())
            .await
            .map_err(to_rpc_error)
    }

    /// queue.view.v1
    pub async fn shop_view(&self, params: ShopViewRequest) -> RpcResult<ShopViewResponse> {
        let view = self
            .queue
            .shop_view(&params.shop_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(view.into())
    }

    /// queue.status.v1
    pub async fn customer_status(
        &self,
        params: CustomerStatusRequest,
    ) -> RpcResult<CustomerStatusResponse> {
        let status = self
            .queue
            .customer_status(&params.customer_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(status.into())
    }

    /// shop.create.v1
    pub async fn create_shop(&self, params: CreateShopRequest) -> RpcResult<Shop> {
        self.shops.create_shop(params).await.map_err(to_rpc_error)
    }

    /// shop.set_open.v1
    pub async fn set_open(&self, params: SetOpenRequest) -> RpcResult<Shop> {
        self.shops
            .set_open(&params.shop_id, params.owner_id.as_deref(), params.is_open)
            .await
            .map_err(to_rpc_error)
    }

    /// shop.update_location.v1
    pub async fn update_location(&self, params: UpdateLocationRequest) -> RpcResult<Shop> {
        let owner = params.owner_id.as_deref();
        if params.from_address {
            return self
                .shops
                .relocate_from_address(&params.shop_id, owner, params.search_near)
                .await
                .map_err(to_rpc_error);
        }

        let point = match (params.latitude, params.longitude) {
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).map_err(|e| to_rpc_error(e.into()))?,
            _ => {
                return Err(to_rpc_error(AppError::Validation(
                    "latitude and longitude are required unless from_address is set".to_string(),
                )))
            }
        };
        self.shops
            .update_location(&params.shop_id, owner, point)
            .await
            .map_err(to_rpc_error)
    }

    /// shop.discover.v1
    pub async fn discover(&self, params: DiscoverRequest) -> RpcResult<DiscoverResponse> {
        let origin = match (params.latitude, params.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            (None, None) => None,
            _ => {
                return Err(to_rpc_error(AppError::Validation(
                    "latitude and longitude must be given together".to_string(),
                )))
            }
        };
        let shops = self
            .discovery
            .list_open_shops(origin)
            .await
            .map_err(to_rpc_error)?;
        Ok(DiscoverResponse { shops })
    }

    /// shop.analytics.v1
    pub async fn analytics(&self, params: AnalyticsRequest) -> RpcResult<DailyAnalytics> {
        let date = match params.date {
            Some(d) => d,
            None => utc_date(self.time_provider.now_millis()).ok_or_else(|| {
                to_rpc_error(AppError::Internal("Clock out of range".to_string()))
            })?,
        };
        self.analytics
            .daily(&params.shop_id, date)
            .await
            .map_err(to_rpc_error)
    }
}
