//! JSON-RPC Server
//!
//! HTTP and WebSocket on one port. Subscriptions push fresh views whenever
//! the watched queue changes.

use crate::handler::RpcHandler;
use crate::types::{
    CustomerStatusRequest, CustomerStatusResponse, ShopViewRequest, ShopViewResponse,
};
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::server::{
    PendingSubscriptionSink, Server, ServerHandle, SubscriptionMessage, SubscriptionSink,
};
use jsonrpsee::types::{ErrorObjectOwned, Params};
use jsonrpsee::RpcModule;
use queueease_core::application::constants::WATCH_CHANNEL_CAPACITY;
use queueease_core::application::{QueueWatcher, ShutdownToken};
use queueease_core::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9630;

/// RPC Server configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// JSON-RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
    watcher: Arc<QueueWatcher>,
    shutdown: ShutdownToken,
}

impl RpcServer {
    pub fn new(
        config: RpcServerConfig,
        handler: RpcHandler,
        watcher: Arc<QueueWatcher>,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            watcher,
            shutdown,
        }
    }

    /// Build RPC module with all methods registered
    pub fn module(&self) -> Result<RpcModule<()>> {
        let mut module = RpcModule::new(());

        register(&mut module, "queue.join.v1", &self.handler, |h, req| async move {
            h.join(req).await
        })?;
        register(&mut module, "queue.leave.v1", &self.handler, |h, req| async move {
            h.leave(req).await
        })?;
        register(&mut module, "queue.call_next.v1", &self.handler, |h, req| async move {
            h.call_next(req).await
        })?;
        register(&mut module, "queue.complete.v1", &self.handler, |h, req| async move {
            h.complete(req).await
        })?;
        register(&mut module, "queue.view.v1", &self.handler, |h, req| async move {
            h.shop_view(req).await
        })?;
        register(&mut module, "queue.status.v1", &self.handler, |h, req| async move {
            h.customer_status(req).await
        })?;
        register(&mut module, "shop.create.v1", &self.handler, |h, req| async move {
            h.create_shop(req).await
        })?;
        register(&mut module, "shop.set_open.v1", &self.handler, |h, req| async move {
            h.set_open(req).await
        })?;
        register(&mut module, "shop.update_location.v1", &self.handler, |h, req| async move {
            h.update_location(req).await
        })?;
        register(&mut module, "shop.discover.v1", &self.handler, |h, req| async move {
            h.discover(req).await
        })?;
        register(&mut module, "shop.analytics.v1", &self.handler, |h, req| async move {
            h.analytics(req).await
        })?;

        let watcher = self.watcher.clone();
        let shutdown = self.shutdown.clone();
        module
            .register_subscription(
                "queue.subscribe_shop.v1",
                "queue.shop_view",
                "queue.unsubscribe_shop.v1",
                move |params, pending, _, _| {
                    let watcher = watcher.clone();
                    let shutdown = shutdown.clone();
                    async move { subscribe_shop(params, pending, watcher, shutdown).await }
                },
            )
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let watcher = self.watcher.clone();
        let shutdown = self.shutdown.clone();
        module
            .register_subscription(
                "queue.subscribe_status.v1",
                "queue.customer_status",
                "queue.unsubscribe_status.v1",
                move |params, pending, _, _| {
                    let watcher = watcher.clone();
                    let shutdown = shutdown.clone();
                    async move { subscribe_status(params, pending, watcher, shutdown).await }
                },
            )
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(module)
    }

    /// Bind and start serving; returns the bound address and a stop handle
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let module = self.module()?;

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| AppError::Config(format!("Cannot bind RPC server to {}: {}", addr, e)))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let handle = server.start(module);
        info!(addr = %local_addr, "RPC server started");

        Ok((local_addr, handle))
    }
}

/// Register one request/response method backed by the handler
fn register<Req, Resp, F, Fut>(
    module: &mut RpcModule<()>,
    method: &'static str,
    handler: &Arc<RpcHandler>,
    call: F,
) -> Result<()>
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Clone + Send + 'static,
    F: Fn(Arc<RpcHandler>, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Resp, ErrorObjectOwned>> + Send + 'static,
{
    let handler = handler.clone();
    module
        .register_async_method(method, move |params, _, _| {
            let handler = handler.clone();
            let call = call.clone();
            async move {
                let req: Req = params.parse()?;
                debug!(method, "RPC call");
                call(handler, req).await
            }
        })
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(())
}

async fn subscribe_shop(
    params: Params<'static>,
    pending: PendingSubscriptionSink,
    watcher: Arc<QueueWatcher>,
    shutdown: ShutdownToken,
) -> SubscriptionResult {
    let req: ShopViewRequest = match params.parse() {
        Ok(req) => req,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };

    let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
    let sink = pending.accept().await?;
    debug!(shop_id = %req.shop_id, "Shop subscription opened");

    let shop_id = req.shop_id;
    tokio::spawn(async move { watcher.watch_shop(&shop_id, tx, shutdown).await });

    forward(sink, rx, ShopViewResponse::from).await
}

async fn subscribe_status(
    params: Params<'static>,
    pending: PendingSubscriptionSink,
    watcher: Arc<QueueWatcher>,
    shutdown: ShutdownToken,
) -> SubscriptionResult {
    let req: CustomerStatusRequest = match params.parse() {
        Ok(req) => req,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };

    let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
    let sink = pending.accept().await?;
    debug!(customer_id = %req.customer_id, "Status subscription opened");

    let customer_id = req.customer_id;
    tokio::spawn(async move { watcher.watch_customer(&customer_id, tx, shutdown).await });

    forward(sink, rx, CustomerStatusResponse::from).await
}

/// Pump watcher output into the subscription until either side goes away
///
/// Dropping `rx` on return is what stops the watcher.
async fn forward<T, R>(
    sink: SubscriptionSink,
    mut rx: mpsc::Receiver<T>,
    convert: fn(T) -> R,
) -> SubscriptionResult
where
    R: Serialize,
{
    loop {
        tokio::select! {
            next = rx.recv() => {
                let Some(view) = next else { break };
                let msg = SubscriptionMessage::from_json(&convert(view))?;
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            _ = sink.closed() => break,
        }
    }
    Ok(())
}
