// Lazy resource loader
//
// Injectable replacement for process-wide "load once" caches around external
// resources (HTTP clients, provider SDK handles). The handle is created on
// first use, shared afterwards, and needs no teardown.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Knows how to build one external resource
#[async_trait]
pub trait ResourceLoader<T>: Send + Sync {
    /// Human readable name for logs
    fn name(&self) -> &str;

    async fn load(&self) -> Result<T>;
}

/// Init-once, memoised handle over a [`ResourceLoader`]
///
/// Concurrent first callers share one load. A failed load is not memoised;
/// the next call tries again.
pub struct LazyLoader<T> {
    loader: Box<dyn ResourceLoader<T>>,
    cell: OnceCell<Arc<T>>,
}

impl<T: Send + Sync + 'static> LazyLoader<T> {
    pub fn new(loader: impl ResourceLoader<T> + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Get the handle, loading it on first use
    pub async fn get(&self) -> Result<Arc<T>> {
        let handle = self
            .cell
            .get_or_try_init(|| async {
                tracing::debug!(resource = %self.loader.name(), "Loading external resource");
                self.loader.load().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(handle))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}
