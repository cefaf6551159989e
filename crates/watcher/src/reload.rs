//! Reload callback

use async_trait::async_trait;
use std::future::Future;

/// Operation run once per debounced burst of changes
///
/// Failures are logged by the session; the watch keeps running and the next
/// change triggers another attempt.
#[async_trait]
pub trait Reload: Send + Sync + 'static {
    async fn reload(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> Reload for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn reload(&self) -> anyhow::Result<()> {
        (self)().await
    }
}
