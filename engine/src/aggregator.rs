use alloy_primitives::Address;
use futures::future::join_all;
use market_core::{ChainReader, MarketConfig, Metrics};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Read-only view over the marketplace contracts. Each public method is an
/// independent aggregation; nothing is shared between calls except the
/// reader and the metrics handles.
pub struct Aggregator<R: ChainReader + ?Sized> {
    pub(crate) reader: Arc<R>,
    pub(crate) platform: Address,
    pub(crate) payment_token: Address,
    pub(crate) start_block: u64,
    pub(crate) window_blocks: u64,
    pub(crate) max_concurrent_reads: usize,
    pub(crate) metrics: Arc<Metrics>,
}

impl<R: ChainReader + ?Sized> Aggregator<R> {
    pub fn new(reader: Arc<R>, cfg: &MarketConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            reader,
            platform: cfg.contracts.platform,
            payment_token: cfg.contracts.payment_token,
            start_block: cfg.start_block,
            window_blocks: cfg.log_window_blocks,
            max_concurrent_reads: cfg.max_concurrent_reads.max(1),
            metrics,
        }
    }

    /// Runs `f` over `items` with at most `max_concurrent_reads` in flight.
    /// Output order follows input order.
    pub(crate) async fn fan_out<T, F, Fut>(&self, items: Vec<T>, f: F) -> Vec<Fut::Output>
    where
        F: Fn(T) -> Fut,
        Fut: Future,
    {
        let limiter = Semaphore::new(self.max_concurrent_reads);
        let limiter = &limiter;
        let futs = items.into_iter().map(|item| {
            let fut = f(item);
            async move {
                let _permit = limiter.acquire().await.ok();
                fut.await
            }
        });
        join_all(futs).await
    }
}

impl<R: ChainReader + ?Sized> Clone for Aggregator<R> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            platform: self.platform,
            payment_token: self.payment_token,
            start_block: self.start_block,
            window_blocks: self.window_blocks,
            max_concurrent_reads: self.max_concurrent_reads,
            metrics: self.metrics.clone(),
        }
    }
}
