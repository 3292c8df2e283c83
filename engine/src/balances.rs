use crate::aggregator::Aggregator;
use alloy_primitives::{Address, U256};
use market_core::ChainReader;
use tracing::warn;

impl<R: ChainReader + ?Sized> Aggregator<R> {
    /// `holder`'s balance of each token, aligned with `tokens`. A failed read
    /// counts as zero and never affects the other tokens.
    pub async fn resolve_balances(&self, tokens: &[Address], holder: Address) -> Vec<U256> {
        let reader = &self.reader;
        let metrics = &self.metrics;
        self.fan_out(tokens.to_vec(), |token| async move {
            match reader.balance_of(token, holder).await {
                Ok(balance) => balance,
                Err(err) => {
                    metrics.item_reads_failed.inc();
                    warn!(target: "aggregate", ?err, %token, %holder, "balanceOf failed, treating as zero");
                    U256::ZERO
                }
            }
        })
        .await
    }
}
