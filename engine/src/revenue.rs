use crate::aggregator::Aggregator;
use alloy_primitives::Address;
use anyhow::Result;
use market_core::{scaled_product, ChainReader, RevenueSummary};

impl<R: ChainReader + ?Sized> Aggregator<R> {
    /// Revenue figures for one token as seen by `holder`. Unlike the batch
    /// views a failed read is returned to the caller.
    pub async fn token_revenue(&self, token: Address, holder: Address) -> Result<RevenueSummary> {
        let (total_supply, revenue_per_share, pending, claimable) = tokio::try_join!(
            self.reader.total_supply(token),
            self.reader.revenue_per_share(token),
            self.reader.pending_revenue(token, holder),
            self.reader.claimable_revenue(token, holder),
        )?;
        Ok(RevenueSummary {
            token_address: token,
            total_supply,
            revenue_per_share,
            total_revenue: scaled_product(total_supply, revenue_per_share),
            pending,
            claimable,
        })
    }
}
