use crate::aggregator::Aggregator;
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use market_core::{ChainReader, ListingDetail};
use tracing::{info, warn};

impl<R: ChainReader + ?Sized> Aggregator<R> {
    /// One listing with its token's name and symbol, plus the payment-token
    /// balance of `buyer` when one is given.
    ///
    /// The listing and token reads are required. A failed balance read only
    /// leaves `buyer_balance` empty.
    pub async fn listing_detail(&self, listing_id: U256, buyer: Option<Address>) -> Result<ListingDetail> {
        let listing = self
            .reader
            .get_listing(self.platform, listing_id)
            .await
            .with_context(|| format!("read listing {}", listing_id))?;
        let token = listing.token_address;

        let balance = async {
            let buyer = buyer?;
            match self.reader.balance_of(self.payment_token, buyer).await {
                Ok(balance) => Some(balance),
                Err(err) => {
                    self.metrics.item_reads_failed.inc();
                    warn!(target: "aggregate", ?err, %buyer, "payment token balance unavailable");
                    None
                }
            }
        };
        let (names, buyer_balance) = tokio::join!(
            async {
                tokio::try_join!(self.reader.token_name(token), self.reader.token_symbol(token))
            },
            balance,
        );
        let (token_name, token_symbol) = names.with_context(|| format!("read token {}", token))?;

        info!(target: "aggregate", %listing_id, %token, active=%listing.active, "listing detail read");
        Ok(ListingDetail {
            listing,
            token_name,
            token_symbol,
            buyer_balance,
        })
    }
}
