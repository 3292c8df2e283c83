use crate::aggregator::Aggregator;
use alloy_primitives::{Address, U256};
use anyhow::Result;
use market_core::{ChainReader, Listing};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Token address to the price per token of its active listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceIndex {
    prices: HashMap<Address, U256>,
}

impl PriceIndex {
    /// Later active listings replace earlier ones; inactive listings are ignored.
    pub fn from_listings<'a>(listings: impl IntoIterator<Item = &'a Listing>) -> Self {
        let mut prices = HashMap::new();
        for listing in listings.into_iter().filter(|l| l.active) {
            prices.insert(listing.token_address, listing.price_per_token);
        }
        Self { prices }
    }

    pub fn get(&self, token: &Address) -> Option<U256> {
        self.prices.get(token).copied()
    }

    /// Unlisted tokens are priced at zero.
    pub fn price_or_zero(&self, token: &Address) -> U256 {
        self.get(token).unwrap_or(U256::ZERO)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl<R: ChainReader + ?Sized> Aggregator<R> {
    /// One `getAllListings` read; the error is left to the caller.
    pub async fn try_price_index(&self) -> Result<PriceIndex> {
        let listings = self.reader.all_listings(self.platform).await?;
        let index = PriceIndex::from_listings(&listings);
        debug!(target: "aggregate", listings=%listings.len(), priced=%index.len(), "price index built");
        Ok(index)
    }

    /// Like `try_price_index`, but a failed read prices every token at zero.
    pub async fn build_price_index(&self) -> PriceIndex {
        self.try_price_index().await.unwrap_or_else(|err| {
            warn!(target: "aggregate", ?err, "getAllListings failed, pricing every token at zero");
            PriceIndex::default()
        })
    }
}
