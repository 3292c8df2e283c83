use crate::{aggregator::Aggregator, log_fetcher::EventQuery};
use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use market_core::{
    BlockNumber, ChainReader, EventKind, ListingHistory, ListingRecord, ListingStatus,
    PlatformEvent,
};
use tracing::{info, warn};

struct ListedEvent {
    listing_id: U256,
    initial_amount: U256,
    block_number: BlockNumber,
    transaction_hash: B256,
}

impl<R: ChainReader + ?Sized> Aggregator<R> {
    /// Listings created by `seller`, joined with their live on-chain state,
    /// newest listing id first. Listings that cannot be enriched are dropped;
    /// `partial` reports block ranges whose `TokenListed` logs were lost.
    pub async fn listing_history(&self, seller: Address) -> ListingHistory {
        let query = EventQuery {
            contract: self.platform,
            kind: EventKind::TokenListed,
            participant: Some(seller),
        };
        let fetch = self.fetch_events(&query).await;
        let listed: Vec<ListedEvent> = fetch
            .events
            .iter()
            .filter_map(|record| match &record.event {
                PlatformEvent::TokenListed {
                    listing_id, amount, ..
                } => Some(ListedEvent {
                    listing_id: *listing_id,
                    initial_amount: *amount,
                    block_number: record.block_number,
                    transaction_hash: record.transaction_hash,
                }),
                _ => None,
            })
            .collect();
        let total = listed.len();

        let metrics = &self.metrics;
        let enriched = self
            .fan_out(listed, |event| async move {
                let listing_id = event.listing_id;
                match self.enrich_listing(event).await {
                    Ok(record) => Some(record),
                    Err(err) => {
                        metrics.item_reads_failed.inc();
                        warn!(target: "aggregate", ?err, %listing_id, "dropping listing that could not be read");
                        None
                    }
                }
            })
            .await;

        let mut records: Vec<ListingRecord> = enriched.into_iter().flatten().collect();
        records.sort_by(|a, b| b.listing_id.cmp(&a.listing_id));
        let partial = fetch.is_partial();
        info!(target: "aggregate", %seller, listed=%total, kept=%records.len(), %partial, "listing history aggregated");
        ListingHistory { records, partial }
    }

    async fn enrich_listing(&self, event: ListedEvent) -> Result<ListingRecord> {
        let (listing, timestamp) = tokio::try_join!(
            self.reader.listing(self.platform, event.listing_id),
            self.reader.block_timestamp(event.block_number),
        )?;
        let (token_name, token_symbol) = tokio::try_join!(
            self.reader.token_name(listing.token_address),
            self.reader.token_symbol(listing.token_address),
        )?;
        let secs = i64::try_from(timestamp).context("block timestamp out of range")?;
        let listed_at = DateTime::<Utc>::from_timestamp(secs, 0)
            .with_context(|| format!("invalid block timestamp {}", timestamp))?;
        Ok(ListingRecord {
            listing_id: event.listing_id,
            token_address: listing.token_address,
            token_name,
            token_symbol,
            initial_amount: event.initial_amount,
            remaining_amount: listing.amount,
            price_per_token: listing.price_per_token,
            status: ListingStatus::from_state(listing.active, listing.amount),
            listed_at,
            transaction_hash: event.transaction_hash,
        })
    }
}
