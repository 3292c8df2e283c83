use crate::{aggregator::Aggregator, log_fetcher::EventQuery};
use alloy_primitives::Address;
use market_core::{
    ActivityFeed, ActivityItem, ActivityKind, ChainReader, EventKind, EventRecord, PlatformEvent,
};
use tracing::info;

fn activity_item(record: &EventRecord) -> ActivityItem {
    let (kind, description, amount, value) = match &record.event {
        PlatformEvent::MusicTokenCreated { name, symbol, .. } => (
            ActivityKind::Created,
            format!("Created {} ({})", name, symbol),
            None,
            None,
        ),
        PlatformEvent::TokenListed { amount, price, .. } => (
            ActivityKind::Listed,
            "Listed tokens for sale".to_string(),
            Some(*amount),
            Some(*price),
        ),
        PlatformEvent::TokenSold {
            amount,
            total_price,
            ..
        } => (
            ActivityKind::Bought,
            "Purchased tokens".to_string(),
            Some(*amount),
            Some(*total_price),
        ),
    };
    ActivityItem {
        kind,
        block_number: record.block_number,
        transaction_hash: record.transaction_hash,
        description,
        amount,
        value,
    }
}

/// Tags and merges the three streams, newest block first. Items in the same
/// block keep stream order: created, listed, bought.
pub fn merge_activity(
    created: &[EventRecord],
    listed: &[EventRecord],
    bought: &[EventRecord],
) -> Vec<ActivityItem> {
    let mut items: Vec<ActivityItem> = created
        .iter()
        .chain(listed)
        .chain(bought)
        .map(activity_item)
        .collect();
    items.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    items
}

impl<R: ChainReader + ?Sized> Aggregator<R> {
    /// The user's created, listed and bought events as one feed. `partial`
    /// is set when any of the three scans missed a block range.
    pub async fn activity(&self, user: Address) -> ActivityFeed {
        let query = |kind| EventQuery {
            contract: self.platform,
            kind,
            participant: Some(user),
        };
        let created_q = query(EventKind::MusicTokenCreated);
        let listed_q = query(EventKind::TokenListed);
        let bought_q = query(EventKind::TokenSold);
        let (created, listed, bought) = tokio::join!(
            self.fetch_events(&created_q),
            self.fetch_events(&listed_q),
            self.fetch_events(&bought_q),
        );
        let items = merge_activity(&created.events, &listed.events, &bought.events);
        let partial = created.is_partial() || listed.is_partial() || bought.is_partial();
        info!(
            target: "aggregate",
            %user,
            created=%created.events.len(),
            listed=%listed.events.len(),
            bought=%bought.events.len(),
            partial=%partial,
            "activity aggregated"
        );
        ActivityFeed { items, partial }
    }
}
