use crate::{aggregator::Aggregator, log_fetcher::EventQuery};
use alloy_primitives::Address;
use market_core::{ChainReader, CreatedToken, EventKind, PlatformEvent};

impl<R: ChainReader + ?Sized> Aggregator<R> {
    /// Tokens `creator` minted through the platform with the creator's current
    /// balance, newest first. Zero balances are kept.
    pub async fn user_tokens(&self, creator: Address) -> Vec<CreatedToken> {
        let query = EventQuery {
            contract: self.platform,
            kind: EventKind::MusicTokenCreated,
            participant: Some(creator),
        };
        let fetch = self.fetch_events(&query).await;
        let mut created: Vec<CreatedToken> = fetch
            .events
            .into_iter()
            .filter_map(|record| match record.event {
                PlatformEvent::MusicTokenCreated {
                    token_address,
                    name,
                    symbol,
                    ..
                } => Some(CreatedToken {
                    token_address,
                    name,
                    symbol,
                    balance: Default::default(),
                    block_number: record.block_number,
                    transaction_hash: record.transaction_hash,
                }),
                _ => None,
            })
            .collect();

        let addresses: Vec<Address> = created.iter().map(|t| t.token_address).collect();
        let balances = self.resolve_balances(&addresses, creator).await;
        for (token, balance) in created.iter_mut().zip(balances) {
            token.balance = balance;
        }
        created.reverse();
        created
    }
}
