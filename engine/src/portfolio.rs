use crate::{aggregator::Aggregator, log_fetcher::EventQuery, price_index::PriceIndex};
use alloy_primitives::{Address, U256};
use market_core::{ChainReader, EventKind, PlatformEvent, PortfolioSummary, TokenHolding};
use tracing::{info, warn};

impl<R: ChainReader + ?Sized> Aggregator<R> {
    /// Every platform token `user` currently holds, in creation order.
    ///
    /// The creation scan is platform wide: tokens bought on the market were
    /// created by someone else.
    pub async fn portfolio(&self, user: Address) -> Vec<TokenHolding> {
        self.portfolio_summary(user).await.holdings
    }

    pub async fn portfolio_summary(&self, user: Address) -> PortfolioSummary {
        let query = EventQuery {
            contract: self.platform,
            kind: EventKind::MusicTokenCreated,
            participant: None,
        };
        let (created, prices) = tokio::join!(self.fetch_events(&query), self.try_price_index());
        let prices_missing = prices.is_err();
        let prices = prices.unwrap_or_else(|err| {
            warn!(target: "aggregate", ?err, "getAllListings failed, pricing every token at zero");
            PriceIndex::default()
        });
        let partial = created.is_partial() || prices_missing;

        let candidates: Vec<_> = created
            .events
            .iter()
            .filter_map(|record| match &record.event {
                PlatformEvent::MusicTokenCreated {
                    token_address,
                    name,
                    symbol,
                    ..
                } => Some((*token_address, name, symbol, record.transaction_hash)),
                _ => None,
            })
            .collect();
        let addresses: Vec<Address> = candidates.iter().map(|c| c.0).collect();
        let balances = self.resolve_balances(&addresses, user).await;

        let holdings: Vec<TokenHolding> = candidates
            .into_iter()
            .zip(balances)
            .filter(|(_, balance)| !balance.is_zero())
            .map(|((token_address, name, symbol, tx), balance)| TokenHolding {
                token_address,
                name: name.clone(),
                symbol: symbol.clone(),
                balance,
                price: prices.price_or_zero(&token_address),
                transaction_hash: tx,
            })
            .collect();

        let total_value = holdings
            .iter()
            .fold(U256::ZERO, |acc, h| acc.saturating_add(h.value()));
        info!(
            target: "aggregate",
            %user,
            scanned=%addresses.len(),
            held=%holdings.len(),
            partial=%partial,
            "portfolio aggregated"
        );
        PortfolioSummary {
            holdings,
            total_value,
            partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn holdings_are_priced_and_filtered() {
        let user = addr(1);
        let mut chain = MockChain::with_head(200_000);
        // created by someone else, bought by the user
        let bought_tx = chain.push_created(100, addr(9), addr(50), "Night Drive", "NDRV");
        chain.push_created(60_000, addr(1), addr(51), "Empty", "EMT");
        let own_tx = chain.push_created(150_000, addr(1), addr(52), "Own", "OWN");
        chain.set_balance(addr(50), user, tokens(2));
        chain.set_balance(addr(52), user, tokens(10));
        chain.add_listing(1, addr(9), addr(50), tokens(100), usdc(5), true);
        let agg = Aggregator::new(Arc::new(chain), &test_config(), test_metrics());

        let summary = agg.portfolio_summary(user).await;
        assert!(!summary.partial);
        assert_eq!(summary.holdings.len(), 2);

        let first = &summary.holdings[0];
        assert_eq!(first.token_address, addr(50));
        assert_eq!(first.name, "Night Drive");
        assert_eq!(first.price, usdc(5));
        assert_eq!(first.value(), usdc(10));
        assert_eq!(first.transaction_hash, bought_tx);

        let second = &summary.holdings[1];
        assert_eq!(second.token_address, addr(52));
        assert_eq!(second.price, U256::ZERO);
        assert_eq!(second.transaction_hash, own_tx);

        assert_eq!(summary.total_value, usdc(10));
    }

    #[tokio::test]
    async fn zero_balances_give_empty_portfolio() {
        let mut chain = MockChain::with_head(1_000);
        for i in 0..5u8 {
            chain.push_created(10 + u64::from(i), addr(9), addr(50 + i), "T", "T");
        }
        chain.add_listing(1, addr(9), addr(50), tokens(1), usdc(1), true);
        let agg = Aggregator::new(Arc::new(chain), &test_config(), test_metrics());
        let summary = agg.portfolio_summary(addr(1)).await;
        assert!(summary.holdings.is_empty());
        assert_eq!(summary.total_value, U256::ZERO);
    }

    #[tokio::test]
    async fn failed_reads_degrade_instead_of_aborting() {
        let user = addr(1);
        let mut chain = MockChain::with_head(120_000);
        chain.push_created(10, addr(9), addr(50), "A", "A");
        chain.push_created(20, addr(9), addr(51), "B", "B");
        chain.push_created(60_000, addr(9), addr(52), "Lost", "L");
        chain.set_balance(addr(50), user, tokens(1));
        chain.set_balance(addr(51), user, tokens(1));
        chain.set_balance(addr(52), user, tokens(1));
        chain.failing_tokens.insert(addr(51));
        chain.failing_windows.insert(50_001);
        chain.add_listing(1, addr(9), addr(50), tokens(1), usdc(1), true);
        chain.listings_fail = true;
        let agg = Aggregator::new(Arc::new(chain), &test_config(), test_metrics());

        let summary = agg.portfolio_summary(user).await;
        assert!(summary.partial);
        assert_eq!(summary.holdings.len(), 1);
        assert_eq!(summary.holdings[0].token_address, addr(50));
        assert_eq!(summary.holdings[0].price, U256::ZERO);
    }

    #[tokio::test]
    async fn unpriced_portfolio_is_flagged_partial() {
        let user = addr(1);
        let mut chain = MockChain::with_head(1_000);
        chain.push_created(10, addr(9), addr(50), "A", "A");
        chain.set_balance(addr(50), user, tokens(3));
        chain.add_listing(1, addr(9), addr(50), tokens(1), usdc(4), true);
        chain.listings_fail = true;
        let agg = Aggregator::new(Arc::new(chain), &test_config(), test_metrics());

        let summary = agg.portfolio_summary(user).await;
        assert_eq!(summary.holdings.len(), 1);
        assert_eq!(summary.total_value, U256::ZERO);
        // every log window was read, the zero total comes from the missing prices
        assert!(summary.partial);
    }

    #[tokio::test]
    async fn duplicate_creation_events_are_kept() {
        let user = addr(1);
        let mut chain = MockChain::with_head(1_000);
        chain.push_created(10, addr(9), addr(50), "Dup", "DUP");
        chain.push_created(11, addr(9), addr(50), "Dup", "DUP");
        chain.set_balance(addr(50), user, tokens(1));
        let agg = Aggregator::new(Arc::new(chain), &test_config(), test_metrics());
        let holdings = agg.portfolio(user).await;
        assert_eq!(holdings.len(), 2);
        assert_ne!(holdings[0].transaction_hash, holdings[1].transaction_hash);
    }
}
