use crate::{
    aggregator::Aggregator,
    log_fetcher::{EventQuery, LogFetch},
    price_index::PriceIndex,
    tx_gateway::TxGateway,
};
use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Result};
use market_core::{
    ActivityFeed, ChainReader, CreatedToken, ListingDetail, ListingHistory, MarketConfig, Metrics,
    PortfolioSummary, RevenueSummary, TokenHolding, TxOutcome, WalletClient,
};
use std::sync::Arc;
use tracing::info;

const NOT_CONNECTED: &str = "wallet not connected";

/// The reader and wallet bound for one connected user. Built on connect,
/// dropped on disconnect; every view degrades to empty while disconnected.
pub struct PlatformSession {
    cfg: MarketConfig,
    metrics: Arc<Metrics>,
    aggregator: Option<Aggregator<dyn ChainReader>>,
    gateway: Option<TxGateway<dyn WalletClient>>,
}

impl PlatformSession {
    pub fn new(cfg: MarketConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            cfg,
            metrics,
            aggregator: None,
            gateway: None,
        }
    }

    /// Binds a reader and, when the user can sign, a wallet. Replaces any
    /// previous binding.
    pub fn connect(&mut self, reader: Arc<dyn ChainReader>, wallet: Option<Arc<dyn WalletClient>>) {
        self.aggregator = Some(Aggregator::new(reader, &self.cfg, self.metrics.clone()));
        self.gateway = wallet.map(|w| TxGateway::new(w, &self.cfg, self.metrics.clone()));
        info!(target: "aggregate", can_write=%self.gateway.is_some(), "session connected");
    }

    pub fn disconnect(&mut self) {
        if self.aggregator.take().is_some() {
            info!(target: "aggregate", "session disconnected");
        }
        self.gateway = None;
    }

    pub fn is_connected(&self) -> bool {
        self.aggregator.is_some()
    }

    pub fn aggregator(&self) -> Option<&Aggregator<dyn ChainReader>> {
        self.aggregator.as_ref()
    }

    pub fn gateway(&self) -> Option<&TxGateway<dyn WalletClient>> {
        self.gateway.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.gateway.as_ref().is_some_and(|g| g.is_loading())
    }

    pub async fn fetch_events(&self, query: &EventQuery) -> LogFetch {
        match &self.aggregator {
            Some(agg) => agg.fetch_events(query).await,
            None => LogFetch::default(),
        }
    }

    pub async fn resolve_balances(&self, tokens: &[Address], holder: Address) -> Vec<U256> {
        match &self.aggregator {
            Some(agg) => agg.resolve_balances(tokens, holder).await,
            None => Vec::new(),
        }
    }

    pub async fn price_index(&self) -> PriceIndex {
        match &self.aggregator {
            Some(agg) => agg.build_price_index().await,
            None => PriceIndex::default(),
        }
    }

    pub async fn portfolio(&self, user: Address) -> Vec<TokenHolding> {
        self.portfolio_summary(user).await.holdings
    }

    pub async fn portfolio_summary(&self, user: Address) -> PortfolioSummary {
        match &self.aggregator {
            Some(agg) => agg.portfolio_summary(user).await,
            None => PortfolioSummary::default(),
        }
    }

    pub async fn listing_history(&self, seller: Address) -> ListingHistory {
        match &self.aggregator {
            Some(agg) => agg.listing_history(seller).await,
            None => ListingHistory::default(),
        }
    }

    pub async fn activity(&self, user: Address) -> ActivityFeed {
        match &self.aggregator {
            Some(agg) => agg.activity(user).await,
            None => ActivityFeed::default(),
        }
    }

    pub async fn user_tokens(&self, creator: Address) -> Vec<CreatedToken> {
        match &self.aggregator {
            Some(agg) => agg.user_tokens(creator).await,
            None => Vec::new(),
        }
    }

    pub async fn token_revenue(&self, token: Address, holder: Address) -> Result<RevenueSummary> {
        match &self.aggregator {
            Some(agg) => agg.token_revenue(token, holder).await,
            None => Err(anyhow!("no chain reader bound")),
        }
    }

    pub async fn listing_detail(&self, listing_id: U256, buyer: Option<Address>) -> Result<ListingDetail> {
        match &self.aggregator {
            Some(agg) => agg.listing_detail(listing_id, buyer).await,
            None => Err(anyhow!("no chain reader bound")),
        }
    }

    fn not_connected() -> TxOutcome {
        TxOutcome::Failed {
            message: NOT_CONNECTED.to_string(),
        }
    }

    pub async fn create_music_token(
        &self,
        name: &str,
        symbol: &str,
        max_supply: U256,
        artist: Address,
    ) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.create_music_token(name, symbol, max_supply, artist).await,
            None => Self::not_connected(),
        }
    }

    pub async fn list_token(&self, token: Address, amount: U256, price_per_token: U256) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.list_token(token, amount, price_per_token).await,
            None => Self::not_connected(),
        }
    }

    pub async fn list_for_sale(&self, token: Address, amount: U256, price_per_token: U256) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.list_for_sale(token, amount, price_per_token).await,
            None => Self::not_connected(),
        }
    }

    pub async fn buy_token(&self, listing_id: U256, usdc_amount: U256) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.buy_token(listing_id, usdc_amount).await,
            None => Self::not_connected(),
        }
    }

    pub async fn purchase(&self, listing_id: U256, usdc_amount: U256) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.purchase(listing_id, usdc_amount).await,
            None => Self::not_connected(),
        }
    }

    pub async fn cancel_listing(&self, listing_id: U256) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.cancel_listing(listing_id).await,
            None => Self::not_connected(),
        }
    }

    pub async fn approve(&self, token: Address, spender: Address, amount: U256) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.approve(token, spender, amount).await,
            None => Self::not_connected(),
        }
    }

    pub async fn approve_payment(&self, amount: U256) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.approve_payment(amount).await,
            None => Self::not_connected(),
        }
    }

    pub async fn deposit_revenue(&self, token: Address, amount: U256) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.deposit_revenue(token, amount).await,
            None => Self::not_connected(),
        }
    }

    pub async fn withdraw_revenue(&self, token: Address) -> TxOutcome {
        match &self.gateway {
            Some(gw) => gw.withdraw_revenue(token).await,
            None => Self::not_connected(),
        }
    }
}
