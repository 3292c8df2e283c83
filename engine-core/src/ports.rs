use crate::model::*;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

/// Read side of the chain: head, logs and the view functions the
/// marketplace dashboards consume.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn block_number(&self) -> anyhow::Result<BlockNumber>;
    async fn get_logs(&self, filter: &LogFilter) -> anyhow::Result<Vec<RawLog>>;
    /// Unix seconds of the given block.
    async fn block_timestamp(&self, block: BlockNumber) -> anyhow::Result<u64>;

    async fn all_listings(&self, platform: Address) -> anyhow::Result<Vec<Listing>>;
    /// Current state of one listing (mutates after creation), read through
    /// the public `listings` mapping.
    async fn listing(&self, platform: Address, listing_id: U256) -> anyhow::Result<Listing>;
    /// Same listing through the contract's `getListing` view.
    async fn get_listing(&self, platform: Address, listing_id: U256) -> anyhow::Result<Listing>;

    async fn balance_of(&self, token: Address, holder: Address) -> anyhow::Result<U256>;
    async fn token_name(&self, token: Address) -> anyhow::Result<String>;
    async fn token_symbol(&self, token: Address) -> anyhow::Result<String>;
    async fn total_supply(&self, token: Address) -> anyhow::Result<U256>;
    async fn revenue_per_share(&self, token: Address) -> anyhow::Result<U256>;
    async fn pending_revenue(&self, token: Address, holder: Address) -> anyhow::Result<U256>;
    async fn claimable_revenue(&self, token: Address, holder: Address) -> anyhow::Result<U256>;
}

// Signing happens behind this port; we only hand over calldata.
#[async_trait]
pub trait WalletClient: Send + Sync {
    async fn send_transaction(&self, request: TxRequest) -> anyhow::Result<B256>;
    async fn wait_for_receipt(&self, hash: B256) -> anyhow::Result<TxReceipt>;
}
