pub mod abi;
pub mod activity;
pub mod aggregator;
pub mod balances;
pub mod chain_client;
pub mod error;
pub mod listing_detail;
pub mod listing_history;
pub mod log_fetcher;
pub mod portfolio;
pub mod price_index;
pub mod revenue;
pub mod rpc_pool;
pub mod session;
pub mod tx_gateway;
pub mod user_tokens;

#[cfg(test)]
pub(crate) mod testing;

pub use activity::merge_activity;
pub use aggregator::Aggregator;
pub use chain_client::RpcChainClient;
pub use error::ChainError;
pub use log_fetcher::{block_windows, BlockWindow, EventQuery, LogFetch};
pub use price_index::PriceIndex;
pub use rpc_pool::RpcPool;
pub use session::PlatformSession;
pub use tx_gateway::TxGateway;
