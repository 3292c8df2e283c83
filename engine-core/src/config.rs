use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

fn default_start_block() -> u64 {
    30_503_759
}

fn default_log_window_blocks() -> u64 {
    50_000
}

fn default_max_concurrent_reads() -> usize {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub timeout_ms: u64,
    pub max_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    pub platform: Address,
    pub payment_token: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub rpc: RpcConfig,
    pub contracts: ContractsConfig,
    /// Account handed to `eth_sendTransaction`; reads work without it.
    #[serde(default)]
    pub account: Option<Address>,
    /// Platform deployment block; log scans start here.
    #[serde(default = "default_start_block")]
    pub start_block: u64,
    /// Block span per `eth_getLogs` request, sized under the provider's limit.
    #[serde(default = "default_log_window_blocks")]
    pub log_window_blocks: u64,
    #[serde(default = "default_max_concurrent_reads")]
    pub max_concurrent_reads: usize,
    pub receipt: ReceiptConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                url: "https://rpc.sepolia-api.lisk.com".to_string(),
                timeout_ms: 10_000,
                max_connections: 16,
            },
            contracts: ContractsConfig {
                platform: Address::ZERO,
                payment_token: Address::ZERO,
            },
            account: None,
            start_block: default_start_block(),
            log_window_blocks: default_log_window_blocks(),
            max_concurrent_reads: default_max_concurrent_reads(),
            receipt: ReceiptConfig {
                poll_interval_ms: 1_000,
                timeout_ms: 120_000,
            },
        }
    }
}
