//! In-memory chain used by the aggregation tests.

use crate::abi::IMusicPlatform;
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use market_core::{
    BlockNumber, ChainReader, Listing, LogFilter, MarketConfig, Metrics, RawLog, TxReceipt,
    TxRequest, WalletClient,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) const PLATFORM: Address = Address::with_last_byte(0xee);

pub(crate) fn addr(n: u8) -> Address {
    Address::with_last_byte(n)
}

pub(crate) fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(10u8).pow(U256::from(18u8))
}

pub(crate) fn usdc(n: u64) -> U256 {
    U256::from(n) * U256::from(1_000_000u64)
}

pub(crate) fn test_config() -> MarketConfig {
    let mut cfg = MarketConfig::default();
    cfg.contracts.platform = PLATFORM;
    cfg.contracts.payment_token = addr(0xcc);
    cfg.start_block = 0;
    cfg.log_window_blocks = 50_000;
    cfg.max_concurrent_reads = 4;
    cfg
}

pub(crate) fn test_metrics() -> Arc<Metrics> {
    Metrics::detached().expect("metrics")
}

#[derive(Default)]
pub(crate) struct MockChain {
    pub head: Option<u64>,
    logs: Vec<RawLog>,
    pub failing_windows: HashSet<u64>,
    balances: HashMap<(Address, Address), U256>,
    pub failing_tokens: HashSet<Address>,
    pub listings: Vec<Listing>,
    pub listings_fail: bool,
    names: HashMap<Address, (String, String)>,
    next_tx: u64,
    pub log_requests: Mutex<Vec<(u64, u64)>>,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl MockChain {
    pub fn with_head(head: u64) -> Self {
        Self {
            head: Some(head),
            ..Self::default()
        }
    }

    fn push_event<E: SolEvent>(&mut self, block: u64, ev: &E) -> B256 {
        self.next_tx += 1;
        let hash = B256::left_padding_from(&self.next_tx.to_be_bytes());
        let data = ev.encode_log_data();
        self.logs.push(RawLog {
            address: PLATFORM,
            topics: data.topics().to_vec(),
            data: data.data.clone(),
            block_number: block,
            transaction_hash: hash,
        });
        hash
    }

    pub fn push_created(
        &mut self,
        block: u64,
        creator: Address,
        token: Address,
        name: &str,
        symbol: &str,
    ) -> B256 {
        self.names
            .insert(token, (name.to_string(), symbol.to_string()));
        self.push_event(
            block,
            &IMusicPlatform::MusicTokenCreated {
                creator,
                tokenAddress: token,
                name: name.to_string(),
                symbol: symbol.to_string(),
            },
        )
    }

    pub fn push_listed(
        &mut self,
        block: u64,
        listing_id: u64,
        seller: Address,
        amount: U256,
        price: U256,
    ) -> B256 {
        self.push_event(
            block,
            &IMusicPlatform::TokenListed {
                listingId: U256::from(listing_id),
                seller,
                amount,
                price,
            },
        )
    }

    pub fn push_sold(
        &mut self,
        block: u64,
        listing_id: u64,
        buyer: Address,
        amount: U256,
        total_price: U256,
    ) -> B256 {
        self.push_event(
            block,
            &IMusicPlatform::TokenSold {
                listingId: U256::from(listing_id),
                buyer,
                amount,
                totalPrice: total_price,
            },
        )
    }

    pub fn push_raw(&mut self, log: RawLog) {
        self.logs.push(log);
    }

    pub fn set_balance(&mut self, token: Address, holder: Address, balance: U256) {
        self.balances.insert((token, holder), balance);
    }

    pub fn add_listing(
        &mut self,
        id: u64,
        seller: Address,
        token: Address,
        amount: U256,
        price: U256,
        active: bool,
    ) {
        self.listings.push(Listing {
            id: U256::from(id),
            seller,
            token_address: token,
            amount,
            price_per_token: price,
            active,
        });
    }

    pub fn log_requests(&self) -> Vec<(u64, u64)> {
        self.log_requests.lock().clone()
    }

    fn token_guard(&self, token: Address) -> Result<()> {
        if self.failing_tokens.contains(&token) {
            return Err(anyhow!("execution reverted on {}", token));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn block_number(&self) -> Result<BlockNumber> {
        self.head.ok_or_else(|| anyhow!("head unavailable"))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>> {
        self.log_requests
            .lock()
            .push((filter.from_block, filter.to_block));
        if self.failing_windows.contains(&filter.from_block) {
            return Err(anyhow!("request timed out"));
        }
        let mut out: Vec<RawLog> = self
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect();
        out.sort_by_key(|log| log.block_number);
        Ok(out)
    }

    async fn block_timestamp(&self, block: BlockNumber) -> Result<u64> {
        Ok(1_700_000_000 + block * 2)
    }

    async fn all_listings(&self, _platform: Address) -> Result<Vec<Listing>> {
        if self.listings_fail {
            return Err(anyhow!("getAllListings reverted"));
        }
        Ok(self.listings.clone())
    }

    async fn listing(&self, _platform: Address, listing_id: U256) -> Result<Listing> {
        self.listings
            .iter()
            .find(|l| l.id == listing_id)
            .cloned()
            .ok_or_else(|| anyhow!("no listing {}", listing_id))
    }

    async fn get_listing(&self, platform: Address, listing_id: U256) -> Result<Listing> {
        self.listing(platform, listing_id).await
    }

    async fn balance_of(&self, token: Address, holder: Address) -> Result<U256> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.token_guard(token)?;
        Ok(self
            .balances
            .get(&(token, holder))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn token_name(&self, token: Address) -> Result<String> {
        self.token_guard(token)?;
        self.names
            .get(&token)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| anyhow!("name reverted"))
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        self.token_guard(token)?;
        self.names
            .get(&token)
            .map(|(_, symbol)| symbol.clone())
            .ok_or_else(|| anyhow!("symbol reverted"))
    }

    async fn total_supply(&self, token: Address) -> Result<U256> {
        self.token_guard(token)?;
        Ok(tokens(1_000))
    }

    async fn revenue_per_share(&self, token: Address) -> Result<U256> {
        self.token_guard(token)?;
        // $0.50 per whole token
        Ok(U256::from(500_000u64))
    }

    async fn pending_revenue(&self, token: Address, _holder: Address) -> Result<U256> {
        self.token_guard(token)?;
        Ok(usdc(3))
    }

    async fn claimable_revenue(&self, token: Address, _holder: Address) -> Result<U256> {
        self.token_guard(token)?;
        Ok(usdc(2))
    }
}

/// Wallet double: records calldata, fails or reverts on demand.
#[derive(Default)]
pub(crate) struct MockWallet {
    pub sent: Mutex<Vec<TxRequest>>,
    pub fail_send_to: Mutex<HashSet<Address>>,
    pub revert_to: Mutex<HashSet<Address>>,
}

#[async_trait]
impl WalletClient for MockWallet {
    async fn send_transaction(&self, request: TxRequest) -> Result<B256> {
        if self.fail_send_to.lock().contains(&request.to) {
            return Err(anyhow!(
                "User rejected the request.\n\nRequest Arguments:\n  to: {}",
                request.to
            ));
        }
        let mut sent = self.sent.lock();
        sent.push(request.clone());
        let mut word = [0u8; 32];
        word[..20].copy_from_slice(request.to.as_slice());
        word[31] = sent.len() as u8;
        Ok(B256::from(word))
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt> {
        // other tasks get polled while the receipt is pending
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        let to = Address::from_slice(&hash[..20]);
        Ok(TxReceipt {
            transaction_hash: hash,
            block_number: 42,
            success: !self.revert_to.lock().contains(&to),
        })
    }
}
