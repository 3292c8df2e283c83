use crate::{
    abi::{IMusicPlatform, IMusicToken},
    error::ChainError,
    rpc_pool::RpcPool,
};
use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::SolCall;
use anyhow::{Context, Result};
use async_trait::async_trait;
use market_core::{
    BlockNumber, ChainReader, Listing, LogFilter, MarketConfig, RawLog, TxReceipt, TxRequest,
    WalletClient,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<U64>,
    transaction_hash: Option<B256>,
}

#[derive(Debug, Deserialize)]
struct RpcBlockHeader {
    timestamp: U64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    block_number: Option<U64>,
    status: Option<U64>,
}

fn block_tag(block: BlockNumber) -> String {
    format!("0x{:x}", block)
}

/// Reads and writes the marketplace contracts over plain JSON-RPC.
#[derive(Clone)]
pub struct RpcChainClient {
    pool: Arc<RpcPool>,
    account: Option<Address>,
    receipt_poll: Duration,
    receipt_timeout: Duration,
}

impl RpcChainClient {
    pub fn new(pool: Arc<RpcPool>, cfg: &MarketConfig) -> Self {
        Self {
            pool,
            account: cfg.account,
            receipt_poll: Duration::from_millis(cfg.receipt.poll_interval_ms.max(1)),
            receipt_timeout: Duration::from_millis(cfg.receipt.timeout_ms),
        }
    }

    async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, ChainError> {
        let data = Bytes::from(call.abi_encode());
        let out: Bytes = self
            .pool
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        if out.is_empty() {
            return Err(ChainError::Decode(format!(
                "empty eth_call result for {} at {}",
                C::SIGNATURE,
                to
            )));
        }
        Ok(C::abi_decode_returns(&out, true)?)
    }

    // A transaction that is already out may still confirm, so errors here
    // only delay the next poll. The caller bounds the loop with a timeout.
    async fn poll_receipt(&self, hash: B256) -> TxReceipt {
        loop {
            match self
                .pool
                .request::<Option<RpcReceipt>>("eth_getTransactionReceipt", json!([hash]))
                .await
            {
                Ok(Some(RpcReceipt {
                    transaction_hash,
                    block_number: Some(block),
                    status,
                })) => {
                    return TxReceipt {
                        transaction_hash,
                        block_number: block.to::<u64>(),
                        success: status.map(|s| s == U64::from(1u8)).unwrap_or(true),
                    };
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "tx", %hash, error=%err, "receipt poll failed, retrying");
                }
            }
            tokio::time::sleep(self.receipt_poll).await;
        }
    }
}

#[async_trait]
impl ChainReader for RpcChainClient {
    async fn block_number(&self) -> Result<BlockNumber> {
        let head: U64 = self
            .pool
            .request("eth_blockNumber", json!([]))
            .await
            .context("eth_blockNumber")?;
        Ok(head.to::<u64>())
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>> {
        let params = json!([{
            "address": filter.address,
            "topics": filter.topics,
            "fromBlock": block_tag(filter.from_block),
            "toBlock": block_tag(filter.to_block),
        }]);
        let logs: Vec<RpcLog> = self
            .pool
            .request("eth_getLogs", params)
            .await
            .with_context(|| {
                format!(
                    "eth_getLogs {}..={}",
                    filter.from_block, filter.to_block
                )
            })?;
        // pending logs carry no block/tx yet; they show up on the next fetch
        Ok(logs
            .into_iter()
            .filter_map(|log| {
                Some(RawLog {
                    address: log.address,
                    topics: log.topics,
                    data: log.data,
                    block_number: log.block_number?.to::<u64>(),
                    transaction_hash: log.transaction_hash?,
                })
            })
            .collect())
    }

    async fn block_timestamp(&self, block: BlockNumber) -> Result<u64> {
        let header: Option<RpcBlockHeader> = self
            .pool
            .request("eth_getBlockByNumber", json!([block_tag(block), false]))
            .await
            .with_context(|| format!("eth_getBlockByNumber {}", block))?;
        let header = header.ok_or_else(|| ChainError::NotFound(format!("block {}", block)))?;
        Ok(header.timestamp.to::<u64>())
    }

    async fn all_listings(&self, platform: Address) -> Result<Vec<Listing>> {
        let ret = self
            .call(platform, IMusicPlatform::getAllListingsCall {})
            .await
            .context("getAllListings")?;
        Ok(ret.allListings.into_iter().map(Listing::from).collect())
    }

    async fn listing(&self, platform: Address, listing_id: U256) -> Result<Listing> {
        let ret = self
            .call(platform, IMusicPlatform::listingsCall { listingId: listing_id })
            .await
            .with_context(|| format!("listings({})", listing_id))?;
        Ok(Listing {
            id: listing_id,
            seller: ret.seller,
            token_address: ret.tokenAddress,
            amount: ret.amount,
            price_per_token: ret.pricePerToken,
            active: ret.active,
        })
    }

    async fn get_listing(&self, platform: Address, listing_id: U256) -> Result<Listing> {
        let ret = self
            .call(platform, IMusicPlatform::getListingCall { listingId: listing_id })
            .await
            .with_context(|| format!("getListing({})", listing_id))?;
        Ok(ret.listing.into())
    }

    async fn balance_of(&self, token: Address, holder: Address) -> Result<U256> {
        let ret = self
            .call(token, IMusicToken::balanceOfCall { account: holder })
            .await
            .with_context(|| format!("balanceOf on {}", token))?;
        Ok(ret.balance)
    }

    async fn token_name(&self, token: Address) -> Result<String> {
        let ret = self
            .call(token, IMusicToken::nameCall {})
            .await
            .with_context(|| format!("name on {}", token))?;
        Ok(ret.value)
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        let ret = self
            .call(token, IMusicToken::symbolCall {})
            .await
            .with_context(|| format!("symbol on {}", token))?;
        Ok(ret.value)
    }

    async fn total_supply(&self, token: Address) -> Result<U256> {
        let ret = self
            .call(token, IMusicToken::totalSupplyCall {})
            .await
            .with_context(|| format!("totalSupply on {}", token))?;
        Ok(ret.supply)
    }

    async fn revenue_per_share(&self, token: Address) -> Result<U256> {
        let ret = self
            .call(token, IMusicToken::getTotalRevenuePerShareCall {})
            .await
            .with_context(|| format!("getTotalRevenuePerShare on {}", token))?;
        Ok(ret.perShare)
    }

    async fn pending_revenue(&self, token: Address, holder: Address) -> Result<U256> {
        let ret = self
            .call(token, IMusicToken::pendingRevenueCall { account: holder })
            .await
            .with_context(|| format!("pendingRevenue on {}", token))?;
        Ok(ret.amount)
    }

    async fn claimable_revenue(&self, token: Address, holder: Address) -> Result<U256> {
        let ret = self
            .call(token, IMusicToken::claimableRevenueCall { account: holder })
            .await
            .with_context(|| format!("claimableRevenue on {}", token))?;
        Ok(ret.amount)
    }
}

#[async_trait]
impl WalletClient for RpcChainClient {
    async fn send_transaction(&self, request: TxRequest) -> Result<B256> {
        let from = self
            .account
            .context("no account configured for eth_sendTransaction")?;
        let hash: B256 = self
            .pool
            .request(
                "eth_sendTransaction",
                json!([{ "from": from, "to": request.to, "data": request.data }]),
            )
            .await
            .context("eth_sendTransaction")?;
        tracing::info!(target: "tx", %hash, to=%request.to, "transaction submitted");
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt> {
        let receipt = tokio::time::timeout(self.receipt_timeout, self.poll_receipt(hash))
            .await
            .map_err(|_| ChainError::Timeout(format!("receipt for {}", hash)))?;
        Ok(receipt)
    }
}
