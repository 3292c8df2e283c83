use crate::{
    abi::{IMusicPlatform, IMusicToken},
    error::ChainError,
};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use market_core::{MarketConfig, Metrics, TxOutcome, TxRequest, WalletClient};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Only the first line of a wallet/provider error is shown to the user.
fn first_line(err: &anyhow::Error) -> String {
    let full = format!("{:#}", err);
    full.lines().next().unwrap_or_default().trim().to_string()
}

struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
    metrics: &'a Metrics,
}

impl<'a> LoadingGuard<'a> {
    fn raise(flag: &'a AtomicBool, metrics: &'a Metrics) -> Self {
        flag.store(true, Ordering::SeqCst);
        metrics.inflight_tx.inc();
        Self { flag, metrics }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.metrics.inflight_tx.dec();
    }
}

/// Submits marketplace writes through a wallet and waits for each receipt.
///
/// Writes issued through one gateway run one at a time; a second call waits
/// for the first to confirm or fail. There are no retries.
pub struct TxGateway<W: WalletClient + ?Sized> {
    wallet: Arc<W>,
    platform: Address,
    payment_token: Address,
    write_lock: Mutex<()>,
    loading: AtomicBool,
    last_outcome: RwLock<Option<TxOutcome>>,
    metrics: Arc<Metrics>,
}

impl<W: WalletClient + ?Sized> TxGateway<W> {
    pub fn new(wallet: Arc<W>, cfg: &MarketConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            wallet,
            platform: cfg.contracts.platform,
            payment_token: cfg.contracts.payment_token,
            write_lock: Mutex::new(()),
            loading: AtomicBool::new(false),
            last_outcome: RwLock::new(None),
            metrics,
        }
    }

    /// True from the start of a write until its last step has a receipt.
    /// Composite flows keep it raised across both transactions.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn last_outcome(&self) -> Option<TxOutcome> {
        self.last_outcome.read().clone()
    }

    pub async fn create_music_token(
        &self,
        name: &str,
        symbol: &str,
        max_supply: U256,
        artist: Address,
    ) -> TxOutcome {
        let call = IMusicPlatform::createMusicTokenCall {
            name: name.to_string(),
            symbol: symbol.to_string(),
            maxSupply: max_supply,
            artist,
        };
        self.write(self.platform, call).await
    }

    pub async fn list_token(&self, token: Address, amount: U256, price_per_token: U256) -> TxOutcome {
        let call = IMusicPlatform::listTokenCall {
            tokenAddress: token,
            amount,
            pricePerToken: price_per_token,
        };
        self.write(self.platform, call).await
    }

    pub async fn buy_token(&self, listing_id: U256, usdc_amount: U256) -> TxOutcome {
        let call = IMusicPlatform::buyTokenCall {
            listingId: listing_id,
            usdcAmount: usdc_amount,
        };
        self.write(self.platform, call).await
    }

    pub async fn cancel_listing(&self, listing_id: U256) -> TxOutcome {
        let call = IMusicPlatform::cancelListingCall {
            listingId: listing_id,
        };
        self.write(self.platform, call).await
    }

    /// Lets `spender` move `amount` of `token` on the caller's behalf.
    pub async fn approve(&self, token: Address, spender: Address, amount: U256) -> TxOutcome {
        self.write(token, IMusicToken::approveCall { spender, amount })
            .await
    }

    /// Approves the platform to pull `amount` of the payment token.
    pub async fn approve_payment(&self, amount: U256) -> TxOutcome {
        self.approve(self.payment_token, self.platform, amount).await
    }

    pub async fn deposit_revenue(&self, token: Address, amount: U256) -> TxOutcome {
        self.write(token, IMusicToken::depositRevenueCall { amount })
            .await
    }

    /// Claims the caller's accrued revenue on `token`.
    pub async fn withdraw_revenue(&self, token: Address) -> TxOutcome {
        self.write(token, IMusicToken::withdrawRevenueCall {}).await
    }

    /// Approves the platform for `amount` of `token`, then lists it.
    pub async fn list_for_sale(
        &self,
        token: Address,
        amount: U256,
        price_per_token: U256,
    ) -> TxOutcome {
        let _serial = self.write_lock.lock().await;
        let _loading = LoadingGuard::raise(&self.loading, &self.metrics);
        let approve = IMusicToken::approveCall {
            spender: self.platform,
            amount,
        };
        let outcome = self.submit(token, approve).await;
        if !outcome.is_confirmed() {
            return outcome;
        }
        let list = IMusicPlatform::listTokenCall {
            tokenAddress: token,
            amount,
            pricePerToken: price_per_token,
        };
        self.submit(self.platform, list).await
    }

    /// Approves `usdc_amount` of the payment token, then buys from `listing_id`.
    pub async fn purchase(&self, listing_id: U256, usdc_amount: U256) -> TxOutcome {
        let _serial = self.write_lock.lock().await;
        let _loading = LoadingGuard::raise(&self.loading, &self.metrics);
        let approve = IMusicToken::approveCall {
            spender: self.platform,
            amount: usdc_amount,
        };
        let outcome = self.submit(self.payment_token, approve).await;
        if !outcome.is_confirmed() {
            return outcome;
        }
        let buy = IMusicPlatform::buyTokenCall {
            listingId: listing_id,
            usdcAmount: usdc_amount,
        };
        self.submit(self.platform, buy).await
    }

    async fn write<C: SolCall>(&self, to: Address, call: C) -> TxOutcome {
        let _serial = self.write_lock.lock().await;
        let _loading = LoadingGuard::raise(&self.loading, &self.metrics);
        self.submit(to, call).await
    }

    /// Caller holds `write_lock` and keeps the loading flag raised.
    async fn submit<C: SolCall>(&self, to: Address, call: C) -> TxOutcome {
        let request = TxRequest {
            to,
            data: Bytes::from(call.abi_encode()),
        };
        let method = C::SIGNATURE;
        let outcome = self.send_and_confirm(request, method).await;
        match &outcome {
            TxOutcome::Confirmed { hash, block_number } => {
                self.metrics.tx_confirmed.inc();
                info!(target: "tx", %method, %hash, %block_number, "transaction confirmed");
            }
            TxOutcome::Failed { message } => {
                self.metrics.tx_failed.inc();
                warn!(target: "tx", %method, %to, %message, "transaction failed");
            }
        }
        *self.last_outcome.write() = Some(outcome.clone());
        outcome
    }

    async fn send_and_confirm(&self, request: TxRequest, method: &str) -> TxOutcome {
        let hash = match self.wallet.send_transaction(request).await {
            Ok(hash) => hash,
            Err(err) => {
                return TxOutcome::Failed {
                    message: first_line(&err),
                }
            }
        };
        self.metrics.tx_sent.inc();
        info!(target: "tx", %method, %hash, "waiting for receipt");
        match self.wallet.wait_for_receipt(hash).await {
            Ok(receipt) if receipt.success => TxOutcome::Confirmed {
                hash: receipt.transaction_hash,
                block_number: receipt.block_number,
            },
            Ok(receipt) => TxOutcome::Failed {
                message: ChainError::Reverted(receipt.transaction_hash).to_string(),
            },
            Err(err) => TxOutcome::Failed {
                message: first_line(&err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use alloy_sol_types::SolCall;

    fn gateway(wallet: Arc<MockWallet>) -> TxGateway<MockWallet> {
        TxGateway::new(wallet, &test_config(), test_metrics())
    }

    #[tokio::test]
    async fn confirmed_write_encodes_calldata() {
        let wallet = Arc::new(MockWallet::default());
        let gw = gateway(wallet.clone());

        let outcome = gw
            .create_music_token("Night Drive", "NDRV", tokens(1_000_000), addr(7))
            .await;
        assert!(outcome.is_confirmed());
        assert!(!gw.is_loading());
        assert_eq!(gw.last_outcome(), Some(outcome));

        let sent = wallet.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, PLATFORM);
        let decoded = IMusicPlatform::createMusicTokenCall::abi_decode(&sent[0].data, true).unwrap();
        assert_eq!(decoded.name, "Night Drive");
        assert_eq!(decoded.maxSupply, tokens(1_000_000));
        assert_eq!(decoded.artist, addr(7));
        assert_eq!(gw.metrics.tx_confirmed.get(), 1);
        assert_eq!(gw.metrics.inflight_tx.get(), 0);
    }

    #[tokio::test]
    async fn rejected_send_reports_first_line_only() {
        let wallet = Arc::new(MockWallet::default());
        wallet.fail_send_to.lock().insert(PLATFORM);
        let gw = gateway(wallet.clone());

        let outcome = gw.cancel_listing(U256::from(3u8)).await;
        assert_eq!(
            outcome,
            TxOutcome::Failed {
                message: "User rejected the request.".to_string()
            }
        );
        assert_eq!(gw.metrics.tx_sent.get(), 0);
        assert_eq!(gw.metrics.tx_failed.get(), 1);
        assert!(!gw.is_loading());
    }

    #[tokio::test]
    async fn reverted_receipt_is_a_failure() {
        let wallet = Arc::new(MockWallet::default());
        let token = addr(50);
        wallet.revert_to.lock().insert(token);
        let gw = gateway(wallet.clone());

        match gw.withdraw_revenue(token).await {
            TxOutcome::Failed { message } => assert!(message.ends_with("reverted"), "{}", message),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(gw.metrics.tx_sent.get(), 1);
    }

    #[tokio::test]
    async fn purchase_approves_payment_then_buys() {
        let wallet = Arc::new(MockWallet::default());
        let gw = gateway(wallet.clone());

        let outcome = gw.purchase(U256::from(9u8), usdc(25)).await;
        assert!(outcome.is_confirmed());
        let sent = wallet.sent.lock().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, addr(0xcc));
        let approve = IMusicToken::approveCall::abi_decode(&sent[0].data, true).unwrap();
        assert_eq!(approve.spender, PLATFORM);
        assert_eq!(approve.amount, usdc(25));
        assert_eq!(sent[1].to, PLATFORM);
        let buy = IMusicPlatform::buyTokenCall::abi_decode(&sent[1].data, true).unwrap();
        assert_eq!(buy.listingId, U256::from(9u8));
        assert_eq!(buy.usdcAmount, usdc(25));
    }

    #[tokio::test]
    async fn list_for_sale_stops_when_approval_fails() {
        let wallet = Arc::new(MockWallet::default());
        let token = addr(50);
        wallet.revert_to.lock().insert(token);
        let gw = gateway(wallet.clone());

        let outcome = gw.list_for_sale(token, tokens(10), usdc(2)).await;
        assert!(!outcome.is_confirmed());
        let sent = wallet.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, token);
    }

    #[tokio::test]
    async fn concurrent_writes_are_serialized() {
        let wallet = Arc::new(MockWallet::default());
        let gw = Arc::new(gateway(wallet.clone()));

        // the wallet yields while a receipt is pending, so without the write
        // lock the deposit would land between approve and list
        let a = gw.list_for_sale(addr(50), tokens(1), usdc(1));
        let b = gw.deposit_revenue(addr(51), usdc(100));
        let (a, b) = tokio::join!(a, b);
        assert!(a.is_confirmed() && b.is_confirmed());

        let targets: Vec<Address> = wallet.sent.lock().iter().map(|r| r.to).collect();
        assert_eq!(targets, vec![addr(50), PLATFORM, addr(51)]);
        assert_eq!(gw.metrics.inflight_tx.get(), 0);
    }

    #[tokio::test]
    async fn loading_stays_raised_across_both_purchase_steps() {
        let wallet = Arc::new(MockWallet::default());
        let gw = gateway(wallet.clone());
        let done = AtomicBool::new(false);

        let buy = async {
            let outcome = gw.purchase(U256::from(4u8), usdc(10)).await;
            done.store(true, Ordering::SeqCst);
            outcome
        };
        let watch = async {
            let mut samples = Vec::new();
            while !done.load(Ordering::SeqCst) {
                samples.push((wallet.sent.lock().len(), gw.is_loading(), gw.metrics.inflight_tx.get()));
                tokio::task::yield_now().await;
            }
            samples
        };
        let (outcome, samples) = tokio::join!(buy, watch);
        assert!(outcome.is_confirmed());

        let mid_flight: Vec<_> = samples.iter().filter(|(sent, _, _)| *sent > 0).collect();
        assert!(mid_flight.iter().any(|(sent, _, _)| *sent == 1));
        assert!(mid_flight.iter().any(|(sent, _, _)| *sent == 2));
        for (_, loading, inflight) in mid_flight {
            assert!(*loading);
            assert_eq!(*inflight, 1);
        }
        assert!(!gw.is_loading());
        assert_eq!(gw.metrics.inflight_tx.get(), 0);
    }
}
