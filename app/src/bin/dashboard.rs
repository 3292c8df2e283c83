use std::{env, path::PathBuf, sync::Arc};

use alloy_primitives::{Address, U256};
use anyhow::{anyhow, bail, Context, Result};
use app::{config::load_config, render};
use market_core::{
    parse_units, ChainReader, ListingStatus, Metrics, TxOutcome, WalletClient, USDC_DECIMALS,
};
use market_engine::{PlatformSession, RpcChainClient, RpcPool};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: dashboard <config.json> <user-address> \
[portfolio|listings|activity|tokens|revenue <token>|listing <id>|buy <id> <usdc>|all] [--metrics]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Portfolio,
    Listings,
    Activity,
    Tokens,
    Revenue(Address),
    Listing(U256),
    Buy { listing_id: U256, usdc: U256 },
    All,
}

fn listing_id(args: &mut impl Iterator<Item = String>) -> Result<U256> {
    let raw = args
        .next()
        .ok_or_else(|| anyhow!("missing listing id\n{}", USAGE))?;
    raw.parse().with_context(|| format!("listing id {}", raw))
}

fn parse_view(args: &mut impl Iterator<Item = String>) -> Result<View> {
    let view = match args.next().as_deref() {
        None | Some("all") => View::All,
        Some("portfolio") => View::Portfolio,
        Some("listings") => View::Listings,
        Some("activity") => View::Activity,
        Some("tokens") => View::Tokens,
        Some("revenue") => {
            let token = args
                .next()
                .ok_or_else(|| anyhow!("revenue needs a token address\n{}", USAGE))?;
            View::Revenue(token.parse().with_context(|| format!("token address {}", token))?)
        }
        Some("listing") => View::Listing(listing_id(args)?),
        Some("buy") => {
            let listing_id = listing_id(args)?;
            let amount = args
                .next()
                .ok_or_else(|| anyhow!("buy needs a USDC amount\n{}", USAGE))?;
            View::Buy {
                listing_id,
                usdc: parse_units(&amount, USDC_DECIMALS)?,
            }
        }
        Some(other) => bail!("unknown view '{}'\n{}", other, USAGE),
    };
    Ok(view)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (flags, mut args): (Vec<String>, Vec<String>) =
        env::args().skip(1).partition(|a| a.starts_with("--"));
    let print_metrics = flags.iter().any(|f| f == "--metrics");
    if args.len() < 2 {
        bail!(USAGE);
    }
    let rest = args.split_off(2);
    let config_path = PathBuf::from(&args[0]);
    let user: Address = args[1]
        .parse()
        .with_context(|| format!("user address {}", args[1]))?;
    let view = parse_view(&mut rest.into_iter())?;

    let cfg = load_config(&config_path).await?;

    let registry = Registry::new();
    let pool = Arc::new(RpcPool::new(&cfg.rpc, &registry).context("create rpc pool")?);
    let metrics = Metrics::new(&registry).context("register metrics")?;
    let client = Arc::new(RpcChainClient::new(pool, &cfg));

    let wallet: Option<Arc<dyn WalletClient>> = match cfg.account {
        Some(_) => Some(client.clone() as Arc<dyn WalletClient>),
        None => None,
    };
    let reader: Arc<dyn ChainReader> = client;
    let mut session = PlatformSession::new(cfg.clone(), metrics);
    session.connect(reader, wallet);
    info!(%user, ?view, rpc=%cfg.rpc.url, "dashboard starting");

    match view {
        View::Portfolio => print!("{}", render::portfolio(&session.portfolio_summary(user).await)),
        View::Listings => print!("{}", render::listings(&session.listing_history(user).await)),
        View::Activity => print!("{}", render::activity(&session.activity(user).await)),
        View::Tokens => print!("{}", render::created_tokens(&session.user_tokens(user).await)),
        View::Revenue(token) => {
            let summary = session
                .token_revenue(token, user)
                .await
                .context("read token revenue")?;
            print!("{}", render::revenue(&summary));
        }
        View::Listing(id) => {
            let detail = session
                .listing_detail(id, Some(user))
                .await
                .context("read listing")?;
            print!("{}", render::listing_detail(&detail, None));
        }
        View::Buy { listing_id, usdc } => {
            if usdc.is_zero() {
                bail!("purchase amount must be greater than zero");
            }
            let detail = session
                .listing_detail(listing_id, Some(user))
                .await
                .context("read listing")?;
            print!("{}", render::listing_detail(&detail, Some(usdc)));
            if detail.status() != ListingStatus::Active {
                bail!("listing {} is {}", listing_id, detail.status());
            }
            if detail.buyer_balance.is_some_and(|balance| balance < usdc) {
                bail!("insufficient USDC balance for this purchase");
            }
            match session.purchase(listing_id, usdc).await {
                TxOutcome::Confirmed { hash, block_number } => {
                    println!("purchase confirmed in block {}: {}", block_number, hash)
                }
                TxOutcome::Failed { message } => bail!("purchase failed: {}", message),
            }
        }
        View::All => {
            let (portfolio, listings, activity, tokens) = tokio::join!(
                session.portfolio_summary(user),
                session.listing_history(user),
                session.activity(user),
                session.user_tokens(user),
            );
            print!("{}", render::portfolio(&portfolio));
            println!();
            print!("{}", render::listings(&listings));
            println!();
            print!("{}", render::activity(&activity));
            println!();
            print!("{}", render::created_tokens(&tokens));
        }
    }

    session.disconnect();

    if print_metrics {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .context("encode metrics")?;
        eprint!("{}", String::from_utf8_lossy(&buffer));
    }
    Ok(())
}
