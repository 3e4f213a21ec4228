//! Walkthrough of the marketplace against the in-memory chain.
//!
//! An organizer creates an event, a buyer logs in and buys two tickets, lists
//! one for resale, and a collector buys it from the marketplace.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=tixchain=debug cargo run --bin tixchain-demo
//! ```
//!
//! Settings are read from the environment (and `.env`), see
//! [`tixchain_client::Config`].

use anyhow::Context as _;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tixchain_client::mocks::InMemoryChain;
use tixchain_client::organizer::{self, NewEvent};
use tixchain_client::purchase::{PurchaseAction, PurchaseEnvironment, PurchaseReducer, PurchaseState};
use tixchain_client::resale::flow::{ResaleAction, ResaleEnvironment, ResaleReducer, ResaleState};
use tixchain_client::storage::FileKeyValueStore;
use tixchain_client::views;
use tixchain_client::{Config, EventId, LocalWallet, WalletSession, Wei};
use tixchain_core::environment::{Clock, SystemClock};
use tixchain_runtime::Store;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tixchain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::from_env();
    info!(rpc_url = %config.rpc_url, "=== Tixchain marketplace demo ===");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let chain = InMemoryChain::new(Arc::clone(&clock));
    let gateway = chain.shared();

    let organizer = LocalWallet::random();
    let buyer = LocalWallet::random();
    let collector = LocalWallet::random();

    // Login
    let store = Arc::new(FileKeyValueStore::new(&config.session_path));
    let mut session = WalletSession::new(store, Some(Arc::new(buyer.clone())));
    let buyer_address = session.login().await.context("buyer login failed")?;
    info!(address = %buyer_address.to_checksum(), "Buyer logged in");

    // Event creation
    let form = NewEvent::new(
        "Harbour Lights Festival",
        clock.now() + ChronoDuration::days(30),
        Wei::from_ether_str("0.05")?,
        120,
    )
    .location("Porto")
    .description("Three stages by the river")
    .category("Music")
    .max_tickets_per_buyer(4);
    organizer::create_event(gateway.as_ref(), organizer.address(), form, clock.now()).await?;
    let event_id = EventId::new(0);

    // Primary sale
    let mut purchase_env = PurchaseEnvironment::new(Arc::clone(&gateway), Arc::clone(&clock));
    purchase_env.cooldown = config.status_cooldown;
    purchase_env.default_max_per_buyer = config.default_max_per_buyer;
    let purchase = Store::new(PurchaseState::new(event_id), PurchaseReducer::new(), purchase_env);

    purchase
        .send(PurchaseAction::Load { event_id, wallet: session.address() })
        .await?
        .wait()
        .await;
    purchase.send(PurchaseAction::IncrementQuantity).await?;
    purchase
        .send(PurchaseAction::Purchase { buyer: session.address() })
        .await?
        .wait()
        .await;

    let (status, remaining, eligibility) = purchase
        .state(|s| (s.status.status().clone(), s.displayed_remaining(), s.eligibility()))
        .await;
    info!(
        ?status,
        remaining = remaining.unwrap_or_default(),
        max_purchasable = eligibility.max_purchasable,
        "Purchase finished"
    );

    // Resale listing
    let dashboard = views::dashboard(gateway.as_ref(), buyer_address, clock.now()).await?;
    let ticket = dashboard
        .upcoming
        .first()
        .context("buyer holds no upcoming ticket")?
        .ticket
        .token_id;

    let resale_env = ResaleEnvironment {
        cooldown: config.status_cooldown,
        ..ResaleEnvironment::new(Arc::clone(&gateway))
    };
    let seller_flow = Store::new(ResaleState::new(ticket), ResaleReducer::new(), resale_env.clone());
    seller_flow
        .send(ResaleAction::List {
            seller: buyer_address,
            price: Wei::from_ether_str("0.08")?,
        })
        .await?
        .wait()
        .await;

    for view in views::marketplace(gateway.as_ref(), Some(collector.address()), clock.now()).await? {
        info!(
            token = %view.ticket.token_id,
            event = %view.event.name,
            price = %view.listing.map(|l| l.price).unwrap_or_default(),
            action = view.action.label().unwrap_or("-"),
            "Marketplace listing"
        );
    }

    // Resale purchase
    let collector_flow = Store::new(ResaleState::new(ticket), ResaleReducer::new(), resale_env);
    collector_flow
        .send(ResaleAction::Buy { buyer: collector.address() })
        .await?
        .wait()
        .await;
    let status = collector_flow.state(|s| s.status.status().clone()).await;
    info!(?status, "Resale purchase finished");

    let dashboard = views::dashboard(gateway.as_ref(), buyer_address, clock.now()).await?;
    info!(
        tickets = dashboard.len(),
        proceeds = %chain.proceeds_of(buyer_address),
        organizer_proceeds = %chain.proceeds_of(organizer.address()),
        "Buyer after resale"
    );

    session.logout()?;
    info!("Logged out");

    Ok(())
}
