//! Dashboard, marketplace and event browsing views.

#![allow(clippy::unwrap_used)] // Test code

use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tixchain_client::mocks::{InMemoryChain, DEPLOYER_ADDRESS, MARKETPLACE_ADDRESS};
use tixchain_client::organizer::{self, NewEvent};
use tixchain_client::views::{self, EventFilter};
use tixchain_client::{
    Address, ContractGateway, EventId, SharedGateway, TicketAction, TicketState, TokenId, Wei,
};
use tixchain_core::environment::Clock;
use tixchain_testing::{test_clock, FixedClock};

fn organizer_address() -> Address {
    Address::from_bytes([0x0a; 20])
}

fn alice() -> Address {
    Address::from_bytes([0xa1; 20])
}

fn bob() -> Address {
    Address::from_bytes([0xb0; 20])
}

/// Two events; alice holds tokens 0 and 1 of the festival (0 listed at 750)
/// and the only ticket of the workshop, which has already taken place.
async fn setup() -> (SharedGateway, FixedClock) {
    let (chain, clock) = setup_chain().await;
    (chain.shared(), clock)
}

async fn setup_chain() -> (InMemoryChain, FixedClock) {
    let clock = test_clock();
    let chain = InMemoryChain::new(Arc::new(clock.clone()));
    let gateway = chain.shared();
    let now = clock.now();

    let festival = NewEvent::new("Harbour Festival", now + ChronoDuration::days(7), Wei::new(500), 5)
        .location("Porto")
        .category("Music");
    let workshop = NewEvent::new("Rust Workshop", now + ChronoDuration::days(2), Wei::new(100), 1)
        .location("Berlin")
        .category("Tech");
    organizer::create_event(gateway.as_ref(), organizer_address(), festival, now).await.unwrap();
    organizer::create_event(gateway.as_ref(), organizer_address(), workshop, now).await.unwrap();

    gateway
        .buy_multiple_tickets(alice(), EventId::new(0), 2, vec![String::new(); 2], Wei::new(1_000))
        .await
        .unwrap();
    gateway
        .buy_ticket(alice(), EventId::new(1), String::new(), Wei::new(100))
        .await
        .unwrap();
    gateway.approve(alice(), MARKETPLACE_ADDRESS, TokenId::new(0)).await.unwrap();
    gateway.list_ticket(alice(), TokenId::new(0), Wei::new(750)).await.unwrap();

    clock.advance(ChronoDuration::days(3));
    (chain, clock)
}

#[tokio::test]
async fn dashboard_splits_by_date_with_owner_actions() {
    let (gateway, clock) = setup().await;

    let dashboard = views::dashboard(gateway.as_ref(), alice(), clock.now()).await.unwrap();
    assert_eq!(dashboard.len(), 3);

    let upcoming: Vec<_> = dashboard
        .upcoming
        .iter()
        .map(|v| (v.ticket.token_id, v.state, v.action))
        .collect();
    assert_eq!(
        upcoming,
        [
            (
                TokenId::new(0),
                TicketState { for_resale: false, is_listed: true },
                TicketAction::CancelListing
            ),
            (
                TokenId::new(1),
                TicketState { for_resale: true, is_listed: false },
                TicketAction::ListForResale
            ),
        ]
    );

    let past = &dashboard.past[0];
    assert_eq!(past.ticket.token_id, TokenId::new(2));
    assert!(!past.state.for_resale);
    assert_eq!(past.action, TicketAction::None);
}

#[tokio::test]
async fn empty_dashboard_for_new_wallet() {
    let (gateway, clock) = setup().await;
    assert!(views::dashboard(gateway.as_ref(), bob(), clock.now()).await.unwrap().is_empty());
}

#[tokio::test]
async fn marketplace_actions_depend_on_viewer() {
    let (gateway, clock) = setup().await;
    let now = clock.now();

    let for_bob = views::marketplace(gateway.as_ref(), Some(bob()), now).await.unwrap();
    assert_eq!(for_bob.len(), 1);
    assert_eq!(for_bob[0].event.name, "Harbour Festival");
    assert_eq!(for_bob[0].action, TicketAction::BuyListed { price: Wei::new(750) });

    let for_seller = views::marketplace(gateway.as_ref(), Some(alice()), now).await.unwrap();
    assert_eq!(for_seller[0].action, TicketAction::CancelListing);
}

#[tokio::test]
async fn event_listings() {
    let (gateway, clock) = setup().await;

    let created = views::created_events(gateway.as_ref(), organizer_address()).await.unwrap();
    assert_eq!(created.len(), 2);
    assert!(views::created_events(gateway.as_ref(), bob()).await.unwrap().is_empty());

    // The workshop is both past and sold out
    let available = views::available_events(gateway.as_ref(), clock.now()).await.unwrap();
    let names: Vec<_> = available.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Harbour Festival"]);

    assert_eq!(views::categories(&created), ["Music", "Tech"]);
    assert_eq!(EventFilter::new("berlin", "All").apply(&created).len(), 1);
    assert!(EventFilter::new("berlin", "Music").apply(&created).is_empty());
}

#[tokio::test]
async fn invalidated_ticket_is_not_offered_for_resale() {
    let (chain, clock) = setup_chain().await;
    let gateway = chain.shared();
    gateway.invalidate_ticket(DEPLOYER_ADDRESS, TokenId::new(1)).await.unwrap();

    let dashboard = views::dashboard(gateway.as_ref(), alice(), clock.now()).await.unwrap();
    let view = dashboard
        .upcoming
        .iter()
        .find(|v| v.ticket.token_id == TokenId::new(1))
        .unwrap();
    assert!(!view.ticket.valid);
    assert_eq!(view.state, TicketState { for_resale: false, is_listed: false });
    assert_eq!(view.action, TicketAction::None);
}

#[tokio::test]
async fn dashboard_skips_an_unreadable_ticket() {
    let (chain, clock) = setup_chain().await;
    chain.set_ticket_unreadable(TokenId::new(1), true);

    let dashboard = views::dashboard(chain.shared().as_ref(), alice(), clock.now()).await.unwrap();
    let tokens: Vec<_> = dashboard
        .upcoming
        .iter()
        .chain(&dashboard.past)
        .map(|v| v.ticket.token_id)
        .collect();
    assert_eq!(tokens, [TokenId::new(0), TokenId::new(2)]);
}

#[tokio::test]
async fn marketplace_skips_an_unreadable_listing() {
    let (chain, clock) = setup_chain().await;
    let gateway = chain.shared();
    // A second listing, by bob
    gateway
        .buy_ticket(bob(), EventId::new(0), String::new(), Wei::new(500))
        .await
        .unwrap();
    gateway.approve(bob(), MARKETPLACE_ADDRESS, TokenId::new(3)).await.unwrap();
    gateway.list_ticket(bob(), TokenId::new(3), Wei::new(900)).await.unwrap();
    assert_eq!(views::marketplace(gateway.as_ref(), None, clock.now()).await.unwrap().len(), 2);

    chain.set_ticket_unreadable(TokenId::new(0), true);
    let listed = views::marketplace(gateway.as_ref(), None, clock.now()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].ticket.token_id, TokenId::new(3));
}

#[tokio::test]
async fn event_lists_skip_an_unreadable_event() {
    let (chain, clock) = setup_chain().await;
    let gateway = chain.shared();
    chain.set_event_unreadable(EventId::new(0), true);

    let created = views::created_events(gateway.as_ref(), organizer_address()).await.unwrap();
    let names: Vec<_> = created.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Rust Workshop"]);
    assert!(views::available_events(gateway.as_ref(), clock.now()).await.unwrap().is_empty());

    chain.set_offline(true);
    assert!(views::created_events(gateway.as_ref(), organizer_address()).await.is_err());
}
