//! Properties of purchase eligibility and ticket action resolution.

use proptest::prelude::*;
use tixchain_client::eligibility::{compute_eligibility_for_supply, UserAllowance};
use tixchain_client::resale::{resolve_action, TicketAction, TicketDisplayOptions};
use tixchain_client::{Address, EventId, ListingRecord, PurchaseBlock, TicketRecord, TokenId, Wei};

fn ticket(owner: Address, valid: bool) -> TicketRecord {
    TicketRecord {
        token_id: TokenId::new(7),
        owner,
        event_id: EventId::new(1),
        valid,
        token_uri: String::new(),
    }
}

fn address(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

proptest! {
    #[test]
    fn max_purchasable_is_within_both_bounds(
        total in 0u32..500,
        sold in 0u32..600,
        max_per_buyer in 0u32..12,
        purchased in 0u32..15,
    ) {
        let remaining = UserAllowance::new(max_per_buyer, purchased).remaining();
        let eligibility = compute_eligibility_for_supply(total, sold, Some(remaining));

        prop_assert!(eligibility.max_purchasable <= total.saturating_sub(sold));
        prop_assert!(eligibility.max_purchasable <= remaining);
        prop_assert_eq!(eligibility.can_buy_more, eligibility.max_purchasable > 0);
        prop_assert_eq!(eligibility.block.is_none(), eligibility.can_buy_more);
    }

    #[test]
    fn sold_out_never_allows_buying(total in 0u32..500, extra in 0u32..10, allowance in 0u32..10) {
        let eligibility = compute_eligibility_for_supply(total, total + extra, Some(allowance));

        prop_assert!(!eligibility.can_buy_more);
        prop_assert_eq!(eligibility.block, Some(PurchaseBlock::SoldOut));
    }

    #[test]
    fn exhausted_allowance_never_allows_buying(total in 1u32..500, max in 0u32..10) {
        let remaining = UserAllowance::new(max, max).remaining();
        let eligibility = compute_eligibility_for_supply(total, 0, Some(remaining));

        prop_assert!(!eligibility.can_buy_more);
        prop_assert_eq!(eligibility.max_purchasable, 0);
    }

    #[test]
    fn disconnected_wallet_never_allows_buying(total in 0u32..500, sold in 0u32..500) {
        prop_assert!(!compute_eligibility_for_supply(total, sold, None).can_buy_more);
    }

    #[test]
    fn active_listing_is_never_offered_for_listing(
        owner in 1u8..4,
        seller in 1u8..4,
        viewer in proptest::option::of(1u8..4),
        price in 1u128..1_000_000,
        valid in any::<bool>(),
        show_resale_option in any::<bool>(),
        is_past in any::<bool>(),
        is_marketplace in any::<bool>(),
    ) {
        let listing = ListingRecord {
            token_id: TokenId::new(7),
            seller: address(seller),
            price: Wei::new(price),
        };
        let options = TicketDisplayOptions { show_resale_option, is_past, is_marketplace };

        let action = resolve_action(
            &ticket(address(owner), valid),
            Some(&listing),
            options,
            viewer.map(address),
        );
        prop_assert_ne!(action, TicketAction::ListForResale);
    }
}

#[test]
fn sold_out_scenario() {
    let eligibility = compute_eligibility_for_supply(2, 2, Some(5));
    assert_eq!(eligibility.max_purchasable, 0);
    assert_eq!(eligibility.block.map(PurchaseBlock::label), Some("Sold Out"));
}

#[test]
fn allowance_exhausted_scenario() {
    let remaining = UserAllowance::new(3, 3).remaining();
    let eligibility = compute_eligibility_for_supply(100, 10, Some(remaining));
    assert_eq!(eligibility.max_purchasable, 0);
    assert_eq!(eligibility.block.map(PurchaseBlock::label), Some("Max Tickets Reached"));
}

#[test]
fn listed_ticket_scenario() {
    let seller = address(0x5e);
    let buyer = address(0xb0);
    let ticket = ticket(seller, true);
    let listing = ListingRecord {
        token_id: TokenId::new(7),
        seller,
        price: Wei::new(50),
    };
    let marketplace = TicketDisplayOptions::marketplace(false);

    let for_seller = resolve_action(&ticket, Some(&listing), marketplace, Some(seller));
    let for_buyer = resolve_action(&ticket, Some(&listing), marketplace, Some(buyer));

    assert_eq!(for_seller.label(), Some("Cancel the listing"));
    assert_eq!(for_buyer, TicketAction::BuyListed { price: Wei::new(50) });
    assert_eq!(for_buyer.label(), Some("Buy Ticket"));
}
