//! Resale state of a single ticket and the call-to-action it offers.
//!
//! [`reconcile_ticket_state`] combines the ticket, its listing and the event
//! into the two flags the views need. [`resolve_action`] turns them into the
//! one action a ticket card shows for a given viewer.

pub mod flow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Address, EventRecord, ListingRecord, TicketRecord, Wei};

/// Listing-derived flags of a ticket for one viewer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TicketState {
    /// The viewer may list this ticket now
    pub for_resale: bool,
    /// An active listing exists
    pub is_listed: bool,
}

/// Returns the listing only if it is active
fn active(listing: Option<&ListingRecord>) -> Option<&ListingRecord> {
    listing.filter(|l| l.is_active())
}

/// Reconcile a ticket with its listing for `viewer`
///
/// `for_resale` requires a valid ticket held by the viewer, an event in the
/// future and no active listing; `is_listed` requires a listing with a
/// non-zero price.
#[must_use]
pub fn reconcile_ticket_state(
    ticket: &TicketRecord,
    listing: Option<&ListingRecord>,
    viewer: Option<Address>,
    event: &EventRecord,
    now: DateTime<Utc>,
) -> TicketState {
    let is_listed = active(listing).is_some();
    let is_holder = viewer.is_some_and(|v| v == ticket.owner);

    TicketState {
        for_resale: ticket.valid && is_holder && !event.has_occurred(now) && !is_listed,
        is_listed,
    }
}

/// Where a ticket card is rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TicketDisplayOptions {
    /// Owner controls (list, cancel) are shown
    pub show_resale_option: bool,
    /// The event already took place
    pub is_past: bool,
    /// Rendered on the marketplace (buy control is shown)
    pub is_marketplace: bool,
}

impl TicketDisplayOptions {
    /// Options for the holder's dashboard
    #[must_use]
    pub const fn dashboard(is_past: bool) -> Self {
        Self {
            show_resale_option: true,
            is_past,
            is_marketplace: false,
        }
    }

    /// Options for the marketplace page
    #[must_use]
    pub const fn marketplace(is_past: bool) -> Self {
        Self {
            show_resale_option: false,
            is_past,
            is_marketplace: true,
        }
    }
}

/// The single control a ticket card offers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketAction {
    /// Holder may list the ticket
    ListForResale,
    /// Seller may withdraw the listing
    CancelListing,
    /// Viewer may buy the listing
    BuyListed {
        /// Asking price
        price: Wei,
    },
    /// Nothing to do
    None,
}

impl TicketAction {
    /// Button label, `None` when no control is shown
    #[must_use]
    pub const fn label(self) -> Option<&'static str> {
        match self {
            Self::ListForResale => Some("List for Resale"),
            Self::CancelListing => Some("Cancel the listing"),
            Self::BuyListed { .. } => Some("Buy Ticket"),
            Self::None => None,
        }
    }
}

/// Decide the control for `ticket` as seen by `viewer`
///
/// Sellers and owner views get list or cancel; other marketplace viewers get
/// buy. Past or invalidated tickets are never listed or bought.
#[must_use]
pub fn resolve_action(
    ticket: &TicketRecord,
    listing: Option<&ListingRecord>,
    options: TicketDisplayOptions,
    viewer: Option<Address>,
) -> TicketAction {
    let listing = active(listing);
    let viewer_is_seller = matches!((viewer, listing), (Some(v), Some(l)) if v == l.seller);
    let viewer_is_holder = viewer.is_some_and(|v| v == ticket.owner);
    let tradable = ticket.valid && !options.is_past;

    if viewer_is_seller || options.show_resale_option {
        return match listing {
            Some(_) if viewer_is_seller => TicketAction::CancelListing,
            None if viewer_is_holder && tradable => TicketAction::ListForResale,
            _ => TicketAction::None,
        };
    }

    match listing {
        Some(l) if options.is_marketplace && tradable => TicketAction::BuyListed { price: l.price },
        _ => TicketAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventId, TokenId};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default()
    }

    fn seller() -> Address {
        Address::from_bytes([0x5e; 20])
    }

    fn buyer() -> Address {
        Address::from_bytes([0xb0; 20])
    }

    fn event(days_from_now: i64) -> EventRecord {
        EventRecord {
            id: EventId::new(1),
            name: "Expo".into(),
            date: now() + Duration::days(days_from_now),
            location: "Hall".into(),
            description: String::new(),
            image_url: String::new(),
            price: Wei::new(10),
            total_tickets: 10,
            tickets_sold: 1,
            organizer: Address::from_bytes([0x0a; 20]),
            category: "Tech".into(),
            max_tickets_per_buyer: 5,
        }
    }

    fn ticket() -> TicketRecord {
        TicketRecord {
            token_id: TokenId::new(7),
            owner: seller(),
            event_id: EventId::new(1),
            valid: true,
            token_uri: String::new(),
        }
    }

    fn listing(price: u128) -> ListingRecord {
        ListingRecord {
            token_id: TokenId::new(7),
            seller: seller(),
            price: Wei::new(price),
        }
    }

    #[test]
    fn holder_of_future_unlisted_ticket_may_list() {
        let state = reconcile_ticket_state(&ticket(), None, Some(seller()), &event(3), now());
        assert_eq!(state, TicketState { for_resale: true, is_listed: false });
    }

    #[test]
    fn zero_price_listing_is_not_listed() {
        let state =
            reconcile_ticket_state(&ticket(), Some(&listing(0)), Some(seller()), &event(3), now());
        assert!(!state.is_listed);
        assert!(state.for_resale);
    }

    #[test]
    fn listed_or_past_tickets_are_not_for_resale() {
        let listed =
            reconcile_ticket_state(&ticket(), Some(&listing(5)), Some(seller()), &event(3), now());
        assert_eq!(listed, TicketState { for_resale: false, is_listed: true });

        let past = reconcile_ticket_state(&ticket(), None, Some(seller()), &event(-1), now());
        assert!(!past.for_resale);
    }

    #[test]
    fn invalidated_ticket_is_not_for_resale() {
        let invalidated = TicketRecord { valid: false, ..ticket() };
        let state = reconcile_ticket_state(&invalidated, None, Some(seller()), &event(3), now());
        assert!(!state.for_resale);

        let action =
            resolve_action(&invalidated, None, TicketDisplayOptions::dashboard(false), Some(seller()));
        assert_eq!(action, TicketAction::None);
    }

    #[test]
    fn non_holder_never_for_resale() {
        let state = reconcile_ticket_state(&ticket(), None, Some(buyer()), &event(3), now());
        assert!(!state.for_resale);
        let state = reconcile_ticket_state(&ticket(), None, None, &event(3), now());
        assert!(!state.for_resale);
    }

    #[test]
    fn seller_sees_cancel_and_buyer_sees_buy() {
        let options = TicketDisplayOptions::marketplace(false);
        let for_seller = resolve_action(&ticket(), Some(&listing(5)), options, Some(seller()));
        let for_buyer = resolve_action(&ticket(), Some(&listing(5)), options, Some(buyer()));

        assert_eq!(for_seller.label(), Some("Cancel the listing"));
        assert_eq!(for_buyer, TicketAction::BuyListed { price: Wei::new(5) });
        assert_eq!(for_buyer.label(), Some("Buy Ticket"));
    }

    #[test]
    fn dashboard_offers_list_then_cancel() {
        let options = TicketDisplayOptions::dashboard(false);
        assert_eq!(
            resolve_action(&ticket(), None, options, Some(seller())),
            TicketAction::ListForResale
        );
        assert_eq!(
            resolve_action(&ticket(), Some(&listing(5)), options, Some(seller())),
            TicketAction::CancelListing
        );
    }

    #[test]
    fn past_tickets_offer_neither_list_nor_buy() {
        assert_eq!(
            resolve_action(&ticket(), None, TicketDisplayOptions::dashboard(true), Some(seller())),
            TicketAction::None
        );
        assert_eq!(
            resolve_action(
                &ticket(),
                Some(&listing(5)),
                TicketDisplayOptions::marketplace(true),
                Some(buyer())
            ),
            TicketAction::None
        );
    }

    #[test]
    fn invalidated_ticket_cannot_be_listed() {
        let mut ticket = ticket();
        ticket.valid = false;
        assert_eq!(
            resolve_action(&ticket, None, TicketDisplayOptions::dashboard(false), Some(seller())),
            TicketAction::None
        );
    }
}
