//! Read-side view models: dashboard, organizer events, event browsing and
//! the resale marketplace.
//!
//! Each view fans its per-item reads out concurrently. A failing top-level
//! read fails the view; a failing per-item read drops that item with a
//! warning so one bad token does not blank the page.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::eligibility::{availability_tier, AvailabilityTier};
use crate::gateway::{ContractGateway, GatewayResult};
use crate::resale::{
    reconcile_ticket_state, resolve_action, TicketAction, TicketDisplayOptions, TicketState,
};
use crate::types::{Address, EventId, EventRecord, ListingRecord, TicketRecord, TokenId};

/// Category value that matches every event
pub const ALL_CATEGORIES: &str = "All";

// ============================================================================
// Ticket views
// ============================================================================

/// One ticket card, joined with its event and listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketView {
    /// Ticket
    pub ticket: TicketRecord,
    /// Event the ticket admits to
    pub event: EventRecord,
    /// Active listing, if any
    pub listing: Option<ListingRecord>,
    /// Resale flags for the viewer
    pub state: TicketState,
    /// Control shown to the viewer
    pub action: TicketAction,
}

/// Tickets of one holder, split by event date
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Events still to come
    pub upcoming: Vec<TicketView>,
    /// Events that already took place
    pub past: Vec<TicketView>,
}

impl Dashboard {
    /// Total number of tickets shown
    #[must_use]
    pub fn len(&self) -> usize {
        self.upcoming.len() + self.past.len()
    }

    /// Returns `true` if the holder has no tickets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty() && self.past.is_empty()
    }
}

/// Read a ticket with its event and active listing
async fn load_ticket(
    gateway: &dyn ContractGateway,
    token_id: TokenId,
) -> GatewayResult<(TicketRecord, EventRecord, Option<ListingRecord>)> {
    let ticket = gateway.get_ticket(token_id).await?;
    let (event, listing) = tokio::join!(
        gateway.get_event(ticket.event_id),
        gateway.get_listing(token_id)
    );
    Ok((ticket, event?, listing?.filter(ListingRecord::is_active)))
}

fn ticket_view(
    ticket: TicketRecord,
    event: EventRecord,
    listing: Option<ListingRecord>,
    viewer: Option<Address>,
    options: TicketDisplayOptions,
    now: DateTime<Utc>,
) -> TicketView {
    let state = reconcile_ticket_state(&ticket, listing.as_ref(), viewer, &event, now);
    let action = resolve_action(&ticket, listing.as_ref(), options, viewer);
    TicketView {
        ticket,
        event,
        listing,
        state,
        action,
    }
}

/// Tickets held by `owner`
///
/// # Errors
///
/// Returns [`GatewayError`](crate::error::GatewayError) if the owner's token
/// list cannot be read.
pub async fn dashboard(
    gateway: &dyn ContractGateway,
    owner: Address,
    now: DateTime<Utc>,
) -> GatewayResult<Dashboard> {
    let token_ids = gateway.tickets_of_user(owner).await?;
    tracing::debug!(%owner, tickets = token_ids.len(), "Loading dashboard");

    let loaded = join_all(token_ids.iter().map(|id| load_ticket(gateway, *id))).await;

    let mut dashboard = Dashboard::default();
    for (token_id, result) in token_ids.into_iter().zip(loaded) {
        let (ticket, event, listing) = match result {
            Ok(parts) => parts,
            Err(error) => {
                tracing::warn!(%token_id, %error, "Skipping unreadable ticket");
                continue;
            },
        };

        let is_past = event.has_occurred(now);
        let view = ticket_view(
            ticket,
            event,
            listing,
            Some(owner),
            TicketDisplayOptions::dashboard(is_past),
            now,
        );
        if is_past {
            dashboard.past.push(view);
        } else {
            dashboard.upcoming.push(view);
        }
    }

    Ok(dashboard)
}

/// Every active listing, with the control `viewer` gets for it
///
/// # Errors
///
/// Returns [`GatewayError`](crate::error::GatewayError) if the listings
/// cannot be read.
pub async fn marketplace(
    gateway: &dyn ContractGateway,
    viewer: Option<Address>,
    now: DateTime<Utc>,
) -> GatewayResult<Vec<TicketView>> {
    let listings: Vec<ListingRecord> = gateway
        .get_all_listings()
        .await?
        .into_iter()
        .filter(ListingRecord::is_active)
        .collect();

    let loaded = join_all(listings.iter().map(|listing| async move {
        let ticket = gateway.get_ticket(listing.token_id).await?;
        let event = gateway.get_event(ticket.event_id).await?;
        Ok::<_, crate::error::GatewayError>((ticket, event))
    }))
    .await;

    let views = listings
        .into_iter()
        .zip(loaded)
        .filter_map(|(listing, result)| match result {
            Ok((ticket, event)) => {
                let options = TicketDisplayOptions::marketplace(event.has_occurred(now));
                Some(ticket_view(ticket, event, Some(listing), viewer, options, now))
            },
            Err(error) => {
                tracing::warn!(token_id = %listing.token_id, %error, "Skipping unreadable listing");
                None
            },
        })
        .collect();

    Ok(views)
}

// ============================================================================
// Event views
// ============================================================================

async fn all_events(gateway: &dyn ContractGateway) -> GatewayResult<Vec<EventRecord>> {
    let count = gateway.event_count().await?;
    let results = join_all((0..count).map(|id| gateway.get_event(EventId::new(id)))).await;

    Ok(results
        .into_iter()
        .filter_map(|result| {
            result
                .map_err(|error| tracing::warn!(%error, "Skipping unreadable event"))
                .ok()
        })
        .collect())
}

/// Events created by `organizer`
///
/// # Errors
///
/// Returns [`GatewayError`](crate::error::GatewayError) if the event count
/// cannot be read.
pub async fn created_events(
    gateway: &dyn ContractGateway,
    organizer: Address,
) -> GatewayResult<Vec<EventRecord>> {
    let mut events = all_events(gateway).await?;
    events.retain(|event| event.organizer == organizer);
    Ok(events)
}

/// Future events with tickets left
///
/// # Errors
///
/// Returns [`GatewayError`](crate::error::GatewayError) if the event count
/// cannot be read.
pub async fn available_events(
    gateway: &dyn ContractGateway,
    now: DateTime<Utc>,
) -> GatewayResult<Vec<EventRecord>> {
    let mut events = all_events(gateway).await?;
    events.retain(|event| !event.has_occurred(now) && !event.is_sold_out());
    Ok(events)
}

/// Availability badge of an event
#[must_use]
pub const fn event_availability(event: &EventRecord) -> AvailabilityTier {
    availability_tier(event.remaining_supply())
}

// ============================================================================
// Filtering
// ============================================================================

/// Search box and category picker of the events page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Free-text search
    pub search: String,
    /// Category, empty or [`ALL_CATEGORIES`] for any
    pub category: String,
}

impl EventFilter {
    /// Filter with the given search text and category
    #[must_use]
    pub fn new(search: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            category: category.into(),
        }
    }

    /// Returns `true` if `event` passes both the search and the category
    #[must_use]
    pub fn matches(&self, event: &EventRecord) -> bool {
        let category = self.category.trim();
        let category_matches = category.is_empty()
            || category.eq_ignore_ascii_case(ALL_CATEGORIES)
            || category.eq_ignore_ascii_case(event.category.trim());

        let needle = self.search.trim().to_lowercase();
        let search_matches = needle.is_empty()
            || [&event.name, &event.location, &event.description]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));

        category_matches && search_matches
    }

    /// Events passing the filter, in input order
    #[must_use]
    pub fn apply<'a>(&self, events: &'a [EventRecord]) -> Vec<&'a EventRecord> {
        events.iter().filter(|event| self.matches(event)).collect()
    }
}

/// Distinct categories of `events`, sorted
#[must_use]
pub fn categories(events: &[EventRecord]) -> Vec<String> {
    let mut categories: Vec<String> = events
        .iter()
        .map(|event| event.category.trim())
        .filter(|category| !category.is_empty())
        .map(str::to_string)
        .collect();
    categories.sort();
    categories.dedup();
    categories
}
