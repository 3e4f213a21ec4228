//! Organizer operations: create events and manage their capacity and tickets.
//!
//! Inputs are validated locally before any transaction is sent, so obvious
//! mistakes never cost gas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ValidationError};
use crate::gateway::ContractGateway;
use crate::types::{
    Address, EventId, TokenId, TxReceipt, Wei, DEFAULT_MAX_TICKETS_PER_BUYER,
    MAX_TICKETS_PER_BUYER_CEILING,
};

/// Create-event form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Display name
    pub name: String,
    /// Start time
    #[serde(with = "chrono::serde::ts_seconds")]
    pub date: DateTime<Utc>,
    /// Price of one ticket
    pub price: Wei,
    /// Capacity
    pub total_tickets: u32,
    /// Venue
    pub location: String,
    /// Free-form description
    pub description: String,
    /// Image URL
    pub image_url: String,
    /// Browse category
    pub category: String,
    /// Per-buyer cap
    pub max_tickets_per_buyer: u32,
}

impl NewEvent {
    /// Form with the required fields and defaults for the rest
    #[must_use]
    pub fn new(name: impl Into<String>, date: DateTime<Utc>, price: Wei, total_tickets: u32) -> Self {
        Self {
            name: name.into(),
            date,
            price,
            total_tickets,
            location: String::new(),
            description: String::new(),
            image_url: String::new(),
            category: "Other".to_string(),
            max_tickets_per_buyer: DEFAULT_MAX_TICKETS_PER_BUYER,
        }
    }

    /// Set the venue
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the image URL
    #[must_use]
    pub fn image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    /// Set the category
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the per-buyer cap
    #[must_use]
    pub const fn max_tickets_per_buyer(mut self, max: u32) -> Self {
        self.max_tickets_per_buyer = max;
        self
    }

    /// Check the form against `now`
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: empty name or location,
    /// date not in the future, zero capacity, or a per-buyer cap outside
    /// `1..=MAX_TICKETS_PER_BUYER_CEILING`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("Event name"));
        }
        if self.location.trim().is_empty() {
            return Err(ValidationError::MissingField("Location"));
        }
        if self.date <= now {
            return Err(ValidationError::DateNotInFuture);
        }
        if self.total_tickets == 0 {
            return Err(ValidationError::NoCapacity);
        }
        validate_max_per_buyer(self.max_tickets_per_buyer)
    }
}

fn validate_max_per_buyer(value: u32) -> Result<(), ValidationError> {
    if (1..=MAX_TICKETS_PER_BUYER_CEILING).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::MaxPerBuyerOutOfRange {
            value,
            ceiling: MAX_TICKETS_PER_BUYER_CEILING,
        })
    }
}

/// Validate and create an event organized by `organizer`
///
/// # Errors
///
/// Returns [`ClientError::Validation`] for a bad form, or
/// [`ClientError::Gateway`] if the transaction fails.
pub async fn create_event(
    gateway: &dyn ContractGateway,
    organizer: Address,
    event: NewEvent,
    now: DateTime<Utc>,
) -> Result<TxReceipt, ClientError> {
    event.validate(now)?;
    tracing::info!(%organizer, name = %event.name, total = event.total_tickets, "Creating event");
    Ok(gateway.create_event(organizer, event).await?)
}

/// Add `count` tickets to an event's capacity
///
/// # Errors
///
/// Returns [`ValidationError::ZeroTicketCount`] for zero, or the gateway error.
pub async fn add_tickets(
    gateway: &dyn ContractGateway,
    organizer: Address,
    event_id: EventId,
    count: u32,
) -> Result<TxReceipt, ClientError> {
    if count == 0 {
        return Err(ValidationError::ZeroTicketCount.into());
    }
    tracing::info!(%event_id, count, "Adding tickets");
    Ok(gateway.add_tickets(organizer, event_id, count).await?)
}

/// Change an event's per-buyer cap
///
/// # Errors
///
/// Returns [`ValidationError::MaxPerBuyerOutOfRange`] outside
/// `1..=MAX_TICKETS_PER_BUYER_CEILING`, or the gateway error.
pub async fn update_max_tickets_per_buyer(
    gateway: &dyn ContractGateway,
    organizer: Address,
    event_id: EventId,
    max_tickets_per_buyer: u32,
) -> Result<TxReceipt, ClientError> {
    validate_max_per_buyer(max_tickets_per_buyer)?;
    tracing::info!(%event_id, max_tickets_per_buyer, "Updating per-buyer cap");
    Ok(gateway
        .update_max_tickets_per_buyer(organizer, event_id, max_tickets_per_buyer)
        .await?)
}

/// Invalidate a ticket of one of the organizer's events
///
/// # Errors
///
/// Returns the gateway error if the organizer may not invalidate it.
pub async fn invalidate_ticket(
    gateway: &dyn ContractGateway,
    organizer: Address,
    token_id: TokenId,
) -> Result<TxReceipt, ClientError> {
    tracing::info!(%token_id, "Invalidating ticket");
    Ok(gateway.invalidate_ticket(organizer, token_id).await?)
}
