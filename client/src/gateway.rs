//! Contract gateway: the boundary to the ticket and marketplace contracts.
//!
//! Every chain interaction of the client goes through [`ContractGateway`].
//! Implementations own transport, ABI encoding, signing and confirmation;
//! the client only sees typed records and classified [`GatewayError`]s.
//! The in-memory implementation lives in [`crate::mocks`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::organizer::NewEvent;
use crate::types::{
    Address, EventId, EventRecord, ListingRecord, TicketRecord, TokenId, TxReceipt, Wei,
};

/// Gateway result
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Boxed future returned by gateway calls
pub type GatewayFuture<T> = Pin<Box<dyn Future<Output = GatewayResult<T>> + Send>>;

/// Shared handle to a gateway
pub type SharedGateway = Arc<dyn ContractGateway>;

/// Typed access to the ticket contract and the marketplace contract
///
/// Writes take `from`, the signing account, and resolve once the
/// transaction is confirmed. Reads have no ordering guarantee relative to
/// each other.
pub trait ContractGateway: Send + Sync {
    // ------------------------------------------------------------------
    // Ticket contract reads
    // ------------------------------------------------------------------

    /// Event struct by id
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown id, or a read failure.
    fn get_event(&self, event_id: EventId) -> GatewayFuture<EventRecord>;

    /// Number of events created so far (ids are `0..count`)
    ///
    /// # Errors
    ///
    /// Returns a read failure.
    fn event_count(&self) -> GatewayFuture<u64>;

    /// Tickets `user` has bought for `event_id` from the primary sale
    ///
    /// # Errors
    ///
    /// Returns a read failure.
    fn user_ticket_count(&self, event_id: EventId, user: Address) -> GatewayFuture<u32>;

    /// Tokens currently held by `owner`
    ///
    /// # Errors
    ///
    /// Returns a read failure.
    fn tickets_of_user(&self, owner: Address) -> GatewayFuture<Vec<TokenId>>;

    /// Ticket by token id
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unminted token, or a read failure.
    fn get_ticket(&self, token_id: TokenId) -> GatewayFuture<TicketRecord>;

    /// Account approved to transfer `token_id` ([`Address::ZERO`] if none)
    ///
    /// # Errors
    ///
    /// Returns a read failure.
    fn get_approved(&self, token_id: TokenId) -> GatewayFuture<Address>;

    /// Whether the organizer has not invalidated the ticket
    ///
    /// # Errors
    ///
    /// Returns a read failure.
    fn is_ticket_valid(&self, token_id: TokenId) -> GatewayFuture<bool>;

    // ------------------------------------------------------------------
    // Marketplace reads
    // ------------------------------------------------------------------

    /// Address of the marketplace contract (the account to approve)
    ///
    /// # Errors
    ///
    /// Returns a read failure.
    fn marketplace_address(&self) -> GatewayFuture<Address>;

    /// Active listing for `token_id`, if any
    ///
    /// # Errors
    ///
    /// Returns a read failure.
    fn get_listing(&self, token_id: TokenId) -> GatewayFuture<Option<ListingRecord>>;

    /// Every active listing
    ///
    /// # Errors
    ///
    /// Returns a read failure.
    fn get_all_listings(&self) -> GatewayFuture<Vec<ListingRecord>>;

    // ------------------------------------------------------------------
    // Ticket contract writes
    // ------------------------------------------------------------------

    /// Create an event organized by `from`
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] if the contract rejects the event.
    fn create_event(&self, from: Address, event: NewEvent) -> GatewayFuture<TxReceipt>;

    /// Mint one ticket, paying `value`
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] for payment, supply, cap or date violations.
    fn buy_ticket(
        &self,
        from: Address,
        event_id: EventId,
        token_uri: String,
        value: Wei,
    ) -> GatewayFuture<TxReceipt>;

    /// Mint `quantity` tickets in one transaction, paying `value`
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] for payment, supply, cap or date violations.
    fn buy_multiple_tickets(
        &self,
        from: Address,
        event_id: EventId,
        quantity: u32,
        token_uris: Vec<String>,
        value: Wei,
    ) -> GatewayFuture<TxReceipt>;

    /// Approve `to` to transfer `token_id`
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] if `from` does not own the token.
    fn approve(&self, from: Address, to: Address, token_id: TokenId) -> GatewayFuture<TxReceipt>;

    /// Invalidate a ticket (organizer only)
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] if `from` may not invalidate it.
    fn invalidate_ticket(&self, from: Address, token_id: TokenId) -> GatewayFuture<TxReceipt>;

    /// Add capacity to an event (organizer only)
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] if `from` is not the organizer.
    fn add_tickets(&self, from: Address, event_id: EventId, count: u32)
    -> GatewayFuture<TxReceipt>;

    /// Change the per-buyer cap (organizer only)
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] if `from` is not the organizer or
    /// the cap is out of range.
    fn update_max_tickets_per_buyer(
        &self,
        from: Address,
        event_id: EventId,
        max_tickets_per_buyer: u32,
    ) -> GatewayFuture<TxReceipt>;

    // ------------------------------------------------------------------
    // Marketplace writes
    // ------------------------------------------------------------------

    /// List `token_id` for resale at `price`
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] if not owned, not approved or already past.
    fn list_ticket(&self, from: Address, token_id: TokenId, price: Wei)
    -> GatewayFuture<TxReceipt>;

    /// Withdraw a listing
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] if `from` is not the seller.
    fn cancel_listing(&self, from: Address, token_id: TokenId) -> GatewayFuture<TxReceipt>;

    /// Buy a listed ticket, paying `value` to the seller
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Reverted`] if unlisted or underpaid.
    fn buy_listed_ticket(
        &self,
        from: Address,
        token_id: TokenId,
        value: Wei,
    ) -> GatewayFuture<TxReceipt>;
}
