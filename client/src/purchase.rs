//! Purchase flow of the event details page.
//!
//! Loads the event and the wallet's purchase count, lets the user pick a
//! quantity within eligibility, and buys from the primary sale.
//!
//! **Optimistic updates**: while a purchase is in flight its quantity is held
//! as a delta keyed by [`PendingPurchaseId`]. The displayed supply and the
//! wallet's allowance include every outstanding delta. A confirmed purchase
//! folds its delta into the last known counts before the refresh reads land;
//! a failed one just drops it, so the view is exactly what it was before.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tixchain_core::{
    async_effect, delay, effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec,
};

use crate::eligibility::{compute_eligibility_for_supply, Eligibility, QuantitySelector, UserAllowance};
use crate::error::{GatewayError, Operation};
use crate::gateway::SharedGateway;
use crate::status::{FlowStatus, StatusTracker};
use crate::types::{
    Address, EventId, EventRecord, TicketMetadata, TxReceipt, DEFAULT_MAX_TICKETS_PER_BUYER,
    STATUS_COOLDOWN,
};

// ============================================================================
// State
// ============================================================================

/// Key of one in-flight purchase
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingPurchaseId(u64);

impl PendingPurchaseId {
    /// Create from a raw value; ids are handed out from 0 upward per state
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// State of the purchase box for one event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseState {
    /// Event shown
    pub event_id: EventId,
    /// Last authoritative event read
    pub event: Option<EventRecord>,
    /// Wallet buying, if connected
    pub wallet: Option<Address>,
    /// Tickets the wallet bought, last authoritative read
    pub purchased: Option<u32>,
    /// Quantity stepper
    pub selector: QuantitySelector,
    /// In-flight purchase quantities
    pub pending: BTreeMap<PendingPurchaseId, u32>,
    /// Flow status with cooldown epoch
    pub status: StatusTracker,
    /// Message of the last failed read
    pub load_error: Option<String>,
    next_pending: u64,
}

impl PurchaseState {
    /// Empty state for `event_id`
    #[must_use]
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            event: None,
            wallet: None,
            purchased: None,
            selector: QuantitySelector::new(),
            pending: BTreeMap::new(),
            status: StatusTracker::default(),
            load_error: None,
            next_pending: 0,
        }
    }

    /// Tickets held by in-flight purchases
    #[must_use]
    pub fn pending_quantity(&self) -> u32 {
        self.pending.values().fold(0, |acc, q| acc.saturating_add(*q))
    }

    /// Sold count shown to the user: authoritative plus in-flight, capped at capacity
    #[must_use]
    pub fn displayed_sold(&self) -> Option<u32> {
        self.event.as_ref().map(|event| {
            event
                .tickets_sold
                .saturating_add(self.pending_quantity())
                .min(event.total_tickets)
        })
    }

    /// Remaining supply shown to the user
    #[must_use]
    pub fn displayed_remaining(&self) -> Option<u32> {
        let event = self.event.as_ref()?;
        Some(event.total_tickets.saturating_sub(self.displayed_sold()?))
    }

    /// Allowance of the connected wallet, net of in-flight purchases
    #[must_use]
    pub fn allowance(&self, default_max: u32) -> Option<UserAllowance> {
        let event = self.event.as_ref()?;
        self.wallet?;
        let max = if event.max_tickets_per_buyer == 0 {
            default_max
        } else {
            event.max_tickets_per_buyer
        };
        // Until the count is read the wallet is assumed to hold none
        let purchased = self
            .purchased
            .unwrap_or(0)
            .saturating_add(self.pending_quantity());
        Some(UserAllowance::new(max, purchased))
    }

    /// Eligibility against the displayed (optimistic) counts
    #[must_use]
    pub fn eligibility(&self) -> Eligibility {
        self.eligibility_with_default(DEFAULT_MAX_TICKETS_PER_BUYER)
    }

    fn eligibility_with_default(&self, default_max: u32) -> Eligibility {
        let (total, sold) = match (&self.event, self.displayed_sold()) {
            (Some(event), Some(sold)) => (event.total_tickets, sold),
            _ => (0, 0),
        };
        let allowance = self.allowance(default_max).map(|a| a.remaining());
        compute_eligibility_for_supply(total, sold, allowance)
    }

    fn next_pending_id(&mut self) -> PendingPurchaseId {
        let id = PendingPurchaseId(self.next_pending);
        self.next_pending += 1;
        id
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions of the purchase flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PurchaseAction {
    /// Read the event and, with a wallet, its purchase count
    Load {
        /// Event to show
        event_id: EventId,
        /// Connected wallet
        wallet: Option<Address>,
    },
    /// Event read finished
    EventLoaded {
        /// Authoritative event
        event: EventRecord,
    },
    /// Purchase count read finished
    AllowanceLoaded {
        /// Wallet the count belongs to
        wallet: Address,
        /// Tickets bought so far
        purchased: u32,
    },
    /// A read failed
    LoadFailed {
        /// Failure
        error: GatewayError,
    },
    /// Quantity stepper up
    IncrementQuantity,
    /// Quantity stepper down
    DecrementQuantity,
    /// Buy the selected quantity
    Purchase {
        /// Paying wallet, `None` if not connected
        buyer: Option<Address>,
    },
    /// Purchase transaction confirmed
    PurchaseConfirmed {
        /// Purchase the confirmation belongs to
        pending: PendingPurchaseId,
        /// Confirmation
        receipt: TxReceipt,
    },
    /// Purchase transaction failed
    PurchaseFailed {
        /// Purchase the failure belongs to
        pending: PendingPurchaseId,
        /// Failure
        error: GatewayError,
    },
    /// Cooldown elapsed
    ResetStatus {
        /// Epoch the cooldown was scheduled for
        epoch: u64,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the purchase flow
#[derive(Clone)]
pub struct PurchaseEnvironment {
    /// Contract access
    pub gateway: SharedGateway,
    /// Current time, for the event-date check
    pub clock: Arc<dyn Clock>,
    /// How long outcomes stay visible
    pub cooldown: Duration,
    /// Per-buyer cap assumed when the event reports none
    pub default_max_per_buyer: u32,
}

impl PurchaseEnvironment {
    /// Environment with default cooldown and per-buyer cap
    #[must_use]
    pub fn new(gateway: SharedGateway, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            clock,
            cooldown: STATUS_COOLDOWN,
            default_max_per_buyer: DEFAULT_MAX_TICKETS_PER_BUYER,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the purchase flow
#[derive(Clone, Debug, Default)]
pub struct PurchaseReducer;

impl PurchaseReducer {
    /// Creates a new `PurchaseReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Concurrent event and purchase-count reads
    fn load_effects(
        event_id: EventId,
        wallet: Option<Address>,
        env: &PurchaseEnvironment,
    ) -> SmallVec<[Effect<PurchaseAction>; 4]> {
        let gateway = Arc::clone(&env.gateway);
        let event_read = async_effect! {
            Some(match gateway.get_event(event_id).await {
                Ok(event) => PurchaseAction::EventLoaded { event },
                Err(error) => PurchaseAction::LoadFailed { error },
            })
        };

        let Some(wallet) = wallet else {
            return smallvec![event_read];
        };

        let gateway = Arc::clone(&env.gateway);
        let count_read = async_effect! {
            Some(match gateway.user_ticket_count(event_id, wallet).await {
                Ok(purchased) => PurchaseAction::AllowanceLoaded { wallet, purchased },
                Err(error) => PurchaseAction::LoadFailed { error },
            })
        };

        smallvec![Effect::merge(vec![event_read, count_read])]
    }

    /// Set an outcome status and schedule its reset
    fn finish(
        state: &mut PurchaseState,
        status: FlowStatus,
        env: &PurchaseEnvironment,
    ) -> Effect<PurchaseAction> {
        let epoch = state.status.set(status);
        delay! {
            duration: env.cooldown,
            action: PurchaseAction::ResetStatus { epoch }
        }
    }

    /// Reject a purchase before any transaction
    fn reject(
        state: &mut PurchaseState,
        message: impl Into<String>,
        env: &PurchaseEnvironment,
    ) -> SmallVec<[Effect<PurchaseAction>; 4]> {
        let message = message.into();
        tracing::info!(event_id = %state.event_id, %message, "Purchase rejected");
        smallvec![Self::finish(state, FlowStatus::Error(message), env)]
    }

    fn purchase(
        state: &mut PurchaseState,
        buyer: Option<Address>,
        env: &PurchaseEnvironment,
    ) -> SmallVec<[Effect<PurchaseAction>; 4]> {
        // Blocked while a purchase is in flight and during the outcome cooldown
        if !state.status.status().is_idle() {
            tracing::debug!(event_id = %state.event_id, "Purchase while not idle");
            return SmallVec::new();
        }

        let Some(buyer) = buyer else {
            return Self::reject(state, "Please connect your wallet first", env);
        };
        if state.wallet != Some(buyer) {
            return Self::reject(state, "Connected wallet changed, please reload the event", env);
        }
        let Some(event) = state.event.clone() else {
            return Self::reject(state, "Event details are still loading", env);
        };
        if event.has_occurred(env.clock.now()) {
            return Self::reject(state, "This event has already taken place.", env);
        }

        let eligibility = state.eligibility_with_default(env.default_max_per_buyer);
        if let Some(block) = eligibility.block {
            return Self::reject(state, block.label(), env);
        }

        state.selector.clamp_to(eligibility.max_purchasable);
        let quantity = state.selector.quantity();
        let Some(value) = event.price.checked_mul(quantity) else {
            return Self::reject(state, "Total price is too large", env);
        };

        let pending = state.next_pending_id();
        state.pending.insert(pending, quantity);
        state.status.set(FlowStatus::Processing);

        tracing::info!(
            event_id = %event.id,
            %buyer,
            quantity,
            total = %value,
            "Purchasing tickets"
        );

        let gateway = Arc::clone(&env.gateway);
        smallvec![async_effect! {
            let mut token_uris = TicketMetadata::token_uris(&event, quantity);
            let result = if quantity == 1 {
                let token_uri = token_uris.pop().unwrap_or_default();
                gateway.buy_ticket(buyer, event.id, token_uri, value).await
            } else {
                gateway
                    .buy_multiple_tickets(buyer, event.id, quantity, token_uris, value)
                    .await
            };

            Some(match result {
                Ok(receipt) => PurchaseAction::PurchaseConfirmed { pending, receipt },
                Err(error) => PurchaseAction::PurchaseFailed { pending, error },
            })
        }]
    }
}

impl Reducer for PurchaseReducer {
    type State = PurchaseState;
    type Action = PurchaseAction;
    type Environment = PurchaseEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Loading ==========
            PurchaseAction::Load { event_id, wallet } => {
                if event_id != state.event_id {
                    *state = PurchaseState::new(event_id);
                }
                if wallet != state.wallet {
                    state.purchased = None;
                }
                state.wallet = wallet;
                state.load_error = None;
                Self::load_effects(event_id, wallet, env)
            },

            PurchaseAction::EventLoaded { event } => {
                if event.id == state.event_id {
                    state.event = Some(event);
                    let max = state.eligibility_with_default(env.default_max_per_buyer).max_purchasable;
                    state.selector.clamp_to(max);
                }
                SmallVec::new()
            },

            PurchaseAction::AllowanceLoaded { wallet, purchased } => {
                // A count for a wallet that is no longer connected is stale
                if state.wallet == Some(wallet) {
                    state.purchased = Some(purchased);
                    let max = state.eligibility_with_default(env.default_max_per_buyer).max_purchasable;
                    state.selector.clamp_to(max);
                }
                SmallVec::new()
            },

            PurchaseAction::LoadFailed { error } => {
                tracing::warn!(event_id = %state.event_id, %error, "Event read failed");
                state.load_error = Some(error.user_message(Operation::Load));
                SmallVec::new()
            },

            // ========== Quantity ==========
            PurchaseAction::IncrementQuantity => {
                let max = state.eligibility_with_default(env.default_max_per_buyer).max_purchasable;
                state.selector.increment(max);
                SmallVec::new()
            },

            PurchaseAction::DecrementQuantity => {
                state.selector.decrement();
                SmallVec::new()
            },

            // ========== Purchase ==========
            PurchaseAction::Purchase { buyer } => Self::purchase(state, buyer, env),

            PurchaseAction::PurchaseConfirmed { pending, receipt } => {
                let quantity = state.pending.remove(&pending).unwrap_or(0);
                if let Some(event) = state.event.as_mut() {
                    event.tickets_sold = event
                        .tickets_sold
                        .saturating_add(quantity)
                        .min(event.total_tickets);
                }
                let purchased = state.purchased.get_or_insert(0);
                *purchased = purchased.saturating_add(quantity);
                state.selector = QuantitySelector::new();

                tracing::info!(
                    event_id = %state.event_id,
                    quantity,
                    tx = %receipt.tx_hash,
                    block = receipt.block_number,
                    "Purchase confirmed"
                );

                let message = if quantity == 1 {
                    "Ticket purchased successfully!".to_string()
                } else {
                    format!("{quantity} tickets purchased successfully!")
                };
                let reset = Self::finish(state, FlowStatus::Success(message), env);

                let mut effects = Self::load_effects(state.event_id, state.wallet, env);
                effects.push(reset);
                effects
            },

            PurchaseAction::PurchaseFailed { pending, error } => {
                let quantity = state.pending.remove(&pending).unwrap_or(0);
                tracing::warn!(event_id = %state.event_id, quantity, %error, "Purchase failed");
                smallvec![Self::finish(
                    state,
                    FlowStatus::Error(error.user_message(Operation::Purchase)),
                    env
                )]
            },

            PurchaseAction::ResetStatus { epoch } => {
                state.status.reset_if_current(epoch);
                SmallVec::new()
            },
        }
    }
}
