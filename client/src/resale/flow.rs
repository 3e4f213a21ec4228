//! Resale flow for one ticket: list, cancel, and buy a listing.
//!
//! Listing is escrow-free: the seller keeps the token and approves the
//! marketplace to transfer it. The approval is only sent when the
//! marketplace is not already the approved account.

use std::sync::Arc;
use std::time::Duration;

use tixchain_core::{async_effect, delay, effect::Effect, reducer::Reducer, smallvec, SmallVec};

use crate::error::{GatewayError, Operation, RevertReason, ValidationError};
use crate::gateway::{ContractGateway, GatewayResult, SharedGateway};
use crate::status::{FlowStatus, StatusTracker};
use crate::types::{Address, ListingRecord, TokenId, TxReceipt, Wei, STATUS_COOLDOWN};

// ============================================================================
// State
// ============================================================================

/// Resale view state of one ticket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResaleState {
    /// Ticket this flow acts on
    pub token_id: TokenId,
    /// Last known active listing
    pub listing: Option<ListingRecord>,
    /// Flow status with cooldown epoch
    pub status: StatusTracker,
}

impl ResaleState {
    /// Fresh state for `token_id`
    #[must_use]
    pub fn new(token_id: TokenId) -> Self {
        Self {
            token_id,
            listing: None,
            status: StatusTracker::default(),
        }
    }

    /// Returns `true` if an active listing is known
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.listing.is_some_and(|l| l.is_active())
    }
}

// ============================================================================
// Actions
// ============================================================================

/// What finished successfully
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResaleOutcome {
    /// Ticket listed
    Listed,
    /// Listing withdrawn
    Cancelled,
    /// Listing bought
    Bought,
}

impl ResaleOutcome {
    const fn message(self) -> &'static str {
        match self {
            Self::Listed => "Ticket listed for resale",
            Self::Cancelled => "Listing cancelled",
            Self::Bought => "Ticket purchased",
        }
    }
}

/// Actions of the resale flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResaleAction {
    /// Read the current listing
    Load,
    /// List the ticket at `price`
    List {
        /// Token holder
        seller: Address,
        /// Asking price
        price: Wei,
    },
    /// Withdraw the listing
    Cancel {
        /// Account that listed
        seller: Address,
    },
    /// Buy the listing at its current price
    Buy {
        /// Paying account
        buyer: Address,
    },
    /// Listing read finished
    ListingLoaded {
        /// Active listing, if any
        listing: Option<ListingRecord>,
    },
    /// Listing read failed
    LoadFailed {
        /// Failure
        error: GatewayError,
    },
    /// A write was confirmed
    Completed {
        /// Which write
        outcome: ResaleOutcome,
        /// Listing after the write
        listing: Option<ListingRecord>,
        /// Confirmation
        receipt: TxReceipt,
    },
    /// A write failed
    Failed {
        /// Which write
        operation: Operation,
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

/// Dependencies of the resale flow
#[derive(Clone)]
pub struct ResaleEnvironment {
    /// Contract access
    pub gateway: SharedGateway,
    /// How long outcomes stay visible
    pub cooldown: Duration,
}

impl ResaleEnvironment {
    /// Environment with the default cooldown
    #[must_use]
    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            gateway,
            cooldown: STATUS_COOLDOWN,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the resale flow
#[derive(Clone, Debug, Default)]
pub struct ResaleReducer;

impl ResaleReducer {
    /// Creates a new `ResaleReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Set an outcome status and schedule its reset
    fn finish(
        state: &mut ResaleState,
        status: FlowStatus,
        env: &ResaleEnvironment,
    ) -> SmallVec<[Effect<ResaleAction>; 4]> {
        let epoch = state.status.set(status);
        smallvec![delay! {
            duration: env.cooldown,
            action: ResaleAction::ResetStatus { epoch }
        }]
    }

    async fn list(
        gateway: Arc<dyn ContractGateway>,
        seller: Address,
        token_id: TokenId,
        price: Wei,
    ) -> GatewayResult<TxReceipt> {
        let marketplace = gateway.marketplace_address().await?;
        let approved = gateway.get_approved(token_id).await?;

        if approved == marketplace {
            tracing::debug!(%token_id, "Marketplace already approved");
        } else {
            gateway.approve(seller, marketplace, token_id).await?;
        }

        gateway.list_ticket(seller, token_id, price).await
    }

    async fn buy(
        gateway: Arc<dyn ContractGateway>,
        buyer: Address,
        token_id: TokenId,
    ) -> GatewayResult<TxReceipt> {
        let listing = gateway
            .get_listing(token_id)
            .await?
            .filter(ListingRecord::is_active)
            .ok_or(GatewayError::Reverted(RevertReason::NotListed))?;

        gateway.buy_listed_ticket(buyer, token_id, listing.price).await
    }
}

impl Reducer for ResaleReducer {
    type State = ResaleState;
    type Action = ResaleAction;
    type Environment = ResaleEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ResaleAction::Load => {
                let gateway = Arc::clone(&env.gateway);
                let token_id = state.token_id;
                smallvec![async_effect! {
                    Some(match gateway.get_listing(token_id).await {
                        Ok(listing) => ResaleAction::ListingLoaded { listing },
                        Err(error) => ResaleAction::LoadFailed { error },
                    })
                }]
            },

            ResaleAction::ListingLoaded { listing } => {
                state.listing = listing.filter(ListingRecord::is_active);
                SmallVec::new()
            },

            ResaleAction::LoadFailed { error } => {
                tracing::warn!(token_id = %state.token_id, %error, "Listing read failed");
                Self::finish(state, FlowStatus::Error(error.user_message(Operation::Load)), env)
            },

            // ========== Writes ==========
            ResaleAction::List { .. } | ResaleAction::Cancel { .. } | ResaleAction::Buy { .. }
                if !state.status.status().is_idle() =>
            {
                tracing::debug!(token_id = %state.token_id, "Resale write while not idle");
                SmallVec::new()
            },

            ResaleAction::List { seller, price } => {
                if price.is_zero() {
                    return Self::finish(
                        state,
                        FlowStatus::Error(ValidationError::ZeroPrice.to_string()),
                        env,
                    );
                }

                state.status.set(FlowStatus::Processing);
                tracing::info!(token_id = %state.token_id, %price, "Listing ticket");

                let gateway = Arc::clone(&env.gateway);
                let token_id = state.token_id;
                smallvec![async_effect! {
                    Some(match Self::list(gateway, seller, token_id, price).await {
                        Ok(receipt) => ResaleAction::Completed {
                            outcome: ResaleOutcome::Listed,
                            listing: Some(ListingRecord { token_id, seller, price }),
                            receipt,
                        },
                        Err(error) => ResaleAction::Failed { operation: Operation::Listing, error },
                    })
                }]
            },

            ResaleAction::Cancel { seller } => {
                state.status.set(FlowStatus::Processing);
                tracing::info!(token_id = %state.token_id, "Cancelling listing");

                let gateway = Arc::clone(&env.gateway);
                let token_id = state.token_id;
                smallvec![async_effect! {
                    Some(match gateway.cancel_listing(seller, token_id).await {
                        Ok(receipt) => ResaleAction::Completed {
                            outcome: ResaleOutcome::Cancelled,
                            listing: None,
                            receipt,
                        },
                        Err(error) => ResaleAction::Failed {
                            operation: Operation::CancelListing,
                            error,
                        },
                    })
                }]
            },

            ResaleAction::Buy { buyer } => {
                state.status.set(FlowStatus::Processing);
                tracing::info!(token_id = %state.token_id, %buyer, "Buying listed ticket");

                let gateway = Arc::clone(&env.gateway);
                let token_id = state.token_id;
                smallvec![async_effect! {
                    Some(match Self::buy(gateway, buyer, token_id).await {
                        Ok(receipt) => ResaleAction::Completed {
                            outcome: ResaleOutcome::Bought,
                            listing: None,
                            receipt,
                        },
                        Err(error) => ResaleAction::Failed { operation: Operation::ResaleBuy, error },
                    })
                }]
            },

            // ========== Results ==========
            ResaleAction::Completed {
                outcome,
                listing,
                receipt,
            } => {
                tracing::info!(
                    token_id = %state.token_id,
                    ?outcome,
                    tx = %receipt.tx_hash,
                    "Resale write confirmed"
                );
                state.listing = listing;
                Self::finish(state, FlowStatus::Success(outcome.message().to_string()), env)
            },

            ResaleAction::Failed { operation, error } => {
                tracing::warn!(token_id = %state.token_id, ?operation, %error, "Resale write failed");
                Self::finish(state, FlowStatus::Error(error.user_message(operation)), env)
            },

            ResaleAction::ResetStatus { epoch } => {
                state.status.reset_if_current(epoch);
                SmallVec::new()
            },
        }
    }
}
