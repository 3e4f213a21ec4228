//! Error types for the ticket marketplace client.
//!
//! Contract failures are classified once, here, so every flow shows the same
//! message for the same revert.

use thiserror::Error;

/// Errors parsing value types from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not a 20-byte hex address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Not a decimal ether amount
    #[error("Invalid ether amount: {0}")]
    InvalidAmount(String),

    /// Not a base64 JSON data URI
    #[error("Invalid token URI: {0}")]
    InvalidTokenUri(String),
}

/// Why a contract call reverted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    /// `msg.value` below `price * quantity`
    #[error("insufficient payment")]
    InsufficientPayment,

    /// Not enough tickets left
    #[error("sold out")]
    SoldOut,

    /// Purchase would exceed the per-buyer cap
    #[error("exceeds per-buyer ticket limit")]
    ExceedsAllowance,

    /// Event date already passed
    #[error("event already occurred")]
    EventAlreadyOccurred,

    /// Caller does not own the token or event
    #[error("caller is not the owner")]
    NotOwner,

    /// Caller did not list the ticket
    #[error("caller is not the seller")]
    NotSeller,

    /// No active listing for the token
    #[error("ticket is not listed")]
    NotListed,

    /// Marketplace is not approved to transfer the token
    #[error("marketplace not approved")]
    NotApproved,

    /// Ticket was invalidated by the organizer
    #[error("ticket is invalid")]
    InvalidTicket,

    /// Argument rejected by the contract
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Any revert string not classified above
    #[error("{0}")]
    Other(String),
}

/// Errors from the contract gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No wallet provider to sign with
    #[error("Wallet provider unavailable")]
    WalletUnavailable,

    /// Node could not be reached
    #[error("Network unreachable: {0}")]
    Unreachable(String),

    /// Call did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Response could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transaction reverted
    #[error("Transaction reverted: {0}")]
    Reverted(RevertReason),
}

/// What the user was doing when a gateway call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Buying from the primary sale
    Purchase,
    /// Listing a ticket for resale
    Listing,
    /// Cancelling a listing
    CancelListing,
    /// Buying a resale listing
    ResaleBuy,
    /// Reading state for a view
    Load,
}

impl Operation {
    const fn fallback_message(self) -> &'static str {
        match self {
            Self::Purchase => "There was a problem with your purchase.",
            Self::Listing => "Listing failed.",
            Self::CancelListing => "Cancelling the listing failed.",
            Self::ResaleBuy => "Buying the ticket failed.",
            Self::Load => "Could not load data from the network.",
        }
    }
}

impl GatewayError {
    /// Returns `true` for failures that leave state unknown rather than rejected
    #[must_use]
    pub const fn is_read_failure(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_) | Self::Timeout | Self::Malformed(_) | Self::NotFound(_)
        )
    }

    /// Message shown to the user for this failure during `operation`
    #[must_use]
    pub fn user_message(&self, operation: Operation) -> String {
        let message = match self {
            Self::WalletUnavailable => "Please install a wallet to continue.",
            Self::Reverted(reason) => match reason {
                RevertReason::InsufficientPayment => "Insufficient payment for this purchase.",
                RevertReason::SoldOut => "Sold out",
                RevertReason::ExceedsAllowance => {
                    "You have reached the ticket limit for this event"
                },
                RevertReason::EventAlreadyOccurred => "This event has already taken place.",
                RevertReason::NotOwner => "You do not own this ticket.",
                RevertReason::NotSeller => "Only the seller can cancel this listing.",
                RevertReason::NotListed => "This ticket is no longer listed.",
                RevertReason::NotApproved => "The marketplace is not approved for this ticket.",
                RevertReason::InvalidTicket => "This ticket has been invalidated.",
                RevertReason::InvalidArgument(_) | RevertReason::Other(_) => {
                    operation.fallback_message()
                },
            },
            Self::Unreachable(_) | Self::Timeout | Self::Malformed(_) | Self::NotFound(_) => {
                operation.fallback_message()
            },
        };
        message.to_string()
    }
}

/// Errors from the persisted key-value store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// Backing file is not valid JSON
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Errors from the wallet session lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No wallet provider, or it refused the request
    #[error("Wallet provider unavailable")]
    WalletUnavailable,

    /// Recovered signer differs from the claimed address
    #[error("Signature verification failed: signer does not match")]
    SignatureMismatch,

    /// Signature bytes could not be decoded or recovered
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Operation needs a connected wallet
    #[error("Wallet not connected")]
    NotConnected,

    /// Persisting the session failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Rejected user input, checked before any contract call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field left empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Event date not in the future
    #[error("Event date must be in the future")]
    DateNotInFuture,

    /// Capacity of zero
    #[error("Event must have at least one ticket")]
    NoCapacity,

    /// Per-buyer cap outside `1..=ceiling`
    #[error("Max tickets per buyer must be between 1 and {ceiling}, got {value}")]
    MaxPerBuyerOutOfRange {
        /// Rejected value
        value: u32,
        /// Highest allowed value
        ceiling: u32,
    },

    /// Adding zero tickets
    #[error("Ticket count must be greater than zero")]
    ZeroTicketCount,

    /// Listing for nothing
    #[error("Listing price must be greater than zero")]
    ZeroPrice,

    /// Amount could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Umbrella error for operations that combine validation and contract calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Input rejected locally
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Contract call failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Session failure
    #[error(transparent)]
    Session(#[from] SessionError),
}
