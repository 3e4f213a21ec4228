//! # Tixchain Client
//!
//! Client core of the tixchain ticket marketplace. Events are sold as NFT
//! tickets by an event-ticket contract; holders resell them through a
//! marketplace contract. This crate is everything between those contracts
//! and a UI:
//!
//! - [`eligibility`]: how many tickets a wallet may still buy, and why not
//! - [`resale`]: listing state of a ticket and the control a viewer gets
//! - [`purchase`] and [`resale::flow`]: reducers for the buy and resale flows,
//!   run by a `tixchain_runtime::Store`
//! - [`views`]: dashboard, event browsing and marketplace view models
//! - [`session`]: wallet connect and signed-message login
//! - [`gateway`]: the contract boundary, implemented in memory by
//!   [`mocks::InMemoryChain`]
//!
//! ## Example
//!
//! ```ignore
//! use tixchain_client::{purchase::*, mocks::InMemoryChain};
//! use tixchain_runtime::Store;
//!
//! let chain = InMemoryChain::default();
//! let env = PurchaseEnvironment::new(chain.shared(), Arc::new(SystemClock));
//! let store = Store::new(PurchaseState::new(event_id), PurchaseReducer::new(), env);
//!
//! store.send(PurchaseAction::Load { event_id, wallet: Some(buyer) }).await?;
//! store.send(PurchaseAction::Purchase { buyer: Some(buyer) }).await?;
//! ```

pub mod config;
pub mod eligibility;
pub mod error;
pub mod gateway;
pub mod organizer;
pub mod purchase;
pub mod resale;
pub mod session;
pub mod signature;
pub mod status;
pub mod storage;
pub mod types;
pub mod views;

#[cfg(feature = "test-utils")]
pub mod mocks;

pub use config::Config;
pub use eligibility::{compute_eligibility, Eligibility, PurchaseBlock, QuantitySelector};
pub use error::{ClientError, GatewayError, RevertReason, SessionError, ValidationError};
pub use gateway::{ContractGateway, SharedGateway};
pub use resale::{reconcile_ticket_state, resolve_action, TicketAction, TicketState};
pub use session::{LocalWallet, WalletProvider, WalletSession};
pub use status::FlowStatus;
pub use types::{Address, EventId, EventRecord, ListingRecord, TicketRecord, TokenId, Wei};
