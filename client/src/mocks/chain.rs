//! In-memory ticket and marketplace contracts.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tixchain_core::environment::{Clock, SystemClock};

use crate::error::{GatewayError, RevertReason};
use crate::gateway::{ContractGateway, GatewayFuture, GatewayResult};
use crate::organizer::NewEvent;
use crate::signature::keccak256;
use crate::types::{
    Address, EventId, EventRecord, ListingRecord, TicketRecord, TokenId, TxHash, TxReceipt, Wei,
    MAX_TICKETS_PER_BUYER_CEILING,
};

/// Default marketplace contract address of the in-memory chain
pub const MARKETPLACE_ADDRESS: Address = Address::from_bytes([0xee; 20]);

/// Default deployer of the in-memory ticket contract
pub const DEPLOYER_ADDRESS: Address = Address::from_bytes([0xde; 20]);

#[derive(Default)]
struct ChainState {
    events: Vec<EventRecord>,
    tickets: BTreeMap<TokenId, TicketRecord>,
    approvals: HashMap<TokenId, Address>,
    purchases: HashMap<(EventId, Address), u32>,
    listings: BTreeMap<TokenId, ListingRecord>,
    proceeds: HashMap<Address, Wei>,
    next_token: u64,
    block: u64,
    offline: bool,
    unreadable_events: BTreeSet<EventId>,
    unreadable_tickets: BTreeSet<TokenId>,
    failing_writes: Vec<GatewayError>,
    calls: Vec<&'static str>,
}

impl ChainState {
    fn event_mut(&mut self, event_id: EventId) -> Result<&mut EventRecord, RevertReason> {
        usize::try_from(event_id.value())
            .ok()
            .and_then(|index| self.events.get_mut(index))
            .ok_or_else(|| RevertReason::InvalidArgument(format!("event {event_id} does not exist")))
    }

    fn ticket_mut(&mut self, token_id: TokenId) -> Result<&mut TicketRecord, RevertReason> {
        self.tickets
            .get_mut(&token_id)
            .ok_or_else(|| RevertReason::InvalidArgument(format!("token {token_id} does not exist")))
    }

    fn credit(&mut self, to: Address, value: Wei) {
        let balance = self.proceeds.entry(to).or_default();
        *balance = balance.checked_add(value).unwrap_or(Wei::new(u128::MAX));
    }

    fn mint(
        &mut self,
        buyer: Address,
        event_id: EventId,
        token_uris: Vec<String>,
        value: Wei,
        now: DateTime<Utc>,
    ) -> Result<(), RevertReason> {
        let quantity = u32::try_from(token_uris.len())
            .map_err(|_| RevertReason::InvalidArgument("too many tickets".into()))?;
        if quantity == 0 {
            return Err(RevertReason::InvalidArgument("quantity must be greater than zero".into()));
        }

        let already = self.purchases.get(&(event_id, buyer)).copied().unwrap_or(0);
        let event = self.event_mut(event_id)?;

        if event.has_occurred(now) {
            return Err(RevertReason::EventAlreadyOccurred);
        }
        if event.remaining_supply() < quantity {
            return Err(RevertReason::SoldOut);
        }
        if already.saturating_add(quantity) > event.max_tickets_per_buyer {
            return Err(RevertReason::ExceedsAllowance);
        }
        let cost = event.price.checked_mul(quantity).ok_or(RevertReason::InsufficientPayment)?;
        if value < cost {
            return Err(RevertReason::InsufficientPayment);
        }

        event.tickets_sold += quantity;
        let organizer = event.organizer;

        for token_uri in token_uris {
            let token_id = TokenId::new(self.next_token);
            self.next_token += 1;
            self.tickets.insert(
                token_id,
                TicketRecord {
                    token_id,
                    owner: buyer,
                    event_id,
                    valid: true,
                    token_uri,
                },
            );
        }
        self.purchases.insert((event_id, buyer), already.saturating_add(quantity));
        self.credit(organizer, value);
        Ok(())
    }
}

/// In-memory implementation of both contracts
///
/// Enforces the rules the client relies on: payment, supply, per-buyer cap,
/// event date, ownership, approval and seller checks. Block time comes from
/// the injected clock.
///
/// Fault injection:
/// - [`InMemoryChain::set_offline`] fails every call with
///   [`GatewayError::Unreachable`]
/// - [`InMemoryChain::fail_next_write`] fails the next write with a given error
/// - [`InMemoryChain::set_event_unreadable`] and
///   [`InMemoryChain::set_ticket_unreadable`] fail the reads of one record
/// - [`InMemoryChain::set_latency`] delays every call (deterministic under
///   paused tokio time)
///
/// **WARNING**: Do NOT use in production. This is for tests and the demo only!
#[derive(Clone)]
pub struct InMemoryChain {
    state: Arc<Mutex<ChainState>>,
    clock: Arc<dyn Clock>,
    latency: Arc<Mutex<Option<Duration>>>,
    marketplace: Address,
    deployer: Address,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemoryChain {
    /// Empty chain using `clock` as block time
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState::default())),
            clock,
            latency: Arc::new(Mutex::new(None)),
            marketplace: MARKETPLACE_ADDRESS,
            deployer: DEPLOYER_ADDRESS,
        }
    }

    /// Shared handle for environments
    #[must_use]
    pub fn shared(&self) -> Arc<dyn ContractGateway> {
        Arc::new(self.clone())
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap()
    }

    /// Fail (or stop failing) every call as unreachable
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Fail (or stop failing) every `get_event` of `event_id` as unreachable
    pub fn set_event_unreadable(&self, event_id: EventId, unreadable: bool) {
        let mut state = self.lock();
        if unreadable {
            state.unreadable_events.insert(event_id);
        } else {
            state.unreadable_events.remove(&event_id);
        }
    }

    /// Fail (or stop failing) every `get_ticket` of `token_id` as unreachable
    pub fn set_ticket_unreadable(&self, token_id: TokenId, unreadable: bool) {
        let mut state = self.lock();
        if unreadable {
            state.unreadable_tickets.insert(token_id);
        } else {
            state.unreadable_tickets.remove(&token_id);
        }
    }

    /// Fail the next write with `error` (queued, first in first out)
    pub fn fail_next_write(&self, error: GatewayError) {
        self.lock().failing_writes.push(error);
    }

    /// Delay every call by `latency`
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Proceeds received by `account` from sales and resales
    #[must_use]
    pub fn proceeds_of(&self, account: Address) -> Wei {
        self.lock().proceeds.get(&account).copied().unwrap_or_default()
    }

    /// Names of the write calls made so far, in order
    #[must_use]
    pub fn write_log(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn read<T, F>(&self, f: F) -> GatewayFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&ChainState, Address) -> GatewayResult<T> + Send + 'static,
    {
        let chain = self.clone();
        Box::pin(async move {
            chain.simulate_latency().await;
            let state = chain.lock();
            if state.offline {
                return Err(GatewayError::Unreachable("in-memory chain is offline".into()));
            }
            f(&*state, chain.marketplace)
        })
    }

    fn write<F>(&self, name: &'static str, from: Address, f: F) -> GatewayFuture<TxReceipt>
    where
        F: FnOnce(&mut ChainState, &Context) -> Result<(), RevertReason> + Send + 'static,
    {
        let chain = self.clone();
        Box::pin(async move {
            chain.simulate_latency().await;
            let context = Context {
                now: chain.clock.now(),
                marketplace: chain.marketplace,
                deployer: chain.deployer,
            };

            let mut state = chain.lock();
            if state.offline {
                return Err(GatewayError::Unreachable("in-memory chain is offline".into()));
            }
            state.calls.push(name);
            if !state.failing_writes.is_empty() {
                let error = state.failing_writes.remove(0);
                tracing::debug!(call = name, %error, "Injected write failure");
                return Err(error);
            }

            f(&mut *state, &context).map_err(|reason| {
                tracing::debug!(call = name, %from, %reason, "Transaction reverted");
                GatewayError::Reverted(reason)
            })?;

            state.block += 1;
            let mut preimage = state.block.to_be_bytes().to_vec();
            preimage.extend_from_slice(from.as_bytes());
            preimage.extend_from_slice(name.as_bytes());
            Ok(TxReceipt {
                tx_hash: TxHash::from_bytes(keccak256(&preimage)),
                block_number: state.block,
            })
        })
    }
}

/// Block context of a write
struct Context {
    now: DateTime<Utc>,
    marketplace: Address,
    deployer: Address,
}

fn require_organizer(event: &EventRecord, from: Address) -> Result<(), RevertReason> {
    if event.organizer == from {
        Ok(())
    } else {
        Err(RevertReason::NotOwner)
    }
}

impl ContractGateway for InMemoryChain {
    fn get_event(&self, event_id: EventId) -> GatewayFuture<EventRecord> {
        self.read(move |state, _| {
            if state.unreadable_events.contains(&event_id) {
                return Err(GatewayError::Unreachable(format!("event {event_id} is unreadable")));
            }
            usize::try_from(event_id.value())
                .ok()
                .and_then(|index| state.events.get(index))
                .cloned()
                .ok_or_else(|| GatewayError::NotFound(format!("event {event_id}")))
        })
    }

    fn event_count(&self) -> GatewayFuture<u64> {
        self.read(|state, _| Ok(state.events.len() as u64))
    }

    fn user_ticket_count(&self, event_id: EventId, user: Address) -> GatewayFuture<u32> {
        self.read(move |state, _| Ok(state.purchases.get(&(event_id, user)).copied().unwrap_or(0)))
    }

    fn tickets_of_user(&self, owner: Address) -> GatewayFuture<Vec<TokenId>> {
        self.read(move |state, _| {
            Ok(state
                .tickets
                .values()
                .filter(|t| t.owner == owner)
                .map(|t| t.token_id)
                .collect())
        })
    }

    fn get_ticket(&self, token_id: TokenId) -> GatewayFuture<TicketRecord> {
        self.read(move |state, _| {
            if state.unreadable_tickets.contains(&token_id) {
                return Err(GatewayError::Unreachable(format!("token {token_id} is unreadable")));
            }
            state
                .tickets
                .get(&token_id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound(format!("token {token_id}")))
        })
    }

    fn get_approved(&self, token_id: TokenId) -> GatewayFuture<Address> {
        self.read(move |state, _| Ok(state.approvals.get(&token_id).copied().unwrap_or(Address::ZERO)))
    }

    fn is_ticket_valid(&self, token_id: TokenId) -> GatewayFuture<bool> {
        self.read(move |state, _| {
            if state.unreadable_tickets.contains(&token_id) {
                return Err(GatewayError::Unreachable(format!("token {token_id} is unreadable")));
            }
            state
                .tickets
                .get(&token_id)
                .map(|t| t.valid)
                .ok_or_else(|| GatewayError::NotFound(format!("token {token_id}")))
        })
    }

    fn marketplace_address(&self) -> GatewayFuture<Address> {
        self.read(|_, marketplace| Ok(marketplace))
    }

    fn get_listing(&self, token_id: TokenId) -> GatewayFuture<Option<ListingRecord>> {
        self.read(move |state, _| Ok(state.listings.get(&token_id).copied()))
    }

    fn get_all_listings(&self) -> GatewayFuture<Vec<ListingRecord>> {
        self.read(|state, _| Ok(state.listings.values().copied().collect()))
    }

    fn create_event(&self, from: Address, event: NewEvent) -> GatewayFuture<TxReceipt> {
        self.write("createEvent", from, move |state, ctx| {
            if event.date <= ctx.now {
                return Err(RevertReason::InvalidArgument("event date must be in the future".into()));
            }
            if event.total_tickets == 0 {
                return Err(RevertReason::InvalidArgument("total tickets must be positive".into()));
            }
            if !(1..=MAX_TICKETS_PER_BUYER_CEILING).contains(&event.max_tickets_per_buyer) {
                return Err(RevertReason::InvalidArgument("invalid max tickets per buyer".into()));
            }

            let id = EventId::new(state.events.len() as u64);
            state.events.push(EventRecord {
                id,
                name: event.name,
                date: event.date,
                location: event.location,
                description: event.description,
                image_url: event.image_url,
                price: event.price,
                total_tickets: event.total_tickets,
                tickets_sold: 0,
                organizer: from,
                category: event.category,
                max_tickets_per_buyer: event.max_tickets_per_buyer,
            });
            Ok(())
        })
    }

    fn buy_ticket(
        &self,
        from: Address,
        event_id: EventId,
        token_uri: String,
        value: Wei,
    ) -> GatewayFuture<TxReceipt> {
        self.write("buyTicket", from, move |state, ctx| {
            state.mint(from, event_id, vec![token_uri], value, ctx.now)
        })
    }

    fn buy_multiple_tickets(
        &self,
        from: Address,
        event_id: EventId,
        quantity: u32,
        token_uris: Vec<String>,
        value: Wei,
    ) -> GatewayFuture<TxReceipt> {
        self.write("buyMultipleTickets", from, move |state, ctx| {
            if token_uris.len() != quantity as usize {
                return Err(RevertReason::InvalidArgument("token URI count mismatch".into()));
            }
            state.mint(from, event_id, token_uris, value, ctx.now)
        })
    }

    fn approve(&self, from: Address, to: Address, token_id: TokenId) -> GatewayFuture<TxReceipt> {
        self.write("approve", from, move |state, _| {
            if state.ticket_mut(token_id)?.owner != from {
                return Err(RevertReason::NotOwner);
            }
            state.approvals.insert(token_id, to);
            Ok(())
        })
    }

    fn invalidate_ticket(&self, from: Address, token_id: TokenId) -> GatewayFuture<TxReceipt> {
        self.write("invalidateTicket", from, move |state, ctx| {
            let event_id = state.ticket_mut(token_id)?.event_id;
            let organizer = state.event_mut(event_id)?.organizer;
            if from != organizer && from != ctx.deployer {
                return Err(RevertReason::NotOwner);
            }
            state.ticket_mut(token_id)?.valid = false;
            state.listings.remove(&token_id);
            Ok(())
        })
    }

    fn add_tickets(&self, from: Address, event_id: EventId, count: u32) -> GatewayFuture<TxReceipt> {
        self.write("addTickets", from, move |state, _| {
            if count == 0 {
                return Err(RevertReason::InvalidArgument("count must be positive".into()));
            }
            let event = state.event_mut(event_id)?;
            require_organizer(event, from)?;
            event.total_tickets = event
                .total_tickets
                .checked_add(count)
                .ok_or_else(|| RevertReason::InvalidArgument("capacity overflow".into()))?;
            Ok(())
        })
    }

    fn update_max_tickets_per_buyer(
        &self,
        from: Address,
        event_id: EventId,
        max_tickets_per_buyer: u32,
    ) -> GatewayFuture<TxReceipt> {
        self.write("updateMaxTicketsPerBuyer", from, move |state, _| {
            if !(1..=MAX_TICKETS_PER_BUYER_CEILING).contains(&max_tickets_per_buyer) {
                return Err(RevertReason::InvalidArgument("invalid max tickets per buyer".into()));
            }
            let event = state.event_mut(event_id)?;
            require_organizer(event, from)?;
            event.max_tickets_per_buyer = max_tickets_per_buyer;
            Ok(())
        })
    }

    fn list_ticket(&self, from: Address, token_id: TokenId, price: Wei) -> GatewayFuture<TxReceipt> {
        self.write("listTicket", from, move |state, ctx| {
            if price.is_zero() {
                return Err(RevertReason::InvalidArgument("price must be positive".into()));
            }
            let ticket = state.ticket_mut(token_id)?;
            if ticket.owner != from {
                return Err(RevertReason::NotOwner);
            }
            if !ticket.valid {
                return Err(RevertReason::InvalidTicket);
            }
            let event_id = ticket.event_id;
            if state.event_mut(event_id)?.has_occurred(ctx.now) {
                return Err(RevertReason::EventAlreadyOccurred);
            }
            if state.approvals.get(&token_id) != Some(&ctx.marketplace) {
                return Err(RevertReason::NotApproved);
            }
            state.listings.insert(
                token_id,
                ListingRecord {
                    token_id,
                    seller: from,
                    price,
                },
            );
            Ok(())
        })
    }

    fn cancel_listing(&self, from: Address, token_id: TokenId) -> GatewayFuture<TxReceipt> {
        self.write("cancelListing", from, move |state, _| {
            let listing = state.listings.get(&token_id).ok_or(RevertReason::NotListed)?;
            if listing.seller != from {
                return Err(RevertReason::NotSeller);
            }
            state.listings.remove(&token_id);
            Ok(())
        })
    }

    fn buy_listed_ticket(
        &self,
        from: Address,
        token_id: TokenId,
        value: Wei,
    ) -> GatewayFuture<TxReceipt> {
        self.write("buyResaleTicket", from, move |state, ctx| {
            let listing = *state.listings.get(&token_id).ok_or(RevertReason::NotListed)?;
            if listing.seller == from {
                return Err(RevertReason::InvalidArgument("seller cannot buy own listing".into()));
            }
            if value < listing.price {
                return Err(RevertReason::InsufficientPayment);
            }
            if state.approvals.get(&token_id) != Some(&ctx.marketplace) {
                return Err(RevertReason::NotApproved);
            }

            let ticket = state.ticket_mut(token_id)?;
            if ticket.owner != listing.seller {
                return Err(RevertReason::NotOwner);
            }
            if !ticket.valid {
                return Err(RevertReason::InvalidTicket);
            }
            ticket.owner = from;

            state.approvals.remove(&token_id);
            state.listings.remove(&token_id);
            state.credit(listing.seller, value);
            Ok(())
        })
    }
}
