//! Purchase eligibility: how many more tickets a wallet may buy for an event.
//!
//! The result is bounded by both the remaining supply and the wallet's
//! remaining per-buyer allowance. A disconnected wallet has no allowance.

use serde::{Deserialize, Serialize};

use crate::types::EventRecord;

/// Remaining per-buyer allowance of one wallet for one event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAllowance {
    /// Per-buyer cap of the event
    pub max_per_buyer: u32,
    /// Tickets the wallet already bought
    pub purchased: u32,
}

impl UserAllowance {
    /// Create an allowance from the event cap and the wallet's purchase count
    #[must_use]
    pub const fn new(max_per_buyer: u32, purchased: u32) -> Self {
        Self {
            max_per_buyer,
            purchased,
        }
    }

    /// Tickets the wallet may still buy, never negative
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.max_per_buyer.saturating_sub(self.purchased)
    }
}

/// Why nothing can be bought
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseBlock {
    /// No supply left
    SoldOut,
    /// Wallet exhausted its per-buyer allowance
    MaxTicketsReached,
    /// No wallet to buy with
    WalletNotConnected,
}

impl PurchaseBlock {
    /// Label shown on the disabled purchase button
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SoldOut => "Sold Out",
            Self::MaxTicketsReached => "Max Tickets Reached",
            Self::WalletNotConnected => "Connect Wallet",
        }
    }
}

/// Purchase decision for one wallet and one event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    /// Largest quantity that may be bought now
    pub max_purchasable: u32,
    /// `max_purchasable > 0`
    pub can_buy_more: bool,
    /// Reason when `max_purchasable` is zero
    pub block: Option<PurchaseBlock>,
}

/// Eligibility against an event's authoritative supply
///
/// `allowance_remaining` is `None` when no wallet is connected.
#[must_use]
pub fn compute_eligibility(event: &EventRecord, allowance_remaining: Option<u32>) -> Eligibility {
    compute_eligibility_for_supply(event.total_tickets, event.tickets_sold, allowance_remaining)
}

/// Eligibility against an explicit supply (used with optimistic counts)
#[must_use]
pub fn compute_eligibility_for_supply(
    total_tickets: u32,
    tickets_sold: u32,
    allowance_remaining: Option<u32>,
) -> Eligibility {
    let supply = total_tickets.saturating_sub(tickets_sold);
    let allowance = allowance_remaining.unwrap_or(0);
    let max_purchasable = allowance.min(supply);

    let block = if max_purchasable > 0 {
        None
    } else if supply == 0 {
        Some(PurchaseBlock::SoldOut)
    } else if allowance_remaining.is_some() {
        Some(PurchaseBlock::MaxTicketsReached)
    } else {
        Some(PurchaseBlock::WalletNotConnected)
    };

    Eligibility {
        max_purchasable,
        can_buy_more: max_purchasable > 0,
        block,
    }
}

/// Quantity stepper of the purchase box
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuantitySelector {
    quantity: u32,
}

impl Default for QuantitySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantitySelector {
    /// Starts at one ticket
    #[must_use]
    pub const fn new() -> Self {
        Self { quantity: 1 }
    }

    /// Selected quantity
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Step up, only while below `max_purchasable`
    pub fn increment(&mut self, max_purchasable: u32) -> bool {
        if self.quantity < max_purchasable {
            self.quantity += 1;
            true
        } else {
            false
        }
    }

    /// Step down, never below one
    pub fn decrement(&mut self) -> bool {
        if self.quantity > 1 {
            self.quantity -= 1;
            true
        } else {
            false
        }
    }

    /// Pull the selection back into `1..=max` after a refresh
    pub fn clamp_to(&mut self, max_purchasable: u32) {
        self.quantity = self.quantity.min(max_purchasable).max(1);
    }
}

/// Coarse availability shown on event cards
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityTier {
    /// More than 50 left
    Plenty,
    /// 11 to 50 left
    Limited,
    /// 10 or fewer left
    Scarce,
}

/// Availability tier for `remaining` tickets
#[must_use]
pub const fn availability_tier(remaining: u32) -> AvailabilityTier {
    if remaining > 50 {
        AvailabilityTier::Plenty
    } else if remaining > 10 {
        AvailabilityTier::Limited
    } else {
        AvailabilityTier::Scarce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sold_out_event_blocks_everyone() {
        let result = compute_eligibility_for_supply(2, 2, Some(5));
        assert_eq!(result.max_purchasable, 0);
        assert!(!result.can_buy_more);
        assert_eq!(result.block.map(PurchaseBlock::label), Some("Sold Out"));
    }

    #[test]
    fn exhausted_allowance_blocks_buyer() {
        let allowance = UserAllowance::new(3, 3);
        let result = compute_eligibility_for_supply(100, 10, Some(allowance.remaining()));
        assert_eq!(result.max_purchasable, 0);
        assert_eq!(result.block.map(PurchaseBlock::label), Some("Max Tickets Reached"));
    }

    #[test]
    fn bounded_by_supply_and_allowance() {
        assert_eq!(compute_eligibility_for_supply(100, 98, Some(5)).max_purchasable, 2);
        assert_eq!(compute_eligibility_for_supply(100, 10, Some(3)).max_purchasable, 3);
    }

    #[test]
    fn disconnected_wallet_has_no_allowance() {
        let result = compute_eligibility_for_supply(100, 0, None);
        assert_eq!(result.max_purchasable, 0);
        assert_eq!(result.block, Some(PurchaseBlock::WalletNotConnected));
    }

    #[test]
    fn allowance_saturates() {
        assert_eq!(UserAllowance::new(3, 7).remaining(), 0);
    }

    #[test]
    fn quantity_selector_respects_bounds() {
        let mut selector = QuantitySelector::new();
        assert!(!selector.decrement());
        assert!(selector.increment(2));
        assert!(!selector.increment(2));
        assert_eq!(selector.quantity(), 2);

        selector.clamp_to(1);
        assert_eq!(selector.quantity(), 1);
        selector.clamp_to(0);
        assert_eq!(selector.quantity(), 1);
    }

    #[test]
    fn availability_tiers() {
        assert_eq!(availability_tier(51), AvailabilityTier::Plenty);
        assert_eq!(availability_tier(50), AvailabilityTier::Limited);
        assert_eq!(availability_tier(10), AvailabilityTier::Scarce);
    }
}
