//! Domain types for the ticket marketplace client.
//!
//! Records mirror what the ticket contract and the marketplace contract
//! return; value types (`Address`, `Wei`, `TxHash`) carry the on-chain
//! encodings with checked arithmetic.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ParseError;
use crate::signature::keccak256;

// ============================================================================
// Constants
// ============================================================================

/// Per-buyer cap assumed when the contract reports none
pub const DEFAULT_MAX_TICKETS_PER_BUYER: u32 = 5;

/// Highest per-buyer cap an organizer may configure
pub const MAX_TICKETS_PER_BUYER_CEILING: u32 = 10;

/// How long a success or error status stays visible before returning to idle
pub const STATUS_COOLDOWN: Duration = Duration::from_millis(3000);

// ============================================================================
// Identifiers
// ============================================================================

/// Sequential event identifier assigned by the ticket contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Create an `EventId` from its on-chain value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the on-chain value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ERC-721 token identifier of a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u64);

impl TokenId {
    /// Create a `TokenId` from its on-chain value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the on-chain value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// 20-byte account address
///
/// Parsing accepts any letter case, and equality is byte-wise, so two
/// spellings of the same account always compare equal. Displays lowercase;
/// use [`Address::to_checksum`] for EIP-55 mixed case.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address (no approval, no owner)
    pub const ZERO: Self = Self([0; 20]);

    /// Create an address from raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns `true` for the zero address
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// EIP-55 checksummed rendering
    #[must_use]
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != 40 {
            return Err(ParseError::InvalidAddress(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| ParseError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Amount in wei (1 ether = 10^18 wei)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wei(u128);

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

impl Wei {
    /// Zero wei
    pub const ZERO: Self = Self(0);

    /// Create an amount from wei
    #[must_use]
    pub const fn new(wei: u128) -> Self {
        Self(wei)
    }

    /// Get the amount in wei
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Returns `true` if the amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Total for `quantity` units, `None` on overflow
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(u128::from(quantity)).map(Self)
    }

    /// Sum of two amounts, `None` on overflow
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Parse a decimal ether amount such as `"0.05"` or `"12"`
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidAmount`] for non-decimal input, more than
    /// 18 fractional digits, or a value that does not fit in `u128` wei.
    pub fn from_ether_str(input: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidAmount(input.to_string());
        let trimmed = input.trim();

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };

        if (whole.is_empty() && fraction.is_empty())
            || fraction.len() > 18
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        let fraction: u128 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{fraction:0<18}");
            padded.parse().map_err(|_| invalid())?
        };

        whole
            .checked_mul(WEI_PER_ETHER)
            .and_then(|w| w.checked_add(fraction))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Render as decimal ether without trailing zeros (`"0.05"`, `"2"`)
    #[must_use]
    pub fn format_ether(self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let fraction = self.0 % WEI_PER_ETHER;
        if fraction == 0 {
            return whole.to_string();
        }
        let fraction = format!("{fraction:018}");
        format!("{whole}.{}", fraction.trim_end_matches('0'))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.format_ether())
    }
}

/// 32-byte transaction hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Create a hash from raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let digits = raw.strip_prefix("0x").unwrap_or(&raw);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

/// Confirmation of a mined transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Hash of the confirmed transaction
    pub tx_hash: TxHash,
    /// Block the transaction was included in
    pub block_number: u64,
}

// ============================================================================
// Records
// ============================================================================

/// An event as stored by the ticket contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier
    pub id: EventId,
    /// Display name
    pub name: String,
    /// Start time, seconds since epoch on the wire
    #[serde(with = "chrono::serde::ts_seconds")]
    pub date: DateTime<Utc>,
    /// Venue
    pub location: String,
    /// Free-form description
    pub description: String,
    /// Image shown on cards and in ticket metadata
    pub image_url: String,
    /// Price of one ticket
    pub price: Wei,
    /// Capacity
    pub total_tickets: u32,
    /// Tickets minted so far
    pub tickets_sold: u32,
    /// Account that created the event and receives proceeds
    pub organizer: Address,
    /// Category used by the browse filters
    pub category: String,
    /// Per-buyer cap
    pub max_tickets_per_buyer: u32,
}

impl EventRecord {
    /// Tickets still available
    #[must_use]
    pub const fn remaining_supply(&self) -> u32 {
        self.total_tickets.saturating_sub(self.tickets_sold)
    }

    /// Returns `true` if no ticket is left
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.remaining_supply() == 0
    }

    /// Returns `true` if the event date is not in the future
    #[must_use]
    pub fn has_occurred(&self, now: DateTime<Utc>) -> bool {
        self.date <= now
    }
}

/// A minted ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Token identifier
    pub token_id: TokenId,
    /// Current holder
    pub owner: Address,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// `false` once the organizer invalidated the ticket
    pub valid: bool,
    /// ERC-721 metadata URI
    pub token_uri: String,
}

/// A resale listing held by the marketplace contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Listed token
    pub token_id: TokenId,
    /// Account that listed the ticket
    pub seller: Address,
    /// Asking price
    pub price: Wei,
}

impl ListingRecord {
    /// A listing is active only with a non-zero price
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.price.is_zero()
    }
}

// ============================================================================
// Ticket Metadata
// ============================================================================

/// One `{trait_type, value}` metadata attribute
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    /// Attribute name
    pub trait_type: String,
    /// Attribute value
    pub value: String,
}

/// ERC-721 metadata document attached to each minted ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketMetadata {
    /// Token name
    pub name: String,
    /// Token description
    pub description: String,
    /// Image URL
    pub image: String,
    /// Display attributes
    pub attributes: Vec<MetadataAttribute>,
}

impl TicketMetadata {
    /// Metadata for ticket `number` of a purchase of `of` tickets
    #[must_use]
    pub fn for_purchase(event: &EventRecord, number: u32, of: u32) -> Self {
        Self {
            name: format!("{} Ticket", event.name),
            description: format!("Entry ticket for {}", event.name),
            image: event.image_url.clone(),
            attributes: vec![
                MetadataAttribute {
                    trait_type: "Date".to_string(),
                    value: event.date.format("%Y-%m-%d").to_string(),
                },
                MetadataAttribute {
                    trait_type: "Location".to_string(),
                    value: event.location.clone(),
                },
                MetadataAttribute {
                    trait_type: "Ticket Number".to_string(),
                    value: format!("{number} of {of}"),
                },
            ],
        }
    }

    /// Token URIs for a purchase of `quantity` tickets, numbered from 1
    #[must_use]
    pub fn token_uris(event: &EventRecord, quantity: u32) -> Vec<String> {
        (1..=quantity)
            .map(|number| Self::for_purchase(event, number, quantity).to_token_uri())
            .collect()
    }

    /// Inline `data:` URI holding the base64 JSON document
    #[must_use]
    pub fn to_token_uri(&self) -> String {
        // Serializing plain strings into JSON cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        format!(
            "data:application/json;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(json)
        )
    }

    /// Decode a `data:application/json;base64,` URI
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidTokenUri`] if the prefix, base64 or JSON
    /// is malformed.
    pub fn from_token_uri(uri: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidTokenUri(uri.chars().take(64).collect());
        let payload = uri
            .strip_prefix("data:application/json;base64,")
            .ok_or_else(invalid)?;
        let json = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| invalid())?;
        serde_json::from_slice(&json).map_err(|_| invalid())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn concert() -> EventRecord {
        EventRecord {
            id: EventId::new(0),
            name: "Concert".to_string(),
            date: Utc.with_ymd_and_hms(2030, 6, 1, 20, 0, 0).unwrap(),
            location: "Arena".to_string(),
            description: "Live".to_string(),
            image_url: "https://img.example/concert.png".to_string(),
            price: Wei::from_ether_str("0.05").unwrap(),
            total_tickets: 100,
            tickets_sold: 10,
            organizer: Address::from_bytes([1; 20]),
            category: "Music".to_string(),
            max_tickets_per_buyer: 3,
        }
    }

    #[test]
    fn address_parse_ignores_case() {
        let lower: Address = "0x52908400098527886e0f7030069857d2e4169ee7".parse().unwrap();
        let upper: Address = "0x52908400098527886E0F7030069857D2E4169EE7".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.to_string(), "0x52908400098527886e0f7030069857d2e4169ee7");
    }

    #[test]
    fn address_checksum_matches_eip55_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        ] {
            let address: Address = expected.parse().unwrap();
            assert_eq!(address.to_checksum(), expected);
        }
    }

    #[test]
    fn address_rejects_bad_input() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz908400098527886e0f7030069857d2e4169ee7".parse::<Address>().is_err());
    }

    #[test]
    fn ether_parsing_and_formatting() {
        let price = Wei::from_ether_str("0.05").unwrap();
        assert_eq!(price.as_u128(), 50_000_000_000_000_000);
        assert_eq!(price.format_ether(), "0.05");
        assert_eq!(Wei::from_ether_str("2").unwrap().format_ether(), "2");
        assert_eq!(Wei::from_ether_str(".5").unwrap().format_ether(), "0.5");
        assert!(Wei::from_ether_str("1.0000000000000000001").is_err());
        assert!(Wei::from_ether_str("abc").is_err());
        assert!(Wei::from_ether_str("").is_err());
    }

    #[test]
    fn wei_multiplication_is_checked() {
        assert_eq!(Wei::new(5).checked_mul(3), Some(Wei::new(15)));
        assert_eq!(Wei::new(u128::MAX).checked_mul(2), None);
    }

    #[test]
    fn event_derived_values() {
        let mut event = concert();
        assert_eq!(event.remaining_supply(), 90);
        assert!(!event.is_sold_out());
        event.tickets_sold = 100;
        assert!(event.is_sold_out());
        assert!(event.has_occurred(Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap()));
        assert!(!event.has_occurred(Utc.with_ymd_and_hms(2029, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn event_date_serializes_as_seconds() {
        let json = serde_json::to_value(concert()).unwrap();
        assert_eq!(json["date"], serde_json::json!(1_906_574_400));
        assert_eq!(json["organizer"], serde_json::json!(Address::from_bytes([1; 20]).to_string()));
    }

    #[test]
    fn token_uris_number_each_ticket() {
        let uris = TicketMetadata::token_uris(&concert(), 2);
        assert_eq!(uris.len(), 2);

        let second = TicketMetadata::from_token_uri(&uris[1]).unwrap();
        assert_eq!(second.name, "Concert Ticket");
        assert_eq!(second.description, "Entry ticket for Concert");
        assert_eq!(second.attributes[2].value, "2 of 2");
        assert_eq!(second.attributes[1].value, "Arena");
    }

    #[test]
    fn inactive_listing_has_zero_price() {
        let listing = ListingRecord {
            token_id: TokenId::new(7),
            seller: Address::ZERO,
            price: Wei::ZERO,
        };
        assert!(!listing.is_active());
    }
}
