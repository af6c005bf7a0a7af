//! Mirror-store row types.
//!
//! These mirror the relational copy of the on-chain state. The chain is
//! authoritative; rows here are a derived cache that the reconciler repairs.
//!
//! Monetary amounts are wei stored as canonical decimal TEXT (`u128` has the
//! range, SQLite integers do not). All writes go through [`format_wei`] so
//! TEXT equality is numeric equality.

use serde::{Deserialize, Serialize};

/// Off-chain account roles, from the original user model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Appraiser,
    Inspector,
    Admin,
}

/// Contract-side property categories. The on-chain enum is ordinal, so the
/// discriminants here must stay in contract order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Residential,
    Commercial,
    Land,
    Apartment,
    Office,
}

impl PropertyType {
    /// Ordinal used when ABI-encoding `listProperty`.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Residential => 0,
            Self::Commercial => 1,
            Self::Land => 2,
            Self::Apartment => 3,
            Self::Office => 4,
        }
    }
}

/// Offer lifecycle states. `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Active,
    Accepted,
    Rejected,
    Expired,
}

/// A locally registered account, bridging an Ethereum address to an
/// off-chain identity. `eth_address` is lowercase hex when present.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub eth_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Property {
    /// Equal to the on-chain property id.
    pub id: i64,
    pub seller_id: i64,
    pub price_wei: String,
    pub location: String,
    pub description: String,
    pub is_listed: bool,
    pub is_sold: bool,
    pub buyer_id: Option<i64>,
    pub offer_amount_wei: Option<String>,
    pub inspection_passed: bool,
    pub financing_approved: bool,
    pub listed_at: i64,
    pub auction_end_time: Option<i64>,
    pub minimum_bid_wei: Option<String>,
    pub agent_id: Option<i64>,
    /// Agent commission in basis points.
    pub agent_commission_bps: Option<i64>,
    pub property_type: PropertyType,
    pub area: Option<i64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offer {
    pub id: i64,
    pub property_id: i64,
    pub buyer_id: i64,
    pub amount_wei: String,
    pub status: OfferStatus,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub tx_hash: Option<String>,
}

/// Settlement record, one-to-one with a sold property. Upserted by property
/// id so event replays converge to a single row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionRecord {
    pub property_id: i64,
    pub seller_id: i64,
    pub buyer_id: i64,
    pub price_wei: String,
    pub created_at: i64,
    pub tx_hash: Option<String>,
}

/// Canonical decimal form for a wei amount.
pub fn format_wei(v: u128) -> String {
    v.to_string()
}

/// Parse a canonical decimal wei string.
pub fn parse_wei(s: &str) -> Option<u128> {
    s.parse().ok()
}

/// Lowercase an address for storage and comparison. Chain APIs return
/// checksummed (mixed-case) addresses; the mirror stores lowercase only.
pub fn normalize_address(addr: &str) -> String {
    addr.to_lowercase()
}
