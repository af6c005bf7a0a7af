//! Event kinds emitted by the RealEstate contract and log decoding.
//!
//! Topic layout: `topics[0]` is the Keccak-256 of the event signature,
//! `topics[1]` the property id, `topics[2]` the actor address. Amounts and
//! the listing details string travel in `data`.

use tracing::warn;

use crate::abi;
use crate::chain::RawLog;
use crate::models::normalize_address;

/// The three contract events the reconciler replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PropertyListed,
    OfferAccepted,
    PropertySold,
}

impl EventKind {
    /// Replay order within one reconciliation pass. Listings go first so
    /// that a sale landing in the same scanned range finds its property.
    pub const REPLAY_ORDER: [EventKind; 3] = [
        EventKind::PropertyListed,
        EventKind::OfferAccepted,
        EventKind::PropertySold,
    ];

    pub fn signature(self) -> &'static str {
        match self {
            Self::PropertyListed => "PropertyListed(uint256,address,uint256,string)",
            Self::OfferAccepted => "OfferAccepted(uint256,address,uint256)",
            Self::PropertySold => "PropertySold(uint256,address,uint256)",
        }
    }

    /// `topics[0]` filter value for `eth_getLogs`.
    pub fn topic0(self) -> [u8; 32] {
        abi::event_topic(self.signature())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PropertyListed => "property_listed",
            Self::OfferAccepted => "offer_accepted",
            Self::PropertySold => "property_sold",
        }
    }
}

/// A decoded contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyEvent {
    Listed {
        property_id: i64,
        seller: String,
        price_wei: u128,
        details: String,
    },
    OfferAccepted {
        property_id: i64,
        buyer: String,
        amount_wei: u128,
    },
    Sold {
        property_id: i64,
        buyer: String,
        sale_price_wei: u128,
    },
}

impl PropertyEvent {
    pub fn property_id(&self) -> i64 {
        match self {
            Self::Listed { property_id, .. }
            | Self::OfferAccepted { property_id, .. }
            | Self::Sold { property_id, .. } => *property_id,
        }
    }
}

/// A decoded event plus its chain coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEvent {
    pub event: PropertyEvent,
    pub block_number: u64,
    pub tx_hash: String,
}

/// Decode one raw log of a known kind. Malformed logs are reported and
/// dropped; a bad log must never poison a whole batch.
pub fn decode_log(kind: EventKind, raw: &RawLog) -> Option<ChainEvent> {
    let decoded = decode_args(kind, raw);
    if decoded.is_none() {
        warn!(
            kind = kind.as_str(),
            tx_hash = raw.transaction_hash.as_deref().unwrap_or("?"),
            "Skipping malformed log"
        );
    }
    let event = decoded?;

    Some(ChainEvent {
        event,
        block_number: raw
            .block_number
            .as_deref()
            .and_then(abi::parse_hex_u64)
            .unwrap_or(0),
        tx_hash: raw.transaction_hash.clone().unwrap_or_default(),
    })
}

fn decode_args(kind: EventKind, raw: &RawLog) -> Option<PropertyEvent> {
    let property_id = i64::try_from(topic_uint(raw, 1)?).ok()?;
    let actor = normalize_address(&abi::decode_address_word(&topic_bytes(raw, 2)?)?);
    let data = hex_data(&raw.data)?;
    let amount = abi::decode_uint(&data, 0)?;

    match kind {
        EventKind::PropertyListed => Some(PropertyEvent::Listed {
            property_id,
            seller: actor,
            price_wei: amount,
            details: abi::decode_string(&data, 1)?,
        }),
        EventKind::OfferAccepted => Some(PropertyEvent::OfferAccepted {
            property_id,
            buyer: actor,
            amount_wei: amount,
        }),
        EventKind::PropertySold => Some(PropertyEvent::Sold {
            property_id,
            buyer: actor,
            sale_price_wei: amount,
        }),
    }
}

fn topic_bytes(raw: &RawLog, n: usize) -> Option<Vec<u8>> {
    let topic = raw.topics.get(n)?;
    let bytes = hex::decode(topic.trim_start_matches("0x")).ok()?;
    (bytes.len() == abi::WORD).then_some(bytes)
}

fn topic_uint(raw: &RawLog, n: usize) -> Option<u128> {
    abi::decode_uint(&topic_bytes(raw, n)?, 0)
}

fn hex_data(data: &str) -> Option<Vec<u8>> {
    hex::decode(data.trim_start_matches("0x")).ok()
}
