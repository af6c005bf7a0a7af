//! Minimal Solidity ABI helpers.
//!
//! Covers exactly what the RealEstate contract needs: Keccak-256 selectors
//! and event topics, 32-byte word encoding for calldata, and word decoding
//! for event data. Dynamic types are limited to a single trailing `string`.

use sha3::{Digest, Keccak256};

use crate::chain::ChainError;

pub const WORD: usize = 32;

/// Keccak-256 of a signature string.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(input));
    out
}

/// First four bytes of the Keccak-256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// An event's topic0 is the full Keccak-256 of its signature.
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

// ─────────────────────────────────────────────────────────
// Encoding
// ─────────────────────────────────────────────────────────

/// Incrementally builds `selector ++ head words ++ tail` calldata.
pub struct CallBuilder {
    head: Vec<[u8; WORD]>,
    /// (head index, bytes) for dynamic args patched in at `build` time.
    dynamic: Vec<(usize, Vec<u8>)>,
    selector: [u8; 4],
}

impl CallBuilder {
    pub fn new(signature: &str) -> Self {
        Self {
            head: Vec::new(),
            dynamic: Vec::new(),
            selector: selector(signature),
        }
    }

    pub fn uint(mut self, value: u128) -> Self {
        self.head.push(encode_uint(value));
        self
    }

    pub fn address(mut self, addr: &str) -> Result<Self, ChainError> {
        self.head.push(encode_address(addr)?);
        Ok(self)
    }

    /// `address` arg that falls back to the zero address.
    pub fn address_or_zero(self, addr: Option<&str>) -> Result<Self, ChainError> {
        match addr {
            Some(a) => self.address(a),
            None => Ok(self.uint(0)),
        }
    }

    pub fn boolean(mut self, value: bool) -> Self {
        self.head.push(encode_uint(u128::from(value)));
        self
    }

    pub fn string(mut self, value: &str) -> Self {
        let idx = self.head.len();
        self.head.push([0u8; WORD]); // offset placeholder
        self.dynamic.push((idx, value.as_bytes().to_vec()));
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let head_len = self.head.len() * WORD;
        let mut tail: Vec<u8> = Vec::new();
        for (idx, bytes) in std::mem::take(&mut self.dynamic) {
            self.head[idx] = encode_uint((head_len + tail.len()) as u128);
            tail.extend_from_slice(&encode_uint(bytes.len() as u128));
            tail.extend_from_slice(&bytes);
            // pad the payload to a word boundary
            let rem = bytes.len() % WORD;
            if rem != 0 {
                tail.extend(std::iter::repeat(0u8).take(WORD - rem));
            }
        }

        let mut out = Vec::with_capacity(4 + head_len + tail.len());
        out.extend_from_slice(&self.selector);
        for word in &self.head {
            out.extend_from_slice(word);
        }
        out.extend_from_slice(&tail);
        out
    }
}

fn encode_uint(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn encode_address(addr: &str) -> Result<[u8; WORD], ChainError> {
    let bytes = hex::decode(addr.trim_start_matches("0x"))
        .map_err(|_| ChainError::Rpc(format!("invalid address: {addr}")))?;
    if bytes.len() != 20 {
        return Err(ChainError::Rpc(format!("invalid address length: {addr}")));
    }
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(&bytes);
    Ok(word)
}

// ─────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────

/// Decode the `n`-th 32-byte word of ABI data as a u128.
/// Returns `None` if the word is missing or overflows 128 bits.
pub fn decode_uint(data: &[u8], n: usize) -> Option<u128> {
    let word = data.get(n * WORD..(n + 1) * WORD)?;
    if word[..WORD - 16].iter().any(|&b| b != 0) {
        return None;
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[WORD - 16..]);
    Some(u128::from_be_bytes(buf))
}

/// Decode a 32-byte topic as a lowercase `0x…` address.
pub fn decode_address_word(word: &[u8]) -> Option<String> {
    if word.len() != WORD || word[..WORD - 20].iter().any(|&b| b != 0) {
        return None;
    }
    Some(format!("0x{}", hex::encode(&word[WORD - 20..])))
}

/// Decode a dynamic `string` whose offset lives in the `n`-th head word.
/// All range arithmetic is checked: a wild offset or length word decodes to
/// `None` rather than panicking on overflow.
pub fn decode_string(data: &[u8], n: usize) -> Option<String> {
    let offset = usize::try_from(decode_uint(data, n)?).ok()?;
    let payload_start = offset.checked_add(WORD)?;
    let len_word = data.get(offset..payload_start)?;
    let len = usize::try_from(decode_uint(len_word, 0)?).ok()?;
    let bytes = data.get(payload_start..payload_start.checked_add(len)?)?;
    String::from_utf8(bytes.to_vec()).ok()
}

// ─────────────────────────────────────────────────────────
// Hex quantities (JSON-RPC wire format)
// ─────────────────────────────────────────────────────────

/// Parse a `0x`-prefixed hex quantity into a u64.
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

/// Format a u64 as a minimal `0x`-prefixed hex quantity.
pub fn to_hex_u64(v: u64) -> String {
    format!("0x{v:x}")
}

/// Format a u128 as a minimal `0x`-prefixed hex quantity.
pub fn to_hex_u128(v: u128) -> String {
    format!("0x{v:x}")
}
