//! Decoding of fixed-width integer keys stored as hex byte tokens.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Characters of the original input kept when a key cannot be decoded.
const RAW_PREVIEW_CHARS: usize = 20;
const TRUNCATION_MARKER: char = '…';

/// Result of decoding a raw key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DecodedKey {
    /// A signed integer key.
    Int(i32),
    /// No key bytes at all: an open lower bound.
    UnboundedLow,
    /// Bytes that could not be decoded safely, shown as a raw preview.
    Raw(String),
}

impl DecodedKey {
    /// Integer value of the key, if it decoded as one.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            DecodedKey::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for DecodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedKey::Int(value) => write!(f, "{value}"),
            DecodedKey::UnboundedLow => f.write_str("−∞"),
            DecodedKey::Raw(preview) => f.write_str(preview),
        }
    }
}

/// Declared byte width of a key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyWidth {
    /// Four bytes when at least four are present, two when exactly two are.
    #[default]
    Auto,
    /// 16-bit key; extra trailing bytes (alignment padding) are ignored.
    Int2,
    /// 32-bit key; extra trailing bytes are ignored.
    Int4,
}

/// Order of the bytes as they appear in the token list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Least significant byte first (storage order).
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

/// Width and byte order used to decode a key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLayout {
    /// Declared width.
    pub width: KeyWidth,
    /// Byte order of the tokens.
    pub order: ByteOrder,
}

impl KeyLayout {
    /// Little-endian layout of the given width.
    pub const fn little(width: KeyWidth) -> Self {
        Self {
            width,
            order: ByteOrder::Little,
        }
    }
}

/// Decodes whitespace-separated hex byte tokens into a key.
///
/// Never fails: input that cannot be decoded safely comes back as
/// [`DecodedKey::Raw`] holding a preview of the original text.
pub fn decode_key(raw: &str, layout: KeyLayout) -> DecodedKey {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return DecodedKey::UnboundedLow;
    }

    let take = match (layout.width, tokens.len()) {
        (KeyWidth::Auto | KeyWidth::Int4, n) if n >= 4 => 4,
        (KeyWidth::Auto, 2) => 2,
        (KeyWidth::Int2, n) if n >= 2 => 2,
        _ => return raw_preview(raw),
    };

    let Some(bytes) = parse_tokens(&tokens[..take]) else {
        return raw_preview(raw);
    };

    let value = match (take, layout.order) {
        (4, ByteOrder::Little) => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        (4, ByteOrder::Big) => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        (_, ByteOrder::Little) => i32::from(i16::from_le_bytes([bytes[0], bytes[1]])),
        (_, ByteOrder::Big) => i32::from(i16::from_be_bytes([bytes[0], bytes[1]])),
    };
    DecodedKey::Int(value)
}

fn parse_tokens(tokens: &[&str]) -> Option<Vec<u8>> {
    let mut bytes = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.len() != 2 {
            return None;
        }
        let decoded = hex::decode(token).ok()?;
        bytes.extend_from_slice(&decoded);
    }
    Some(bytes)
}

fn raw_preview(raw: &str) -> DecodedKey {
    let mut preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
    if raw.chars().count() > RAW_PREVIEW_CHARS {
        preview.push(TRUNCATION_MARKER);
    }
    trace!(input_len = raw.len(), "key bytes not decodable, keeping raw preview");
    DecodedKey::Raw(preview)
}
