//! Stream property addressing.
//!
//! The device layer exposes per-stream key/value properties addressed
//! by a four-character selector plus scope and element. The relay and
//! the device's own plugin half use one of these as a liveness
//! handshake channel.

use std::fmt;

// ── FourCc ───────────────────────────────────────────────────────

/// A four-character property selector code.
///
/// Selectors are packed big-endian into a `u32`. Strings that are not
/// exactly four printable ASCII characters map to the wildcard code
/// `'????'`, matching how the device layer treats malformed selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCc(pub u32);

impl FourCc {
    /// The wildcard selector, `'????'`.
    pub const WILDCARD: FourCc = FourCc(0x3F3F_3F3F);

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        FourCc(u32::from_be_bytes(bytes))
    }

    /// Parse a selector string; malformed input degrades to wildcard.
    pub fn parse(s: &str) -> Self {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Self::WILDCARD;
        }
        FourCc::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        for byte in b {
            f.write_str(char::from(byte).encode_utf8(&mut [0; 4]))?;
        }
        Ok(())
    }
}

// ── Scope and element ────────────────────────────────────────────

/// Which side of the device a property belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyScope {
    #[default]
    Global,
    Wildcard,
    Input,
    Output,
    PlayThrough,
}

/// Sub-addressing within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyElement {
    #[default]
    Main,
    Wildcard,
}

/// Full property address: selector, scope, element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyAddress {
    pub selector: FourCc,
    pub scope: PropertyScope,
    pub element: PropertyElement,
}

impl PropertyAddress {
    pub const fn new(selector: FourCc, scope: PropertyScope, element: PropertyElement) -> Self {
        Self {
            selector,
            scope,
            element,
        }
    }

    /// Global/main address for `selector`, the common case.
    pub const fn global_main(selector: FourCc) -> Self {
        Self::new(selector, PropertyScope::Global, PropertyElement::Main)
    }
}

// ── Handshake constants ──────────────────────────────────────────

/// Selector of the streaming-handshake property.
pub const STREAM_SELECTOR: FourCc = FourCc::from_bytes(*b"just");

/// Value the device publishes while at least one client is streaming.
pub const STREAMING_WANTED: &str = "sc=1";

// ── Tests ────────────────────────────────────────────────────────
