// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime tags.
//!
//! A tag is four bytes read as a little-endian `u32`. Messages order their
//! tags by that numeric value, so [`Tag`] derives `Ord` from it.

use core::fmt;

/// A 4-byte Roughtime tag, stored as its little-endian `u32` value.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Tag(u32);

impl Tag {
    /// Certificate: contains nested DELE and SIG.
    pub const CERT: Tag = Tag::from_bytes(*b"CERT");
    /// Delegation: contains MINT, MAXT, PUBK.
    pub const DELE: Tag = Tag::from_bytes(*b"DELE");
    /// Index of the client's nonce in the Merkle tree.
    pub const INDX: Tag = Tag::from_bytes(*b"INDX");
    /// Maximum delegation time (µs since the Unix epoch).
    pub const MAXT: Tag = Tag::from_bytes(*b"MAXT");
    /// Midpoint timestamp (µs since the Unix epoch).
    pub const MIDP: Tag = Tag::from_bytes(*b"MIDP");
    /// Minimum delegation time (µs since the Unix epoch).
    pub const MINT: Tag = Tag::from_bytes(*b"MINT");
    /// Client nonce (64 bytes).
    pub const NONC: Tag = Tag::from_bytes(*b"NONC");
    /// Request padding.
    pub const PAD: Tag = Tag::from_bytes(*b"PAD\xff");
    /// Merkle inclusion path (64-byte nodes).
    pub const PATH: Tag = Tag::from_bytes(*b"PATH");
    /// Delegated online public key (32 bytes, Ed25519).
    pub const PUBK: Tag = Tag::from_bytes(*b"PUBK");
    /// Radius of uncertainty (µs).
    pub const RADI: Tag = Tag::from_bytes(*b"RADI");
    /// Merkle tree root (64 bytes).
    pub const ROOT: Tag = Tag::from_bytes(*b"ROOT");
    /// Ed25519 signature (64 bytes).
    pub const SIG: Tag = Tag::from_bytes(*b"SIG\0");
    /// Signed response: contains MIDP, RADI, ROOT.
    pub const SREP: Tag = Tag::from_bytes(*b"SREP");

    /// Build a tag from its four wire bytes.
    pub const fn from_bytes(bytes: [u8; 4]) -> Tag {
        Tag(u32::from_le_bytes(bytes))
    }

    /// Build a tag from its numeric value.
    pub const fn from_u32(value: u32) -> Tag {
        Tag(value)
    }

    /// The four wire bytes of this tag.
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// The numeric value used for ordering.
    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        if bytes
            .iter()
            .all(|b| b.is_ascii_graphic() || *b == 0 || *b == 0xff)
        {
            for b in bytes.iter().filter(|b| b.is_ascii_graphic()) {
                write!(f, "{}", *b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}
