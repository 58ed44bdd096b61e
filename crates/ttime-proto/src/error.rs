// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for Roughtime message encoding, parsing, and verification.
//!
//! [`RoughtimeError`] groups failures by how a caller must treat them: every
//! variant other than [`RoughtimeError::Encode`] and
//! [`RoughtimeError::KeyGeneration`] is fatal to the single reply being
//! processed. All types implement `core::fmt::Display` and
//! [`std::error::Error`], and convert into [`std::io::Error`] for callers that
//! stay on `io::Result`.

use core::fmt;

use crate::tag::Tag;

/// Errors that can occur while building, parsing, or verifying Roughtime
/// messages.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RoughtimeError {
    /// A message could not be encoded.
    Encode(EncodeError),
    /// Malformed, truncated, unsorted, or incomplete wire data.
    WireFormat(WireFormatError),
    /// An Ed25519 signature did not verify.
    CryptoVerification(SignatureKind),
    /// A timestamp fell outside the delegation window, or the window itself is
    /// inverted.
    Range(RangeError),
    /// The Merkle root recomputed from the nonce and path does not match the
    /// signed root.
    TreeMismatch,
    /// The system random source failed while generating a key pair.
    KeyGeneration,
}

/// Failures while encoding a [`Message`](crate::wire::Message).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EncodeError {
    /// A value's length is not a multiple of four bytes.
    UnalignedValue {
        /// The offending tag.
        tag: Tag,
        /// The value length.
        len: usize,
    },
    /// More tags than fit in the signed 32-bit count.
    TooManyTags {
        /// Number of tags in the message.
        count: usize,
    },
    /// The summed value lengths do not fit in a 32-bit offset.
    PayloadTooLarge {
        /// Total payload length.
        len: u64,
    },
}

/// Failures while decoding wire bytes or extracting fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WireFormatError {
    /// The buffer is shorter than the header it declares.
    TooShort {
        /// Number of bytes needed.
        needed: u64,
        /// Number of bytes available.
        available: usize,
    },
    /// The buffer length is not a multiple of four.
    UnalignedLength {
        /// The buffer length.
        len: usize,
    },
    /// The payload region exceeds the largest supported message.
    TooLarge {
        /// Payload region length.
        len: usize,
    },
    /// Tags are not strictly ascending (covers duplicates).
    TagsOutOfOrder,
    /// An offset is not a multiple of four.
    UnalignedOffset {
        /// The offending offset.
        offset: u32,
    },
    /// Offsets decrease.
    OffsetsOutOfOrder,
    /// An offset points past the end of the payload region.
    Truncated,
    /// A required tag is missing.
    MissingTag {
        /// The expected tag.
        tag: Tag,
    },
    /// A tag's value has an unexpected length.
    InvalidLength {
        /// The tag.
        tag: Tag,
        /// The expected length (or required multiple, for PATH).
        expected: usize,
        /// The actual length.
        actual: usize,
    },
    /// A nested message failed to parse.
    Nested {
        /// Tag holding the nested message.
        tag: Tag,
        /// The inner failure.
        inner: Box<WireFormatError>,
    },
}

/// Which signature failed to verify.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureKind {
    /// The root key's signature over the delegation (CERT).
    Delegation,
    /// The online key's signature over the signed response (SREP).
    Response,
}

/// Delegation window violations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RangeError {
    /// `MAXT < MINT`.
    InvertedWindow {
        /// Delegation start, µs.
        min_time: u64,
        /// Delegation end, µs.
        max_time: u64,
    },
    /// The signed midpoint is outside `[MINT, MAXT]`.
    OutsideDelegation {
        /// The signed midpoint, µs.
        midpoint: u64,
        /// Delegation start, µs.
        min_time: u64,
        /// Delegation end, µs.
        max_time: u64,
    },
}

impl fmt::Display for RoughtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoughtimeError::Encode(e) => write!(f, "encode: {e}"),
            RoughtimeError::WireFormat(e) => write!(f, "wire format: {e}"),
            RoughtimeError::CryptoVerification(kind) => {
                write!(f, "invalid {kind} signature")
            }
            RoughtimeError::Range(e) => write!(f, "{e}"),
            RoughtimeError::TreeMismatch => {
                write!(f, "calculated tree root doesn't match signed root")
            }
            RoughtimeError::KeyGeneration => write!(f, "Ed25519 key generation failed"),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnalignedValue { tag, len } => {
                write!(f, "length of {tag} value ({len}) is not a multiple of four")
            }
            EncodeError::TooManyTags { count } => write!(f, "too many tags ({count})"),
            EncodeError::PayloadTooLarge { len } => write!(f, "payloads too large ({len} bytes)"),
        }
    }
}

impl fmt::Display for WireFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormatError::TooShort { needed, available } => {
                write!(
                    f,
                    "message too short: needed {needed} bytes, got {available}"
                )
            }
            WireFormatError::UnalignedLength { len } => {
                write!(f, "message length {len} is not a multiple of four")
            }
            WireFormatError::TooLarge { len } => write!(f, "message too large ({len} bytes)"),
            WireFormatError::TagsOutOfOrder => write!(f, "tags out of order"),
            WireFormatError::UnalignedOffset { offset } => {
                write!(f, "offset {offset} is not a multiple of four")
            }
            WireFormatError::OffsetsOutOfOrder => write!(f, "offsets out of order"),
            WireFormatError::Truncated => write!(f, "message truncated"),
            WireFormatError::MissingTag { tag } => write!(f, "missing required tag: {tag}"),
            WireFormatError::InvalidLength {
                tag,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "tag {tag} has invalid length: expected {expected}, got {actual}"
                )
            }
            WireFormatError::Nested { tag, inner } => {
                write!(f, "failed to parse {tag}: {inner}")
            }
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureKind::Delegation => write!(f, "delegation"),
            SignatureKind::Response => write!(f, "response"),
        }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::InvertedWindow { min_time, max_time } => {
                write!(f, "invalid delegation range: {max_time} < {min_time}")
            }
            RangeError::OutsideDelegation {
                midpoint,
                min_time,
                max_time,
            } => {
                write!(
                    f,
                    "timestamp {midpoint} out of range for delegation [{min_time}, {max_time}]"
                )
            }
        }
    }
}

impl std::error::Error for RoughtimeError {}
impl std::error::Error for EncodeError {}
impl std::error::Error for WireFormatError {}
impl std::error::Error for RangeError {}

impl From<EncodeError> for RoughtimeError {
    fn from(err: EncodeError) -> RoughtimeError {
        RoughtimeError::Encode(err)
    }
}

impl From<WireFormatError> for RoughtimeError {
    fn from(err: WireFormatError) -> RoughtimeError {
        RoughtimeError::WireFormat(err)
    }
}

impl From<RangeError> for RoughtimeError {
    fn from(err: RangeError) -> RoughtimeError {
        RoughtimeError::Range(err)
    }
}

impl From<RoughtimeError> for std::io::Error {
    fn from(err: RoughtimeError) -> std::io::Error {
        let kind = match &err {
            RoughtimeError::WireFormat(WireFormatError::TooShort { .. })
            | RoughtimeError::WireFormat(WireFormatError::Truncated) => {
                std::io::ErrorKind::UnexpectedEof
            }
            RoughtimeError::Encode(_) => std::io::ErrorKind::InvalidInput,
            RoughtimeError::KeyGeneration => std::io::ErrorKind::Other,
            _ => std::io::ErrorKind::InvalidData,
        };
        std::io::Error::new(kind, err)
    }
}
