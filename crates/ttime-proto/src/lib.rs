// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime protocol engine for trusted BMC time.
//!
//! Implements the classic (Google "v1") Roughtime wire format: the tag-value
//! message codec, SHA-512 Merkle batching, Ed25519 delegation certificates,
//! batch reply signing, chained request construction, and end-to-end reply
//! verification. A minimal SNTP codec supplies the unauthenticated samples
//! that are cross-checked against an authenticated Roughtime window.
//!
//! # Usage
//!
//! ```
//! use ttime_proto::crypto::{generate_key_pair, public_key, verify_reply};
//! use ttime_proto::delegation::OnlineKey;
//! use ttime_proto::reply::create_replies;
//! use ttime_proto::request::{create_request, parse_request};
//!
//! let root = generate_key_pair()?;
//! let online = OnlineKey::generate(&root, 0, u64::MAX)?;
//!
//! let request = create_request(&[])?;
//! let nonce = parse_request(&request.bytes)?;
//! let replies = create_replies(
//!     &[nonce],
//!     1_700_000_000_000_000,
//!     1_000_000,
//!     online.certificate(),
//!     online.key_pair(),
//! )?;
//!
//! let time = verify_reply(&replies[0], &public_key(&root), &request.nonce)?;
//! assert_eq!(time.midpoint, 1_700_000_000_000_000);
//! # Ok::<(), ttime_proto::error::RoughtimeError>(())
//! ```

#![warn(missing_docs)]

/// Signing contexts, key generation, and reply verification.
pub mod crypto;

/// Delegation certificates and online keys.
pub mod delegation;

/// Error types for encoding, decoding, and verification.
pub mod error;

/// SHA-512 Merkle tree over batched nonces.
pub mod merkle;

/// Batch reply construction.
pub mod reply;

/// Request construction and parsing.
pub mod request;

/// SNTPv4 packet codec.
pub mod sntp;

/// Roughtime tags.
pub mod tag;

/// Sizes, aliases, and result types.
pub mod types;

/// Tag-value message codec.
pub mod wire;

pub use crypto::verify_reply;
pub use error::RoughtimeError;
pub use tag::Tag;
pub use types::{Blind, Nonce, PublicKey, RoughtimeResult, SignedTime};
pub use wire::Message;
