// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime sizes, key and nonce types, and query results.

use core::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size of a nonce, blind, Merkle node, and signature (SHA-512 digest size).
pub const NONCE_SIZE: usize = 64;

/// Size of a blind.
pub const BLIND_SIZE: usize = 64;

/// Size of an Ed25519 public key.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature.
pub const SIGNATURE_SIZE: usize = 64;

/// Exact size of a client request; servers reject anything shorter.
pub const MIN_REQUEST_SIZE: usize = 1024;

/// A 64-byte request nonce.
pub type Nonce = [u8; NONCE_SIZE];

/// 64 random bytes mixed into a chained nonce.
pub type Blind = [u8; BLIND_SIZE];

/// A raw Ed25519 public key.
pub type PublicKey = [u8; PUBLIC_KEY_SIZE];

/// The authenticated `(midpoint, radius)` pair extracted from a reply.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignedTime {
    /// Midpoint, µs since the Unix epoch.
    pub midpoint: u64,
    /// Radius of uncertainty, µs.
    pub radius: u32,
}

impl SignedTime {
    /// Midpoint as a [`SystemTime`].
    pub fn midpoint_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_micros(self.midpoint)
    }

    /// Radius as a [`Duration`].
    pub fn radius_duration(&self) -> Duration {
        Duration::from_micros(u64::from(self.radius))
    }
}

/// The record of one successful, verified Roughtime exchange.
///
/// Keeps the raw request and reply bytes together with the blind that
/// produced the nonce, so later audits can recompute the nonce chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoughtimeResult {
    /// The request datagram sent.
    pub request: Vec<u8>,
    /// The blind used to derive the request nonce.
    pub blind: Blind,
    /// The reply datagram received.
    pub response: Vec<u8>,
    /// Verified midpoint, µs since the Unix epoch.
    pub midpoint: u64,
    /// Verified radius, µs.
    pub radius: u32,
}

impl RoughtimeResult {
    /// Midpoint and radius as standard time types.
    pub fn now(&self) -> (SystemTime, Duration) {
        (self.signed_time().midpoint_time(), self.signed_time().radius_duration())
    }

    /// The verified `(midpoint, radius)` pair.
    pub fn signed_time(&self) -> SignedTime {
        SignedTime {
            midpoint: self.midpoint,
            radius: self.radius,
        }
    }
}

impl fmt::Display for RoughtimeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.midpoint / 1_000_000;
        let micros = self.midpoint % 1_000_000;
        let radius = Duration::from_micros(u64::from(self.radius));
        write!(f, "{secs}.{micros:06} ±{radius:?}")
    }
}
