// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Embedded Roughtime server.
//!
//! Answers classic Roughtime requests in batches, signing one Merkle root per
//! batch with a delegated online key. Used to test BMC time acquisition
//! against a local authority and to run a private time source on an isolated
//! management network.

#![warn(missing_docs)]

/// Error types for the server.
pub mod error;

/// Server builder, clocks and identities.
pub mod server;

pub use server::{Clock, FixedClock, RoughtimeServer, ServerIdentity, SystemClock};
