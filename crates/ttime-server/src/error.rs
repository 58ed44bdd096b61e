// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for the Roughtime server.
//!
//! Public APIs return `io::Result<T>`. Errors are built as [`ServerError`]
//! and converted with `From<ServerError> for io::Error`; callers can recover
//! the typed error by downcasting:
//!
//! ```no_run
//! use ttime_server::error::ServerError;
//!
//! # fn example(result: std::io::Result<()>) {
//! if let Err(e) = result {
//!     match e.get_ref().and_then(|inner| inner.downcast_ref::<ServerError>()) {
//!         Some(ServerError::Config(c)) => eprintln!("bad configuration: {c}"),
//!         Some(other) => eprintln!("server error: {other}"),
//!         None => eprintln!("i/o error: {e}"),
//!     }
//! }
//! # }
//! ```

pub use ttime_proto::error::RoughtimeError;

use std::fmt;
use std::io;

/// Errors that can occur while building or running a server.
#[derive(Debug)]
pub enum ServerError {
    /// Invalid server configuration.
    Config(ConfigError),
    /// Key generation or reply signing failed.
    Roughtime(RoughtimeError),
    /// Socket bind, send or receive failure.
    Io(io::Error),
}

/// Server configuration errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// No online key was supplied to the builder.
    MissingOnlineKey,
    /// The batch size must be at least one.
    InvalidBatchSize,
}

// ── Display implementations ─────────────────────────────────────────

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "roughtime server config error: {e}"),
            ServerError::Roughtime(e) => write!(f, "roughtime server error: {e}"),
            ServerError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingOnlineKey => write!(f, "no online key configured"),
            ConfigError::InvalidBatchSize => write!(f, "max batch size must be at least 1"),
        }
    }
}

// ── Error trait implementations ─────────────────────────────────────

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Config(e) => Some(e),
            ServerError::Roughtime(e) => Some(e),
            ServerError::Io(e) => Some(e),
        }
    }
}

impl std::error::Error for ConfigError {}

// ── From conversions ────────────────────────────────────────────────

impl From<ServerError> for io::Error {
    fn from(err: ServerError) -> io::Error {
        match err {
            ServerError::Io(e) => e,
            ServerError::Config(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            ServerError::Roughtime(_) => io::Error::other(err),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        ServerError::Config(err)
    }
}

impl From<RoughtimeError> for ServerError {
    fn from(err: RoughtimeError) -> Self {
        ServerError::Roughtime(err)
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        ServerError::Io(err)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
