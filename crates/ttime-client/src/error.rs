// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for trusted-time acquisition.
//!
//! Every fallible operation returns [`TimeError`]. Callers that stay on
//! `io::Result` can convert with `?` and later recover the typed error by
//! downcasting:
//!
//! ```no_run
//! # async fn example() -> std::io::Result<()> {
//! use ttime_client::error::{ConsensusError, TimeError};
//!
//! let config = ttime_client::TimeConfig::default();
//! match ttime_client::acquire_time(&config).await.map_err(std::io::Error::from) {
//!     Ok(t) => println!("trusted time: {:?}", t.now()),
//!     Err(e) => {
//!         if let Some(TimeError::Consensus(ConsensusError::NoAuthenticatedTime { .. })) =
//!             e.get_ref().and_then(|inner| inner.downcast_ref::<TimeError>())
//!         {
//!             eprintln!("no Roughtime server answered; retry later");
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub use ttime_proto::error::{RoughtimeError, SignatureKind};
pub use ttime_proto::sntp::SntpError;

use std::fmt;
use std::io;

use ttime_proto::SignedTime;

/// Errors that can occur while acquiring trusted time.
#[derive(Debug)]
pub enum TimeError {
    /// A reply failed to decode or verify.
    Roughtime(RoughtimeError),
    /// Address resolution or the UDP exchange failed.
    Network(NetworkError),
    /// No authenticated time could be established.
    Consensus(ConsensusError),
    /// Invalid server configuration.
    Config(ConfigError),
    /// An NTP sample could not be obtained.
    Ntp(NtpError),
}

/// Network failures for a single Roughtime query.
#[derive(Debug)]
pub enum NetworkError {
    /// The server lists no `udp`, `udp4` or `udp6` address.
    NoUdpAddress {
        /// Server name.
        server: String,
    },
    /// The address resolved to no socket addresses.
    NoAddresses {
        /// The address that failed to resolve.
        address: String,
    },
    /// Every attempt timed out.
    NoReply {
        /// Number of attempts made.
        attempts: usize,
    },
    /// A socket operation failed for a reason other than a timeout.
    Io(io::Error),
}

/// Consensus-level failures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConsensusError {
    /// No Roughtime servers are configured.
    NoServers,
    /// Every Roughtime server failed.
    NoAuthenticatedTime {
        /// Number of servers queried.
        attempted: usize,
    },
}

/// Server-list and configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// The JSON could not be parsed.
    Json(serde_json::Error),
    /// Two entries share a name.
    DuplicateName {
        /// The repeated name.
        name: String,
    },
    /// A public key is not valid base64 or has the wrong length.
    InvalidPublicKey {
        /// Server name.
        name: String,
        /// Why the key was rejected.
        detail: String,
    },
    /// The configuration file could not be read.
    Io(io::Error),
}

/// NTP sampling errors.
#[derive(Debug)]
pub enum NtpError {
    /// The reply failed validation.
    Sntp(SntpError),
    /// No reply within the timeout.
    Timeout,
    /// The server name resolved to no socket addresses.
    NoAddresses {
        /// The server name.
        server: String,
    },
    /// Socket failure.
    Io(io::Error),
}

/// A failure while re-verifying a chain, naming the link that failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainError {
    /// Zero-based index of the failing link.
    pub link: usize,
    /// What went wrong.
    pub kind: ChainErrorKind,
}

/// Reasons a chain link fails verification.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChainErrorKind {
    /// The reply does not verify against the recomputed nonce.
    Verify(RoughtimeError),
    /// The reply verifies but carries a different time than was recorded.
    TimestampMismatch {
        /// The recorded time.
        recorded: SignedTime,
        /// The time the reply actually carries.
        verified: SignedTime,
    },
    /// A claim names a key type other than `ed25519`.
    UnsupportedKeyType {
        /// The key type found.
        key_type: String,
    },
    /// A claim field is not valid base64 or has the wrong length.
    InvalidField {
        /// The JSON field name.
        field: &'static str,
    },
}

// ── Display implementations ─────────────────────────────────────────

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeError::Roughtime(e) => write!(f, "roughtime: {e}"),
            TimeError::Network(e) => write!(f, "network: {e}"),
            TimeError::Consensus(e) => write!(f, "{e}"),
            TimeError::Config(e) => write!(f, "config: {e}"),
            TimeError::Ntp(e) => write!(f, "ntp: {e}"),
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::NoUdpAddress { server } => {
                write!(f, "no UDP address listed for {server}")
            }
            NetworkError::NoAddresses { address } => {
                write!(f, "address resolved to no socket addresses: {address}")
            }
            NetworkError::NoReply { attempts } => {
                write!(f, "no reply after {attempts} attempts")
            }
            NetworkError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ConsensusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusError::NoServers => write!(f, "no Roughtime servers configured"),
            ConsensusError::NoAuthenticatedTime { attempted } => {
                write!(f, "none of {attempted} Roughtime servers returned a valid reply")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "invalid JSON: {e}"),
            ConfigError::DuplicateName { name } => {
                write!(f, "duplicate server name: {name}")
            }
            ConfigError::InvalidPublicKey { name, detail } => {
                write!(f, "invalid public key for {name}: {detail}")
            }
            ConfigError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for NtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NtpError::Sntp(e) => write!(f, "{e}"),
            NtpError::Timeout => write!(f, "NTP request timed out"),
            NtpError::NoAddresses { server } => {
                write!(f, "address resolved to no socket addresses: {server}")
            }
            NtpError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain link {}: {}", self.link, self.kind)
    }
}

impl fmt::Display for ChainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainErrorKind::Verify(e) => write!(f, "{e}"),
            ChainErrorKind::TimestampMismatch { recorded, verified } => write!(
                f,
                "timestamp mismatch: recorded {}±{}, reply carries {}±{}",
                recorded.midpoint, recorded.radius, verified.midpoint, verified.radius
            ),
            ChainErrorKind::UnsupportedKeyType { key_type } => {
                write!(f, "unsupported public key type: {key_type}")
            }
            ChainErrorKind::InvalidField { field } => write!(f, "invalid {field}"),
        }
    }
}

// ── Error trait implementations ─────────────────────────────────────

impl std::error::Error for TimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimeError::Roughtime(e) => Some(e),
            TimeError::Network(e) => Some(e),
            TimeError::Consensus(e) => Some(e),
            TimeError::Config(e) => Some(e),
            TimeError::Ntp(e) => Some(e),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConsensusError {}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(e) => Some(e),
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for NtpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NtpError::Sntp(e) => Some(e),
            NtpError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ChainError {}

// ── From conversions ────────────────────────────────────────────────

impl From<TimeError> for io::Error {
    fn from(err: TimeError) -> io::Error {
        let kind = match &err {
            TimeError::Roughtime(RoughtimeError::KeyGeneration) => io::ErrorKind::Other,
            TimeError::Roughtime(_) => io::ErrorKind::InvalidData,
            TimeError::Network(NetworkError::NoReply { .. }) => io::ErrorKind::TimedOut,
            TimeError::Network(NetworkError::Io(e)) => e.kind(),
            TimeError::Network(_) => io::ErrorKind::AddrNotAvailable,
            TimeError::Consensus(ConsensusError::NoServers) => io::ErrorKind::InvalidInput,
            TimeError::Consensus(_) => io::ErrorKind::TimedOut,
            TimeError::Config(ConfigError::Io(e)) => e.kind(),
            TimeError::Config(_) => io::ErrorKind::InvalidInput,
            TimeError::Ntp(NtpError::Timeout) => io::ErrorKind::TimedOut,
            TimeError::Ntp(NtpError::Io(e)) => e.kind(),
            TimeError::Ntp(_) => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}

impl From<RoughtimeError> for TimeError {
    fn from(err: RoughtimeError) -> TimeError {
        TimeError::Roughtime(err)
    }
}

impl From<NetworkError> for TimeError {
    fn from(err: NetworkError) -> TimeError {
        TimeError::Network(err)
    }
}

impl From<ConsensusError> for TimeError {
    fn from(err: ConsensusError) -> TimeError {
        TimeError::Consensus(err)
    }
}

impl From<ConfigError> for TimeError {
    fn from(err: ConfigError) -> TimeError {
        TimeError::Config(err)
    }
}

impl From<NtpError> for TimeError {
    fn from(err: NtpError) -> TimeError {
        TimeError::Ntp(err)
    }
}

impl From<io::Error> for NetworkError {
    fn from(err: io::Error) -> NetworkError {
        NetworkError::Io(err)
    }
}

impl From<io::Error> for NtpError {
    fn from(err: io::Error) -> NtpError {
        NtpError::Io(err)
    }
}

impl From<SntpError> for NtpError {
    fn from(err: SntpError) -> NtpError {
        NtpError::Sntp(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> ConfigError {
        ConfigError::Json(err)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = TimeError::Network(NetworkError::NoReply { attempts: 3 });
        assert_eq!(e.to_string(), "network: no reply after 3 attempts");

        let e = TimeError::Consensus(ConsensusError::NoAuthenticatedTime { attempted: 4 });
        assert_eq!(
            e.to_string(),
            "none of 4 Roughtime servers returned a valid reply"
        );

        let e = ChainError {
            link: 2,
            kind: ChainErrorKind::Verify(RoughtimeError::TreeMismatch),
        };
        assert_eq!(
            e.to_string(),
            "chain link 2: calculated tree root doesn't match signed root"
        );
    }

    #[test]
    fn test_time_error_to_io_error_kind() {
        let cases: Vec<(TimeError, io::ErrorKind)> = vec![
            (
                TimeError::Roughtime(RoughtimeError::TreeMismatch),
                io::ErrorKind::InvalidData,
            ),
            (
                TimeError::Network(NetworkError::NoReply { attempts: 1 }),
                io::ErrorKind::TimedOut,
            ),
            (
                TimeError::Network(NetworkError::Io(io::Error::from(
                    io::ErrorKind::ConnectionRefused,
                ))),
                io::ErrorKind::ConnectionRefused,
            ),
            (
                TimeError::Consensus(ConsensusError::NoServers),
                io::ErrorKind::InvalidInput,
            ),
            (
                TimeError::Config(ConfigError::DuplicateName { name: "a".into() }),
                io::ErrorKind::InvalidInput,
            ),
            (TimeError::Ntp(NtpError::Timeout), io::ErrorKind::TimedOut),
        ];
        for (err, expected) in cases {
            let io_err: io::Error = err.into();
            assert_eq!(io_err.kind(), expected);
        }
    }

    #[test]
    fn test_downcast_roundtrip() {
        let io_err: io::Error = TimeError::Consensus(ConsensusError::NoServers).into();
        let inner = io_err
            .get_ref()
            .unwrap()
            .downcast_ref::<TimeError>()
            .unwrap();
        assert!(matches!(
            inner,
            TimeError::Consensus(ConsensusError::NoServers)
        ));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;
        let e = TimeError::Ntp(NtpError::Sntp(SntpError::Unsynchronized));
        let source = e.source().unwrap();
        assert_eq!(source.to_string(), "server clock is unsynchronized");
    }
}
