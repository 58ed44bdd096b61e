// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime server lists and trusted-time configuration.
//!
//! Server lists use the JSON layout shared by Roughtime clients:
//!
//! ```json
//! {"servers": [{
//!     "name": "roughtime.cloudflare.com",
//!     "publicKeyType": "ed25519",
//!     "publicKey": "gD63hSj3ScS+wuOeGrubXlq35N1c5Lby/S+T7MNTjxo=",
//!     "addresses": [{"protocol": "udp", "address": "roughtime.cloudflare.com:2002"}]
//! }]}
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ttime_proto::PublicKey;
use ttime_proto::types::PUBLIC_KEY_SIZE;

use crate::error::ConfigError;

/// The only supported root key type.
pub const KEY_TYPE_ED25519: &str = "ed25519";

/// Default per-attempt timeout for a Roughtime query.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default number of attempts per Roughtime server.
pub const DEFAULT_ATTEMPTS: usize = 3;

const UDP_PROTOCOLS: [&str; 3] = ["udp", "udp4", "udp6"];

/// A transport and address pair.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServerAddress {
    /// `udp`, `udp4` or `udp6`; other protocols are ignored.
    pub protocol: String,
    /// `host:port`, with IPv6 literals in brackets.
    pub address: String,
}

/// An authenticated Roughtime server.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoughtimeServer {
    /// Display name; unique within a list.
    pub name: String,
    /// Always [`KEY_TYPE_ED25519`] for servers accepted by [`parse_server_list`].
    pub public_key_type: String,
    /// The server's long-term root key.
    #[serde(with = "base64_key")]
    pub public_key: PublicKey,
    /// Candidate addresses in preference order.
    pub addresses: Vec<ServerAddress>,
}

impl RoughtimeServer {
    /// An Ed25519 server reachable over UDP at `address`.
    pub fn new(name: impl Into<String>, public_key: PublicKey, address: impl Into<String>) -> Self {
        RoughtimeServer {
            name: name.into(),
            public_key_type: KEY_TYPE_ED25519.to_string(),
            public_key,
            addresses: vec![ServerAddress {
                protocol: "udp".to_string(),
                address: address.into(),
            }],
        }
    }

    /// The first address with a UDP protocol.
    pub fn udp_address(&self) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| UDP_PROTOCOLS.contains(&a.protocol.as_str()))
            .map(|a| a.address.as_str())
    }
}

/// An entry as it appears on disk, before key-type filtering.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerEntry {
    name: String,
    public_key_type: String,
    #[serde(with = "base64_bytes")]
    public_key: Vec<u8>,
    #[serde(default)]
    addresses: Vec<ServerAddress>,
}

#[derive(Deserialize)]
struct ServerListFile {
    servers: Vec<ServerEntry>,
}

/// Servers accepted from a list, and how many entries were skipped.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ServerList {
    /// Usable servers, in file order.
    pub servers: Vec<RoughtimeServer>,
    /// Entries with an unsupported key type or no UDP address.
    pub skipped: usize,
}

/// Parse a JSON server list.
///
/// Duplicate names and malformed Ed25519 keys are errors. Entries with another
/// key type or without a UDP address are skipped and counted.
pub fn parse_server_list(json: &str) -> Result<ServerList, ConfigError> {
    let file: ServerListFile = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    let mut list = ServerList::default();
    for entry in file.servers {
        if !seen.insert(entry.name.clone()) {
            return Err(ConfigError::DuplicateName { name: entry.name });
        }

        if entry.public_key_type != KEY_TYPE_ED25519 {
            tracing::debug!(server = %entry.name, key_type = %entry.public_key_type, "skipping server");
            list.skipped += 1;
            continue;
        }

        let public_key: PublicKey =
            entry
                .public_key
                .as_slice()
                .try_into()
                .map_err(|_| ConfigError::InvalidPublicKey {
                    name: entry.name.clone(),
                    detail: format!(
                        "expected {PUBLIC_KEY_SIZE} bytes, got {}",
                        entry.public_key.len()
                    ),
                })?;

        let server = RoughtimeServer {
            name: entry.name,
            public_key_type: entry.public_key_type,
            public_key,
            addresses: entry.addresses,
        };
        if server.udp_address().is_none() {
            tracing::debug!(server = %server.name, "skipping server without a UDP address");
            list.skipped += 1;
            continue;
        }
        list.servers.push(server);
    }

    Ok(list)
}

/// Read and parse a JSON server list from `path`.
pub fn load_server_list(path: impl AsRef<Path>) -> Result<ServerList, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_server_list(&json)
}

/// Decode a base64 Ed25519 public key.
pub fn decode_public_key(encoded: &str) -> Result<PublicKey, String> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| e.to_string())?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("expected {PUBLIC_KEY_SIZE} bytes, got {}", bytes.len()))
}

/// Public servers shipped with the firmware.
pub fn default_roughtime_servers() -> Vec<RoughtimeServer> {
    [
        (
            "roughtime.cloudflare.com",
            "gD63hSj3ScS+wuOeGrubXlq35N1c5Lby/S+T7MNTjxo=",
            "roughtime.cloudflare.com:2002",
        ),
        (
            "roughtime.sandbox.google.com",
            "etPaaIxcBMY1oUeGpwvPMCJMwlRVNxv51KK/tktoJTQ=",
            "roughtime.sandbox.google.com:2002",
        ),
        (
            "time.0xt.ca",
            "iBVjxg/1j7y1+kQUTBYdTabxCppesU/07D4PMDJk2WA=",
            "time.0xt.ca:2002",
        ),
        (
            "roughtime.int80h.com",
            "AW5uAoTSTDfG5NfY1bTh08GUnOqlRb+HVhbJ3ODJvsE=",
            "roughtime.int80h.com:2002",
        ),
    ]
    .into_iter()
    .filter_map(|(name, key, address)| match decode_public_key(key) {
        Ok(key) => Some(RoughtimeServer::new(name, key, address)),
        Err(e) => {
            tracing::warn!(server = name, error = %e, "skipping server with corrupt key");
            None
        }
    })
    .collect()
}

/// NTP hosts shipped with the firmware.
pub fn default_ntp_servers() -> Vec<String> {
    (1..=4).map(|i| format!("time{i}.google.com")).collect()
}

/// Inputs to [`acquire_time`](crate::consensus::acquire_time).
///
/// Deserializes from `{"roughtimeServers": [...], "ntpServers": [...],
/// "attempts": 3, "timeoutSecs": 15}`; missing fields take the firmware
/// defaults.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeConfig {
    /// Authenticated servers raced in Phase 1.
    pub roughtime_servers: Vec<RoughtimeServer>,
    /// NTP hosts sampled in order in Phase 2.
    pub ntp_servers: Vec<String>,
    /// Attempts per Roughtime server.
    pub attempts: usize,
    /// Per-attempt timeout. Also bounds each NTP sample.
    #[serde(rename = "timeoutSecs", with = "duration_secs")]
    pub timeout: Duration,
    /// Where diagnostics go. `None` uses the caller's current subscriber.
    #[serde(skip)]
    pub dispatch: Option<tracing::Dispatch>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            roughtime_servers: default_roughtime_servers(),
            ntp_servers: default_ntp_servers(),
            attempts: DEFAULT_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            dispatch: None,
        }
    }
}

impl TimeConfig {
    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<TimeConfig, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Route this configuration's diagnostics to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer};

    const ENGINE: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ENGINE.decode(&s).map_err(serde::de::Error::custom)
    }
}

mod base64_key {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use ttime_proto::PublicKey;

    const ENGINE: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

    pub fn serialize<S>(key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ENGINE.encode(key).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PublicKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = ENGINE.decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::invalid_length(bytes.len(), &"32 bytes"))
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
