// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers: local Roughtime servers and a scripted NTP source.

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use ttime_client::config::RoughtimeServer;
use ttime_client::error::NtpError;
use ttime_client::NtpSource;
use ttime_server::server::{FixedClock, RoughtimeServer as Server, ServerIdentity};

/// Midpoint served by test servers, in microseconds since the epoch.
pub const NOW: u64 = 1_700_000_000_000_000;

/// Radius served by test servers: 10 s.
pub const RADIUS: u32 = 10_000_000;

/// `NOW` as a `SystemTime`.
pub fn midpoint() -> SystemTime {
    UNIX_EPOCH + Duration::from_micros(NOW)
}

/// Spawn a local server answering with `NOW ± RADIUS` and return a client
/// configuration entry for it.
pub async fn spawn_server(name: &str) -> RoughtimeServer {
    spawn_server_at(name, NOW).await
}

/// Spawn a local server whose clock is frozen at `now`.
pub async fn spawn_server_at(name: &str, now: u64) -> RoughtimeServer {
    let identity = ServerIdentity::generate(0, u64::MAX).expect("identity");
    let root = identity.root_public_key();
    let server = Server::builder()
        .listen("127.0.0.1:0")
        .identity(identity)
        .clock(FixedClock(now))
        .radius(RADIUS)
        .build()
        .await
        .expect("bind test server");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    RoughtimeServer::new(name, root, addr.to_string())
}

/// A configuration entry pointing at a socket that never answers.
///
/// The socket is returned so it stays bound for the test's lifetime.
pub async fn silent_server(name: &str) -> (RoughtimeServer, tokio::net::UdpSocket) {
    let sock = tokio::net::UdpSocket::bind("127.0.0.1:0").await.expect("bind");
    let addr = sock.local_addr().expect("local addr");
    (RoughtimeServer::new(name, [7u8; 32], addr.to_string()), sock)
}

/// An NTP source answering from a fixed table; unknown servers time out.
#[derive(Default)]
pub struct ScriptedNtp {
    samples: HashMap<String, SystemTime>,
}

impl ScriptedNtp {
    pub fn with(mut self, server: &str, time: SystemTime) -> Self {
        self.samples.insert(server.to_string(), time);
        self
    }
}

#[async_trait]
impl NtpSource for ScriptedNtp {
    async fn sample(&self, server: &str) -> Result<SystemTime, NtpError> {
        self.samples.get(server).copied().ok_or(NtpError::Timeout)
    }
}
