// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Unauthenticated NTP samples over tokio UDP.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::debug;
use ttime_proto::sntp::{self, PACKET_SIZE};

use crate::consensus::NtpSource;
use crate::error::NtpError;
use crate::query::bind_addr_for;

/// Default NTP port.
pub const DEFAULT_PORT: u16 = 123;

/// Default per-sample timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// A one-shot SNTP client.
#[derive(Clone, Copy, Debug)]
pub struct SntpClient {
    timeout: Duration,
}

impl Default for SntpClient {
    fn default() -> Self {
        SntpClient::new(DEFAULT_TIMEOUT)
    }
}

impl SntpClient {
    /// A client that waits up to `timeout` for each reply.
    pub fn new(timeout: Duration) -> Self {
        SntpClient { timeout }
    }

    /// Ask `server` for the time. A bare host or IP gets port 123.
    pub async fn query_time(&self, server: &str) -> Result<SystemTime, NtpError> {
        tokio::time::timeout(self.timeout, self.exchange(server))
            .await
            .map_err(|_| NtpError::Timeout)?
    }

    async fn exchange(&self, server: &str) -> Result<SystemTime, NtpError> {
        let addr = resolve(server).await?;
        let sock = tokio::net::UdpSocket::bind(bind_addr_for(&addr)).await?;
        sock.connect(addr).await?;

        let (request, sent) = sntp::build_request(SystemTime::now());
        sock.send(&request).await?;

        let mut buf = [0u8; PACKET_SIZE * 2];
        let n = sock.recv(&mut buf).await?;
        let destination = SystemTime::now();
        let reply = sntp::parse_reply(&buf[..n], sent)?;
        debug!(server, %addr, stratum = reply.stratum, offset = reply.offset(destination), "ntp reply");
        Ok(reply.server_time(destination))
    }
}

async fn resolve(server: &str) -> Result<SocketAddr, NtpError> {
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }
    let target = match server.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => server.to_string(),
        _ => format!("{server}:{DEFAULT_PORT}"),
    };
    tokio::net::lookup_host(target)
        .await?
        .next()
        .ok_or_else(|| NtpError::NoAddresses {
            server: server.to_string(),
        })
}

#[async_trait]
impl NtpSource for SntpClient {
    async fn sample(&self, server: &str) -> Result<SystemTime, NtpError> {
        self.query_time(server).await
    }
}
