// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Single-server Roughtime queries.
//!
//! A query builds a 1024-byte request (chained off a previous reply when one
//! is given), sends it over UDP up to `attempts` times with a fresh socket per
//! attempt, stops at the first datagram received, and verifies that datagram
//! against the server's root key.
//!
//! ```no_run
//! # fn example() -> Result<(), ttime_client::error::TimeError> {
//! use std::time::Duration;
//! use ttime_client::config::default_roughtime_servers;
//! use ttime_client::query;
//!
//! let server = &default_roughtime_servers()[0];
//! let first = query::get(server, 3, Duration::from_secs(1), None)?;
//! let second = query::get(server, 3, Duration::from_secs(1), Some(&first))?;
//! println!("{first} then {second}");
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tracing::debug;
use ttime_proto::request::{Request, create_request};
use ttime_proto::{RoughtimeResult, verify_reply};

use crate::config::RoughtimeServer;
use crate::error::{NetworkError, TimeError};

/// Largest reply accepted.
const RECV_BUF_SIZE: usize = 4096;

/// Wildcard bind address matching the target's address family.
pub(crate) fn bind_addr_for(target: &SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}

fn udp_address(server: &RoughtimeServer) -> Result<&str, NetworkError> {
    server.udp_address().ok_or_else(|| NetworkError::NoUdpAddress {
        server: server.name.clone(),
    })
}

/// Resolve the server's first UDP address.
pub fn resolve(server: &RoughtimeServer) -> Result<SocketAddr, NetworkError> {
    let address = udp_address(server)?;
    address
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| NetworkError::NoAddresses {
            address: address.to_string(),
        })
}

/// Resolve the server's first UDP address without blocking the runtime.
pub async fn async_resolve(server: &RoughtimeServer) -> Result<SocketAddr, NetworkError> {
    let address = udp_address(server)?;
    tokio::net::lookup_host(address)
        .await?
        .next()
        .ok_or_else(|| NetworkError::NoAddresses {
            address: address.to_string(),
        })
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Query one server, blocking for at most `attempts × timeout`.
pub fn get(
    server: &RoughtimeServer,
    attempts: usize,
    timeout: Duration,
    prev: Option<&RoughtimeResult>,
) -> Result<RoughtimeResult, TimeError> {
    let request = create_request(prev_reply(prev))?;
    let addr = resolve(server)?;

    let mut recv_buf = [0u8; RECV_BUF_SIZE];
    let mut reply = None;
    for attempt in 1..=attempts {
        let sock = UdpSocket::bind(bind_addr_for(&addr)).map_err(NetworkError::Io)?;
        sock.connect(addr).map_err(NetworkError::Io)?;
        sock.set_read_timeout(Some(timeout)).map_err(NetworkError::Io)?;
        sock.send(&request.bytes).map_err(NetworkError::Io)?;

        match sock.recv(&mut recv_buf) {
            Ok(n) => {
                debug!(server = %server.name, %addr, attempt, bytes = n, "roughtime reply");
                reply = Some(recv_buf[..n].to_vec());
                break;
            }
            Err(e) if is_timeout(&e) => {
                debug!(server = %server.name, %addr, attempt, "roughtime attempt timed out");
            }
            Err(e) => return Err(NetworkError::Io(e).into()),
        }
    }

    let reply = reply.ok_or(NetworkError::NoReply { attempts })?;
    finish(server, request, reply)
}

/// Query one server on the tokio runtime.
///
/// Same contract as [`get`]; each attempt is bounded by
/// `tokio::time::timeout`.
pub async fn async_get(
    server: &RoughtimeServer,
    attempts: usize,
    timeout: Duration,
    prev: Option<&RoughtimeResult>,
) -> Result<RoughtimeResult, TimeError> {
    let request = create_request(prev_reply(prev))?;
    let addr = async_resolve(server).await?;

    let mut recv_buf = [0u8; RECV_BUF_SIZE];
    let mut reply = None;
    for attempt in 1..=attempts {
        let sock = tokio::net::UdpSocket::bind(bind_addr_for(&addr))
            .await
            .map_err(NetworkError::Io)?;
        sock.connect(addr).await.map_err(NetworkError::Io)?;
        sock.send(&request.bytes).await.map_err(NetworkError::Io)?;

        match tokio::time::timeout(timeout, sock.recv(&mut recv_buf)).await {
            Ok(Ok(n)) => {
                debug!(server = %server.name, %addr, attempt, bytes = n, "roughtime reply");
                reply = Some(recv_buf[..n].to_vec());
                break;
            }
            Ok(Err(e)) if is_timeout(&e) => {
                debug!(server = %server.name, %addr, attempt, "roughtime attempt timed out");
            }
            Ok(Err(e)) => return Err(NetworkError::Io(e).into()),
            Err(_) => {
                debug!(server = %server.name, %addr, attempt, "roughtime attempt timed out");
            }
        }
    }

    let reply = reply.ok_or(NetworkError::NoReply { attempts })?;
    finish(server, request, reply)
}

fn prev_reply(prev: Option<&RoughtimeResult>) -> &[u8] {
    prev.map(|p| p.response.as_slice()).unwrap_or_default()
}

fn finish(
    server: &RoughtimeServer,
    request: Request,
    reply: Vec<u8>,
) -> Result<RoughtimeResult, TimeError> {
    let time = verify_reply(&reply, &server.public_key, &request.nonce)?;
    Ok(RoughtimeResult {
        request: request.bytes,
        blind: request.blind,
        response: reply,
        midpoint: time.midpoint,
        radius: time.radius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerAddress;

    fn server(protocol: &str, address: &str) -> RoughtimeServer {
        RoughtimeServer {
            addresses: vec![ServerAddress {
                protocol: protocol.to_string(),
                address: address.to_string(),
            }],
            ..RoughtimeServer::new("test", [0u8; 32], "unused")
        }
    }

    #[test]
    fn test_bind_addr_matches_family() {
        let v4: SocketAddr = "192.0.2.1:2002".parse().unwrap();
        let v6: SocketAddr = "[2001:db8::1]:2002".parse().unwrap();
        assert!(bind_addr_for(&v4).is_ipv4());
        assert!(bind_addr_for(&v6).is_ipv6());
    }

    #[test]
    fn test_resolve_literal() {
        let addr = resolve(&server("udp4", "127.0.0.1:2002")).unwrap();
        assert_eq!(addr, "127.0.0.1:2002".parse().unwrap());
    }

    #[test]
    fn test_resolve_without_udp_address() {
        assert!(matches!(
            resolve(&server("tcp", "127.0.0.1:2002")),
            Err(NetworkError::NoUdpAddress { .. })
        ));
    }

    #[test]
    fn test_no_reply_after_attempts() {
        // A bound socket that never answers.
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = silent.local_addr().unwrap().to_string();
        let result = get(&server("udp", &addr), 2, Duration::from_millis(50), None);
        assert!(matches!(
            result,
            Err(TimeError::Network(NetworkError::NoReply { attempts: 2 }))
        ));
    }

    #[test]
    fn test_zero_attempts() {
        let result = get(
            &server("udp", "127.0.0.1:9"),
            0,
            Duration::from_millis(50),
            None,
        );
        assert!(matches!(
            result,
            Err(TimeError::Network(NetworkError::NoReply { attempts: 0 }))
        ));
    }

    #[tokio::test]
    async fn test_async_no_reply() {
        let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap().to_string();
        let result = async_get(&server("udp", &addr), 1, Duration::from_millis(50), None).await;
        assert!(matches!(
            result,
            Err(TimeError::Network(NetworkError::NoReply { attempts: 1 }))
        ));
    }
}
