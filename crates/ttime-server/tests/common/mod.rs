// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared test helpers for server integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use ttime_proto::PublicKey;
use ttime_server::server::{RoughtimeServerBuilder, ServerIdentity};

/// Midpoint served by test servers, in microseconds since the epoch.
pub(crate) const NOW: u64 = 1_700_000_000_000_000;

/// Spawn a server on an ephemeral loopback port with a fresh identity.
///
/// Returns the bound address and the root key clients must trust.
pub(crate) async fn spawn_test_server(builder: RoughtimeServerBuilder) -> (SocketAddr, PublicKey) {
    let identity = ServerIdentity::generate(0, u64::MAX).expect("failed to generate identity");
    let root = identity.root_public_key();
    let server = builder
        .listen("127.0.0.1:0")
        .identity(identity)
        .build()
        .await
        .expect("failed to bind test server");
    let addr = server.local_addr().expect("failed to get local addr");
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, root)
}

/// A client socket connected to `server`.
pub(crate) async fn client_socket(server: SocketAddr) -> UdpSocket {
    let sock = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
    sock.connect(server).await.expect("connect");
    sock
}

/// Receive one datagram or fail after a second.
pub(crate) async fn recv_reply(sock: &UdpSocket) -> Option<Vec<u8>> {
    let mut buf = [0u8; 4096];
    match tokio::time::timeout(Duration::from_secs(1), sock.recv(&mut buf)).await {
        Ok(Ok(n)) => Some(buf[..n].to_vec()),
        _ => None,
    }
}
