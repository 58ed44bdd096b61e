// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Local Roughtime server for testing BMC time acquisition.
//!
//! Run with: `cargo run -p ttime-server --example test_server`
//!
//! Prints the root public key clients must be configured with.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ttime_server::server::{RoughtimeServer, ServerIdentity};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let identity = ServerIdentity::generate(0, u64::MAX)?;
    let root: String = identity
        .root_public_key()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();

    let server = RoughtimeServer::builder()
        .listen("127.0.0.1:2002")
        .identity(identity)
        .build()
        .await?;

    println!("root public key (hex): {root}");
    println!("listening on {}", server.local_addr()?);

    server.run().await
}
