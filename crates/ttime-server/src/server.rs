// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Batching Roughtime server using the Tokio runtime.
//!
//! Each pass of the receive loop waits for one datagram, then drains whatever
//! else is already queued on the socket (up to the configured batch size)
//! and answers the whole batch with a single Merkle tree and one signature.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> std::io::Result<()> {
//! use ttime_server::server::{RoughtimeServer, ServerIdentity};
//!
//! let identity = ServerIdentity::generate(0, u64::MAX)?;
//! println!("root key: {:02x?}", identity.root_public_key());
//!
//! let server = RoughtimeServer::builder()
//!     .listen("[::]:2002")
//!     .identity(identity)
//!     .build()
//!     .await?;
//!
//! server.run().await
//! # }
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ring::signature::Ed25519KeyPair;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};
use ttime_proto::crypto::{generate_key_pair, public_key};
use ttime_proto::delegation::OnlineKey;
use ttime_proto::reply::create_replies;
use ttime_proto::request::parse_request;
use ttime_proto::{Nonce, PublicKey};

use crate::error::{ConfigError, ServerError};

/// Standard Roughtime port.
pub const DEFAULT_PORT: u16 = 2002;

/// Default uncertainty radius in microseconds.
pub const DEFAULT_RADIUS: u32 = 1_000_000;

/// Default maximum number of requests signed together.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 64;

const RECV_BUF_SIZE: usize = 2048;

/// The server's notion of the current time.
pub trait Clock: Send + Sync {
    /// Microseconds since the Unix epoch.
    fn now_micros(&self) -> u64;
}

/// The host's wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }
}

/// A clock frozen at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_micros(&self) -> u64 {
        self.0
    }
}

/// A root key together with an online key it has certified.
pub struct ServerIdentity {
    root: Ed25519KeyPair,
    online: OnlineKey,
}

impl ServerIdentity {
    /// Generate a fresh root key and an online key valid for
    /// `[min_time, max_time]` (microseconds since the epoch).
    pub fn generate(min_time: u64, max_time: u64) -> Result<ServerIdentity, ServerError> {
        let root = generate_key_pair()?;
        let online = OnlineKey::generate(&root, min_time, max_time)?;
        Ok(ServerIdentity { root, online })
    }

    /// The key clients must be configured with.
    pub fn root_public_key(&self) -> PublicKey {
        public_key(&self.root)
    }

    /// Issue another online key from the same root.
    pub fn rotate(&self, min_time: u64, max_time: u64) -> Result<OnlineKey, ServerError> {
        Ok(OnlineKey::generate(&self.root, min_time, max_time)?)
    }

    /// The current online key.
    pub fn online_key(&self) -> &OnlineKey {
        &self.online
    }
}

impl core::fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServerIdentity")
            .field("root_public_key", &self.root_public_key())
            .field("online", &self.online)
            .finish()
    }
}

/// Builder for configuring and creating a [`RoughtimeServer`].
pub struct RoughtimeServerBuilder {
    listen_addr: String,
    online_key: Option<OnlineKey>,
    root_public_key: Option<PublicKey>,
    radius: u32,
    clock: Arc<dyn Clock>,
    max_batch_size: usize,
}

impl RoughtimeServerBuilder {
    fn new() -> Self {
        RoughtimeServerBuilder {
            listen_addr: format!("[::]:{DEFAULT_PORT}"),
            online_key: None,
            root_public_key: None,
            radius: DEFAULT_RADIUS,
            clock: Arc::new(SystemClock),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Address to bind, e.g. `"127.0.0.1:0"`.
    pub fn listen(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// The delegated key that signs replies.
    pub fn online_key(mut self, key: OnlineKey) -> Self {
        self.online_key = Some(key);
        self
    }

    /// The root key advertised through [`RoughtimeServer::public_key`].
    pub fn root_public_key(mut self, key: PublicKey) -> Self {
        self.root_public_key = Some(key);
        self
    }

    /// Use `identity`'s online key and advertise its root key.
    pub fn identity(self, identity: ServerIdentity) -> Self {
        let root = identity.root_public_key();
        self.root_public_key(root).online_key(identity.online)
    }

    /// Uncertainty radius in microseconds.
    pub fn radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    /// Time source for signed midpoints.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Maximum number of requests answered with one signature.
    pub fn max_batch_size(mut self, n: usize) -> Self {
        self.max_batch_size = n;
        self
    }

    /// Build the server. Binds to the configured listen address.
    pub async fn build(self) -> io::Result<RoughtimeServer> {
        let online_key = self
            .online_key
            .ok_or(ServerError::Config(ConfigError::MissingOnlineKey))?;
        if self.max_batch_size == 0 {
            return Err(ServerError::from(ConfigError::InvalidBatchSize).into());
        }

        let now = self.clock.now_micros();
        if now < online_key.min_time() || now > online_key.max_time() {
            warn!(
                now,
                min_time = online_key.min_time(),
                max_time = online_key.max_time(),
                "clock is outside the online key's delegation window"
            );
        }

        let sock = UdpSocket::bind(&self.listen_addr).await?;
        info!(addr = %sock.local_addr()?, "roughtime server listening");

        Ok(RoughtimeServer {
            sock,
            online_key,
            root_public_key: self.root_public_key,
            radius: self.radius,
            clock: self.clock,
            max_batch_size: self.max_batch_size,
        })
    }
}

/// A Roughtime server answering batched requests.
///
/// Created via [`RoughtimeServer::builder()`]. Call
/// [`run()`](RoughtimeServer::run) to start serving.
pub struct RoughtimeServer {
    sock: UdpSocket,
    online_key: OnlineKey,
    root_public_key: Option<PublicKey>,
    radius: u32,
    clock: Arc<dyn Clock>,
    max_batch_size: usize,
}

impl RoughtimeServer {
    /// Create a builder for configuring the server.
    pub fn builder() -> RoughtimeServerBuilder {
        RoughtimeServerBuilder::new()
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    /// The advertised root public key, if one was configured.
    pub fn public_key(&self) -> Option<PublicKey> {
        self.root_public_key
    }

    /// Run the server, answering requests indefinitely.
    ///
    /// Returns only on a socket receive error.
    pub async fn run(self) -> io::Result<()> {
        let mut recv_buf = [0u8; RECV_BUF_SIZE];
        let mut batch = Vec::with_capacity(self.max_batch_size);

        loop {
            let (len, src) = self.sock.recv_from(&mut recv_buf).await?;
            self.accept(&recv_buf[..len], src, &mut batch);

            let mut received = 1;
            while received < self.max_batch_size {
                match self.sock.try_recv_from(&mut recv_buf) {
                    Ok((len, src)) => {
                        received += 1;
                        self.accept(&recv_buf[..len], src, &mut batch);
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => return Err(e),
                }
            }

            for (reply, dst) in self.respond(&batch) {
                if let Err(e) = self.sock.send_to(&reply, dst).await {
                    debug!(%dst, error = %e, "send failed");
                }
            }
            batch.clear();
        }
    }

    fn accept(&self, datagram: &[u8], src: SocketAddr, batch: &mut Vec<(Nonce, SocketAddr)>) {
        match parse_request(datagram) {
            Ok(nonce) => batch.push((nonce, src)),
            Err(e) => debug!(%src, len = datagram.len(), error = %e, "dropped request"),
        }
    }

    fn respond(&self, batch: &[(Nonce, SocketAddr)]) -> Vec<(Vec<u8>, SocketAddr)> {
        if batch.is_empty() {
            return Vec::new();
        }
        let nonces: Vec<Nonce> = batch.iter().map(|(nonce, _)| *nonce).collect();
        let midpoint = self.clock.now_micros();
        match create_replies(
            &nonces,
            midpoint,
            self.radius,
            self.online_key.certificate(),
            self.online_key.key_pair(),
        ) {
            Ok(replies) => {
                debug!(batch = batch.len(), midpoint, "signed batch");
                replies
                    .into_iter()
                    .zip(batch.iter().map(|(_, src)| *src))
                    .collect()
            }
            Err(e) => {
                warn!(batch = batch.len(), error = %e, "failed to sign batch");
                Vec::new()
            }
        }
    }
}
