// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Fail-closed time acquisition.
//!
//! Acquisition runs in two phases:
//!
//! 1. **Authenticate.** Every configured Roughtime server is queried
//!    concurrently. The first verified reply wins and fixes the window
//!    `[midpoint - radius, midpoint + radius]`. If no server answers with a
//!    valid reply the call fails; an unauthenticated time is never returned.
//! 2. **Refine.** NTP servers are asked in order. Each sample is rewound to
//!    the instant of the Roughtime measurement and accepted if it falls inside
//!    the window. With no acceptable sample the Roughtime midpoint is used.
//!
//! Losing Roughtime queries are not cancelled; they finish on their own
//! attempt budget and their results are dropped with the channel.

use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};
use ttime_proto::{RoughtimeResult, SignedTime};

use crate::config::{RoughtimeServer, TimeConfig};
use crate::error::{ConsensusError, NtpError, TimeError};
use crate::query;
use crate::sntp::SntpClient;

/// A source of unauthenticated NTP time samples.
///
/// [`SntpClient`] is the network implementation; tests and firmware
/// integrations can supply their own.
#[async_trait]
pub trait NtpSource: Send + Sync {
    /// Ask `server` for its current time.
    async fn sample(&self, server: &str) -> Result<SystemTime, NtpError>;
}

/// Which source supplied a [`TrustedTime`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeSource {
    /// The authenticated Roughtime midpoint.
    Roughtime {
        /// Name of the winning server.
        server: String,
    },
    /// An NTP sample that fell inside the authenticated window.
    Ntp {
        /// The NTP server queried.
        server: String,
    },
}

impl fmt::Display for TimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSource::Roughtime { server } => write!(f, "roughtime {server}"),
            TimeSource::Ntp { server } => write!(f, "ntp {server}"),
        }
    }
}

/// The result of [`acquire_time`].
#[derive(Clone, Debug)]
pub struct TrustedTime {
    /// Wall-clock time at `measured_at`.
    pub time: SystemTime,
    /// Monotonic instant `time` refers to.
    pub measured_at: Instant,
    /// Where `time` came from.
    pub source: TimeSource,
}

impl TrustedTime {
    /// `time` advanced by the monotonic time elapsed since `measured_at`.
    pub fn now(&self) -> SystemTime {
        self.time + self.measured_at.elapsed()
    }
}

/// Acquire trusted time using the network [`SntpClient`] for refinement.
pub async fn acquire_time(config: &TimeConfig) -> Result<TrustedTime, TimeError> {
    let ntp = SntpClient::new(config.timeout);
    acquire_time_with(config, &ntp).await
}

/// Acquire trusted time with a caller-supplied NTP source.
///
/// Diagnostics go to `config.dispatch` when set, otherwise to the caller's
/// current subscriber.
pub async fn acquire_time_with<N>(config: &TimeConfig, ntp: &N) -> Result<TrustedTime, TimeError>
where
    N: NtpSource + ?Sized,
{
    match &config.dispatch {
        Some(dispatch) => acquire(config, ntp).with_subscriber(dispatch.clone()).await,
        None => acquire(config, ntp).await,
    }
}

async fn acquire<N>(config: &TimeConfig, ntp: &N) -> Result<TrustedTime, TimeError>
where
    N: NtpSource + ?Sized,
{
    let authenticated = authenticate(config).await?;
    let signed = authenticated.result.signed_time();
    let window = Window::around(&signed);
    info!(
        server = %authenticated.server.name,
        time = %authenticated.result,
        "authenticated time"
    );

    if let Some(trusted) = refine(&config.ntp_servers, ntp, &window, authenticated.at).await {
        return Ok(trusted);
    }

    info!(
        radius = signed.radius,
        "no ntp sample inside the window, using roughtime midpoint"
    );
    Ok(TrustedTime {
        time: signed.midpoint_time(),
        measured_at: authenticated.at,
        source: TimeSource::Roughtime {
            server: authenticated.server.name,
        },
    })
}

struct Authenticated {
    server: RoughtimeServer,
    result: RoughtimeResult,
    at: Instant,
}

type RaceOutcome = (RoughtimeServer, Result<RoughtimeResult, TimeError>, Instant);

async fn authenticate(config: &TimeConfig) -> Result<Authenticated, TimeError> {
    let servers = &config.roughtime_servers;
    if servers.is_empty() {
        return Err(ConsensusError::NoServers.into());
    }

    // Capacity covers every sender, so no task ever blocks on send.
    let (tx, mut rx) = mpsc::channel::<RaceOutcome>(servers.len());
    for server in servers.iter().cloned() {
        let tx = tx.clone();
        let attempts = config.attempts;
        let timeout = config.timeout;
        tokio::spawn(
            async move {
                let outcome = query::async_get(&server, attempts, timeout, None).await;
                let _ = tx.send((server, outcome, Instant::now())).await;
            }
            .with_current_subscriber(),
        );
    }
    drop(tx);

    while let Some((server, outcome, at)) = rx.recv().await {
        match outcome {
            Ok(result) => return Ok(Authenticated { server, result, at }),
            Err(e) => warn!(server = %server.name, error = %e, "roughtime query failed"),
        }
    }

    Err(ConsensusError::NoAuthenticatedTime {
        attempted: servers.len(),
    }
    .into())
}

/// Inclusive bounds `[midpoint - radius, midpoint + radius]`.
#[derive(Clone, Copy, Debug)]
struct Window {
    earliest: SystemTime,
    latest: SystemTime,
}

impl Window {
    fn around(time: &SignedTime) -> Window {
        let midpoint = time.midpoint_time();
        let radius = time.radius_duration();
        Window {
            earliest: midpoint.checked_sub(radius).unwrap_or(UNIX_EPOCH),
            latest: midpoint + radius,
        }
    }

    fn contains(&self, t: SystemTime) -> bool {
        self.earliest <= t && t <= self.latest
    }
}

fn rewind(t: SystemTime, by: Duration) -> SystemTime {
    t.checked_sub(by).unwrap_or(UNIX_EPOCH)
}

async fn refine<N>(
    servers: &[String],
    ntp: &N,
    window: &Window,
    measured_at: Instant,
) -> Option<TrustedTime>
where
    N: NtpSource + ?Sized,
{
    for server in servers {
        let sample = match ntp.sample(server).await {
            Ok(t) => t,
            Err(e) => {
                warn!(server = %server, error = %e, "ntp query failed");
                continue;
            }
        };
        let adjusted = rewind(sample, measured_at.elapsed());
        if !window.contains(adjusted) {
            warn!(
                server = %server,
                sample = ?adjusted,
                earliest = ?window.earliest,
                latest = ?window.latest,
                "ntp sample outside roughtime window"
            );
            continue;
        }
        debug!(server = %server, "ntp sample accepted");
        return Some(TrustedTime {
            time: adjusted,
            measured_at,
            source: TimeSource::Ntp {
                server: server.clone(),
            },
        });
    }
    None
}
