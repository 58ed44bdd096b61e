// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

mod common;

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use common::{ScriptedNtp, midpoint, silent_server, spawn_server};
use ttime_client::error::{ConsensusError, TimeError};
use ttime_client::{RoughtimeServer, Schedule, TimeConfig, TimeSource, acquire_time_with};

fn config(roughtime_servers: Vec<RoughtimeServer>, ntp_servers: &[&str]) -> TimeConfig {
    TimeConfig {
        roughtime_servers,
        ntp_servers: ntp_servers.iter().map(|s| s.to_string()).collect(),
        attempts: 1,
        timeout: Duration::from_millis(200),
        dispatch: None,
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn distance(a: SystemTime, b: SystemTime) -> Duration {
    a.duration_since(b).unwrap_or_else(|e| e.duration())
}

#[tokio::test]
async fn test_ntp_sample_inside_window_wins() {
    let server = spawn_server("local").await;
    let ntp = ScriptedNtp::default().with("ntp-a", midpoint() + secs(9));
    let cfg = config(vec![server], &["ntp-a"]);

    let trusted = acquire_time_with(&cfg, &ntp).await.unwrap();
    assert_eq!(
        trusted.source,
        TimeSource::Ntp {
            server: "ntp-a".into()
        }
    );
    assert!(distance(trusted.time, midpoint() + secs(9)) < secs(1));
}

#[tokio::test]
async fn test_out_of_window_samples_skipped() {
    let server = spawn_server("local").await;
    let ntp = ScriptedNtp::default()
        .with("ahead", midpoint() + secs(15))
        .with("behind", midpoint() - secs(15))
        .with("good", midpoint() - secs(2));
    let cfg = config(vec![server], &["ahead", "unreachable", "behind", "good"]);

    let trusted = acquire_time_with(&cfg, &ntp).await.unwrap();
    assert_eq!(
        trusted.source,
        TimeSource::Ntp {
            server: "good".into()
        }
    );
}

#[tokio::test]
async fn test_falls_back_to_midpoint() {
    let server = spawn_server("local").await;
    let ntp = ScriptedNtp::default()
        .with("ahead", midpoint() + secs(15))
        .with("behind", midpoint() - secs(15));
    let cfg = config(vec![server], &["ahead", "behind"]);

    let trusted = acquire_time_with(&cfg, &ntp).await.unwrap();
    assert_eq!(trusted.time, midpoint());
    assert_eq!(
        trusted.source,
        TimeSource::Roughtime {
            server: "local".into(),
        }
    );
}

#[tokio::test]
async fn test_one_good_server_is_enough() {
    let (silent_a, _a) = silent_server("silent-a").await;
    let (silent_b, _b) = silent_server("silent-b").await;
    let good = spawn_server("good").await;
    let cfg = config(vec![silent_a, good, silent_b], &[]);

    let trusted = acquire_time_with(&cfg, &ScriptedNtp::default())
        .await
        .unwrap();
    assert_eq!(trusted.time, midpoint());
    assert!(matches!(
        trusted.source,
        TimeSource::Roughtime { ref server, .. } if server == "good"
    ));
}

#[tokio::test]
async fn test_all_servers_fail() {
    let (a, _a) = silent_server("silent-a").await;
    let (b, _b) = silent_server("silent-b").await;
    let ntp = ScriptedNtp::default().with("ntp", midpoint());
    let cfg = config(vec![a, b], &["ntp"]);

    let err = acquire_time_with(&cfg, &ntp).await.unwrap_err();
    assert!(matches!(
        err,
        TimeError::Consensus(ConsensusError::NoAuthenticatedTime { attempted: 2 })
    ));
}

#[tokio::test]
async fn test_no_servers() {
    let cfg = config(Vec::new(), &["ntp"]);
    let err = acquire_time_with(&cfg, &ScriptedNtp::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TimeError::Consensus(ConsensusError::NoServers)
    ));
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_diagnostics_go_to_configured_dispatch() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let (silent, _sock) = silent_server("silent").await;
    let cfg = config(vec![silent], &[]).with_dispatch(tracing::Dispatch::new(subscriber));
    let _ = acquire_time_with(&cfg, &ScriptedNtp::default()).await;

    let logged = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert!(logged.contains("roughtime query failed"), "logged: {logged}");
    assert!(logged.contains("silent"), "logged: {logged}");
}

#[tokio::test]
async fn test_schedule_returns_authenticated_time() {
    let server = spawn_server("local").await;
    let ntp = ScriptedNtp::default();
    let cfg = config(vec![server], &[]);

    let mut schedule = Schedule::default();
    let trusted = schedule.acquire_until_success(&cfg, &ntp).await;
    assert_eq!(
        trusted.source,
        TimeSource::Roughtime {
            server: "local".into()
        }
    );
    assert!(distance(trusted.time, midpoint()) < secs(1));
    assert_eq!(schedule.retry.attempt(), 0);
}
