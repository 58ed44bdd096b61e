// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

/*!
Trusted time for BMC firmware.

A BMC boots with no battery-backed clock it can trust. This crate obtains
an authenticated time from Roughtime servers, narrows it with NTP samples
that fall inside the authenticated window, and refuses to return anything
when no Roughtime server can vouch for the time.

# Example

```rust,no_run
#[tokio::main]
async fn main() -> Result<(), ttime_client::error::TimeError> {
    let config = ttime_client::TimeConfig::default();
    let trusted = ttime_client::acquire_time(&config).await?;
    println!("{:?} from {}", trusted.now(), trusted.source);
    Ok(())
}
```

Single queries, nonce chains and audit claims are available through
[`query`] and [`chain`].
*/

#![warn(missing_docs)]

/// Server lists and acquisition settings.
pub mod config;

/// Sequential chained queries and chain auditing.
///
/// Each request's nonce commits to the previous reply, so a verified chain
/// proves the order in which servers signed their times.
pub mod chain;

/// Two-phase fail-closed time acquisition.
pub mod consensus;

/// Error types.
pub mod error;

/// Single-server Roughtime queries.
pub mod query;

/// Retry and re-sync timing.
pub mod schedule;

/// SNTP client used for window refinement.
pub mod sntp;

pub use config::{RoughtimeServer, TimeConfig};
pub use consensus::{NtpSource, TimeSource, TrustedTime, acquire_time, acquire_time_with};
pub use error::TimeError;
pub use schedule::{Backoff, Schedule};
pub use sntp::SntpClient;
pub use ttime_proto::{RoughtimeResult, SignedTime};
