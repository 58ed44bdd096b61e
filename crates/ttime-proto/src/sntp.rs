// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Minimal SNTPv4 (RFC 4330) packet codec for unauthenticated time samples.
//!
//! Only the client side is implemented: build a 48-byte mode-3 request and
//! validate the mode-4 reply against it.

use core::fmt;
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use byteorder::{BE, ByteOrder};

/// Seconds from 1900-01-01 to the Unix epoch.
pub const EPOCH_DELTA: i64 = 2_208_988_800;

/// Seconds in one NTP era.
pub const ERA_SECONDS: i64 = 1 << 32;

/// Size of an NTP header without extensions.
pub const PACKET_SIZE: usize = 48;

const VERSION: u8 = 4;
const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;
const LEAP_UNSYNCHRONIZED: u8 = 3;
const FRACTION_SCALE: f64 = 4_294_967_296.0;

/// A 64-bit NTP timestamp: seconds since 1900 plus a 32-bit fraction.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct NtpTimestamp {
    /// Seconds since 1900-01-01, modulo the era.
    pub seconds: u32,
    /// Fraction of a second in units of 2^-32 s.
    pub fraction: u32,
}

impl NtpTimestamp {
    /// Whether both halves are zero.
    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }

    /// Seconds since the Unix epoch, picking the era closest to `pivot`.
    pub fn to_unix_seconds(&self, pivot: f64) -> f64 {
        let base = f64::from(self.seconds) + f64::from(self.fraction) / FRACTION_SCALE
            - EPOCH_DELTA as f64;
        let era = ((pivot - base) / ERA_SECONDS as f64).round();
        base + era * ERA_SECONDS as f64
    }
}

impl From<SystemTime> for NtpTimestamp {
    fn from(t: SystemTime) -> NtpTimestamp {
        let (secs, nanos) = match t.duration_since(UNIX_EPOCH) {
            Ok(d) => (d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => {
                let d = e.duration();
                let mut secs = -(d.as_secs() as i64);
                let mut nanos = d.subsec_nanos();
                if nanos > 0 {
                    secs -= 1;
                    nanos = 1_000_000_000 - nanos;
                }
                (secs, nanos)
            }
        };
        let seconds = (secs + EPOCH_DELTA).rem_euclid(ERA_SECONDS) as u32;
        let fraction = ((u64::from(nanos) << 32) / 1_000_000_000) as u32;
        NtpTimestamp { seconds, fraction }
    }
}

/// Validation failures for a server reply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SntpError {
    /// Fewer than [`PACKET_SIZE`] bytes.
    TooShort {
        /// Bytes received.
        len: usize,
    },
    /// The reply is not mode 4 (server).
    UnexpectedMode {
        /// The mode received.
        mode: u8,
    },
    /// Stratum 0 reply carrying a kiss code.
    KissOfDeath {
        /// The four-character code, e.g. `RATE`.
        code: [u8; 4],
    },
    /// The server advertises an unsynchronized clock.
    Unsynchronized,
    /// The origin timestamp does not echo our transmit timestamp.
    OriginMismatch,
    /// The server left its transmit timestamp zero.
    ZeroTransmit,
}

impl fmt::Display for SntpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SntpError::TooShort { len } => {
                write!(f, "NTP reply too short: {len} bytes, need {PACKET_SIZE}")
            }
            SntpError::UnexpectedMode { mode } => write!(f, "unexpected NTP mode {mode}"),
            SntpError::KissOfDeath { code } => {
                write!(f, "kiss-o'-death: {}", String::from_utf8_lossy(code))
            }
            SntpError::Unsynchronized => write!(f, "server clock is unsynchronized"),
            SntpError::OriginMismatch => {
                write!(f, "origin timestamp does not match request")
            }
            SntpError::ZeroTransmit => write!(f, "server transmit timestamp is zero"),
        }
    }
}

impl std::error::Error for SntpError {}

impl From<SntpError> for io::Error {
    fn from(err: SntpError) -> io::Error {
        let kind = match err {
            SntpError::TooShort { .. } => io::ErrorKind::UnexpectedEof,
            SntpError::KissOfDeath { .. } => io::ErrorKind::ConnectionRefused,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}

/// The fields of a server reply used to compute an offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SntpReply {
    /// Leap indicator.
    pub leap: u8,
    /// Protocol version.
    pub version: u8,
    /// Server stratum.
    pub stratum: u8,
    /// T1 as echoed by the server.
    pub origin: NtpTimestamp,
    /// T2, server receive time.
    pub receive: NtpTimestamp,
    /// T3, server transmit time.
    pub transmit: NtpTimestamp,
}

impl SntpReply {
    /// Clock offset in seconds given our receive time T4:
    /// `((T2 - T1) + (T3 - T4)) / 2`.
    pub fn offset(&self, destination: SystemTime) -> f64 {
        let t4 = unix_seconds(destination);
        let t1 = self.origin.to_unix_seconds(t4);
        let t2 = self.receive.to_unix_seconds(t4);
        let t3 = self.transmit.to_unix_seconds(t4);
        ((t2 - t1) + (t3 - t4)) / 2.0
    }

    /// Server time at `destination`, i.e. `T4 + offset`.
    pub fn server_time(&self, destination: SystemTime) -> SystemTime {
        let offset = self.offset(destination);
        let magnitude = Duration::from_secs_f64(offset.abs());
        if offset >= 0.0 {
            destination + magnitude
        } else {
            destination - magnitude
        }
    }
}

fn unix_seconds(t: SystemTime) -> f64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Build a client request whose transmit timestamp is `now`.
///
/// Returns the packet and the transmit timestamp the reply must echo.
pub fn build_request(now: SystemTime) -> ([u8; PACKET_SIZE], NtpTimestamp) {
    let transmit = NtpTimestamp::from(now);
    // Stratum, poll, precision, root delay, root dispersion, reference id,
    // and the reference, origin and receive timestamps stay zero.
    let mut buf = [0u8; PACKET_SIZE];
    buf[0] = VERSION << 3 | MODE_CLIENT;
    write_timestamp(&mut buf[40..48], transmit);
    (buf, transmit)
}

/// Parse and validate a reply to a request sent with `sent` as its transmit
/// timestamp. Bytes past the 48-byte header are ignored.
pub fn parse_reply(buf: &[u8], sent: NtpTimestamp) -> Result<SntpReply, SntpError> {
    let Some(header) = buf.get(..PACKET_SIZE) else {
        return Err(SntpError::TooShort { len: buf.len() });
    };

    let leap = header[0] >> 6;
    let version = (header[0] >> 3) & 0x07;
    let mode = header[0] & 0x07;
    let stratum = header[1];
    let mut reference_id = [0u8; 4];
    reference_id.copy_from_slice(&header[12..16]);
    let origin = read_timestamp(&header[24..32]);
    let receive = read_timestamp(&header[32..40]);
    let transmit = read_timestamp(&header[40..48]);

    if mode != MODE_SERVER {
        return Err(SntpError::UnexpectedMode { mode });
    }
    if stratum == 0 {
        return Err(SntpError::KissOfDeath { code: reference_id });
    }
    if leap == LEAP_UNSYNCHRONIZED {
        return Err(SntpError::Unsynchronized);
    }
    if origin != sent {
        return Err(SntpError::OriginMismatch);
    }
    if transmit.is_zero() {
        return Err(SntpError::ZeroTransmit);
    }

    Ok(SntpReply {
        leap,
        version,
        stratum,
        origin,
        receive,
        transmit,
    })
}

fn read_timestamp(buf: &[u8]) -> NtpTimestamp {
    NtpTimestamp {
        seconds: BE::read_u32(&buf[..4]),
        fraction: BE::read_u32(&buf[4..8]),
    }
}

fn write_timestamp(buf: &mut [u8], ts: NtpTimestamp) {
    BE::write_u32(&mut buf[..4], ts.seconds);
    BE::write_u32(&mut buf[4..8], ts.fraction);
}

/// Encode a server reply to `request`. Used by tests and local mock servers.
pub fn build_reply(
    request: &[u8],
    stratum: u8,
    receive: SystemTime,
    transmit: SystemTime,
) -> Result<[u8; PACKET_SIZE], SntpError> {
    let Some(request) = request.get(..PACKET_SIZE) else {
        return Err(SntpError::TooShort { len: request.len() });
    };
    let origin = read_timestamp(&request[40..48]);

    let mut buf = [0u8; PACKET_SIZE];
    buf[0] = VERSION << 3 | MODE_SERVER;
    buf[1] = stratum;
    write_timestamp(&mut buf[24..32], origin);
    write_timestamp(&mut buf[32..40], receive.into());
    write_timestamp(&mut buf[40..48], transmit.into());
    Ok(buf)
}
