// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Chained query sequences and their audit.
//!
//! Each request in a sequence derives its nonce from the previous successful
//! reply, so a [`Chain`] proves the order in which servers answered. A server
//! that signs a time earlier than one it must have followed is caught by
//! [`Chain::inconsistencies`], and the evidence can be exported with
//! [`Chain::to_claim`] for anyone to re-check with [`ChainClaim::verify`].

use std::time::{Duration, Instant, SystemTime};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ttime_proto::request::{calculate_chain_nonce, parse_request};
use ttime_proto::types::{BLIND_SIZE, NONCE_SIZE, PUBLIC_KEY_SIZE};
use ttime_proto::{PublicKey, RoughtimeResult, SignedTime, verify_reply};

use crate::config::{KEY_TYPE_ED25519, RoughtimeServer};
use crate::error::{ChainError, ChainErrorKind, ConsensusError, TimeError};
use crate::query;

/// The outcome of one query in a sequence.
#[derive(Debug)]
pub struct QueryResult {
    /// The server queried.
    pub server: RoughtimeServer,
    /// The verified result or the reason the query failed.
    pub outcome: Result<RoughtimeResult, TimeError>,
    /// Wall time spent on the query.
    pub delay: Duration,
}

/// Query `servers` in order, chaining each request off the last successful
/// reply (starting from `prev`). Failures are recorded and skipped.
pub fn query_sequence(
    servers: &[RoughtimeServer],
    attempts: usize,
    timeout: Duration,
    prev: Option<&RoughtimeResult>,
) -> Vec<QueryResult> {
    let mut last = prev.cloned();
    let mut results = Vec::with_capacity(servers.len());
    for server in servers {
        let start = Instant::now();
        let outcome = query::get(server, attempts, timeout, last.as_ref());
        let delay = start.elapsed();
        match &outcome {
            Ok(result) => {
                info!(server = %server.name, %result, ?delay, "roughtime");
                last = Some(result.clone());
            }
            Err(e) => warn!(server = %server.name, error = %e, "skipped server"),
        }
        results.push(QueryResult {
            server: server.clone(),
            outcome,
            delay,
        });
    }
    results
}

/// Mean offset of the accepted results from `t0`, in seconds.
///
/// Results whose radius exceeds `radius_threshold` are ignored. Each accepted
/// time is corrected by the query delay accumulated up to and including its
/// own query.
pub fn average_delta(
    results: &[QueryResult],
    t0: SystemTime,
    radius_threshold: Duration,
) -> Result<f64, ConsensusError> {
    let mut delay = Duration::ZERO;
    let mut total = 0.0;
    let mut count = 0u32;
    for res in results {
        delay += res.delay;
        let Ok(result) = &res.outcome else {
            continue;
        };
        let (t, radius) = result.now();
        if radius > radius_threshold {
            continue;
        }
        total += signed_seconds(t, t0) - delay.as_secs_f64();
        count += 1;
    }

    if count == 0 {
        return Err(ConsensusError::NoAuthenticatedTime {
            attempted: results.len(),
        });
    }
    Ok(total / f64::from(count))
}

fn signed_seconds(t: SystemTime, t0: SystemTime) -> f64 {
    match t.duration_since(t0) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// A successful query and the server that answered it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainLink {
    /// The server that signed the reply.
    pub server: RoughtimeServer,
    /// The exchange.
    pub result: RoughtimeResult,
}

/// Adjacent links whose uncertainty intervals do not overlap, with the later
/// link's interval entirely before the earlier one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Inconsistency {
    /// Index of the earlier link.
    pub earlier: usize,
    /// Index of the later link.
    pub later: usize,
}

/// The successful queries of a sequence, in query order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Chain {
    links: Vec<ChainLink>,
}

impl Chain {
    /// Keep the successful results, preserving their order.
    pub fn new<'a>(results: impl IntoIterator<Item = &'a QueryResult>) -> Chain {
        let links = results
            .into_iter()
            .filter_map(|r| {
                r.outcome.as_ref().ok().map(|result| ChainLink {
                    server: r.server.clone(),
                    result: result.clone(),
                })
            })
            .collect();
        Chain { links }
    }

    /// The links in order.
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no query succeeded.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Re-verify every link.
    ///
    /// Each link's nonce is recomputed from the previous link's reply (or
    /// `seed`'s reply, or nothing, for the first link) and its own blind; the
    /// reply must verify under the link's server key and carry exactly the
    /// recorded time.
    pub fn verify(&self, seed: Option<&RoughtimeResult>) -> Result<(), ChainError> {
        let mut prev_reply: &[u8] = seed.map(|s| s.response.as_slice()).unwrap_or_default();
        for (link, entry) in self.links.iter().enumerate() {
            let nonce = calculate_chain_nonce(prev_reply, &entry.result.blind);
            let verified = verify_reply(&entry.result.response, &entry.server.public_key, &nonce)
                .map_err(|e| ChainError {
                    link,
                    kind: ChainErrorKind::Verify(e),
                })?;

            let recorded = entry.result.signed_time();
            if verified != recorded {
                return Err(ChainError {
                    link,
                    kind: ChainErrorKind::TimestampMismatch { recorded, verified },
                });
            }
            prev_reply = &entry.result.response;
        }
        Ok(())
    }

    /// Pairs of adjacent links where time provably went backwards.
    pub fn inconsistencies(&self) -> Vec<Inconsistency> {
        self.links
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| {
                let (a, b) = (&pair[0].result, &pair[1].result);
                let earliest_a = a.midpoint.saturating_sub(u64::from(a.radius));
                let latest_b = b.midpoint.saturating_add(u64::from(b.radius));
                latest_b < earliest_a
            })
            .map(|(i, _)| Inconsistency {
                earlier: i,
                later: i + 1,
            })
            .collect()
    }

    /// Export the chain as a self-contained claim.
    ///
    /// The first link carries its full nonce, so the claim verifies without
    /// any earlier reply; later links carry their blinds.
    pub fn to_claim(&self) -> ChainClaim {
        let links = self
            .links
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let nonce_or_blind = if i == 0 {
                    // Requests in a chain were built by this crate, so they
                    // always parse.
                    parse_request(&entry.result.request)
                        .map(|n| n.to_vec())
                        .unwrap_or_default()
                } else {
                    entry.result.blind.to_vec()
                };
                ClaimLink {
                    public_key_type: entry.server.public_key_type.clone(),
                    server_public_key: STANDARD.encode(entry.server.public_key),
                    nonce_or_blind: STANDARD.encode(nonce_or_blind),
                    reply: STANDARD.encode(&entry.result.response),
                }
            })
            .collect();
        ChainClaim { links }
    }
}

/// A portable chain of replies, as exchanged in misbehaviour reports.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChainClaim {
    /// Links in query order.
    pub links: Vec<ClaimLink>,
}

/// One reply in a [`ChainClaim`]. Byte fields are base64.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimLink {
    /// Root key type; only `ed25519` verifies.
    pub public_key_type: String,
    /// The server's root public key.
    pub server_public_key: String,
    /// The full nonce for the first link, the blind for the rest.
    pub nonce_or_blind: String,
    /// The server's reply.
    pub reply: String,
}

impl ChainClaim {
    /// Parse a claim from JSON.
    pub fn from_json(json: &str) -> Result<ChainClaim, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Verify every link and return the times they carry.
    pub fn verify(&self) -> Result<Vec<SignedTime>, ChainError> {
        let mut times = Vec::with_capacity(self.links.len());
        let mut prev_reply: Vec<u8> = Vec::new();
        for (link, entry) in self.links.iter().enumerate() {
            let fail = |kind| ChainError { link, kind };

            if entry.public_key_type != KEY_TYPE_ED25519 {
                return Err(fail(ChainErrorKind::UnsupportedKeyType {
                    key_type: entry.public_key_type.clone(),
                }));
            }
            let public_key: PublicKey = decode(&entry.server_public_key, PUBLIC_KEY_SIZE)
                .and_then(|k| k.try_into().ok())
                .ok_or(fail(ChainErrorKind::InvalidField {
                    field: "serverPublicKey",
                }))?;
            let value = decode(
                &entry.nonce_or_blind,
                if link == 0 { NONCE_SIZE } else { BLIND_SIZE },
            )
            .ok_or(fail(ChainErrorKind::InvalidField {
                field: "nonceOrBlind",
            }))?;
            let reply = STANDARD
                .decode(&entry.reply)
                .map_err(|_| fail(ChainErrorKind::InvalidField { field: "reply" }))?;

            let nonce = if link == 0 {
                value
            } else {
                let mut blind = [0u8; BLIND_SIZE];
                blind.copy_from_slice(&value);
                calculate_chain_nonce(&prev_reply, &blind).to_vec()
            };

            let time = verify_reply(&reply, &public_key, &nonce)
                .map_err(|e| fail(ChainErrorKind::Verify(e)))?;
            times.push(time);
            prev_reply = reply;
        }
        Ok(times)
    }
}

fn decode(field: &str, len: usize) -> Option<Vec<u8>> {
    STANDARD.decode(field).ok().filter(|v| v.len() == len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;

    fn result(midpoint: u64, radius: u32) -> RoughtimeResult {
        RoughtimeResult {
            request: Vec::new(),
            blind: [0; BLIND_SIZE],
            response: Vec::new(),
            midpoint,
            radius,
        }
    }

    fn query(outcome: Result<RoughtimeResult, TimeError>, delay_ms: u64) -> QueryResult {
        QueryResult {
            server: RoughtimeServer::new("s", [0u8; 32], "127.0.0.1:2002"),
            outcome,
            delay: Duration::from_millis(delay_ms),
        }
    }

    fn failed() -> Result<RoughtimeResult, TimeError> {
        Err(NetworkError::NoReply { attempts: 1 }.into())
    }

    #[test]
    fn test_chain_keeps_successes_in_order() {
        let results = vec![
            query(Ok(result(1, 0)), 0),
            query(failed(), 0),
            query(Ok(result(2, 0)), 0),
        ];
        let chain = Chain::new(&results);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.links()[0].result.midpoint, 1);
        assert_eq!(chain.links()[1].result.midpoint, 2);
    }

    #[test]
    fn test_inconsistencies() {
        let results = vec![
            query(Ok(result(100, 10)), 0),
            // Touches [90, 110].
            query(Ok(result(85, 5)), 0),
            // Entirely before [80, 90].
            query(Ok(result(70, 5)), 0),
        ];
        let chain = Chain::new(&results);
        assert_eq!(
            chain.inconsistencies(),
            vec![Inconsistency {
                earlier: 1,
                later: 2
            }]
        );
    }

    #[test]
    fn test_average_delta() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1000);
        let results = vec![
            // +10 s, 1 s accumulated delay: 9 s.
            query(Ok(result(1_010_000_000, 500_000)), 1000),
            // Radius too large; its delay still accumulates.
            query(Ok(result(1_050_000_000, 5_000_000)), 1000),
            query(failed(), 1000),
            // +13 s with 4 s accumulated delay: 9 s.
            query(Ok(result(1_013_000_000, 0)), 1000),
        ];
        let delta = average_delta(&results, t0, Duration::from_secs(1)).unwrap();
        assert!((delta - 9.0).abs() < 1e-9, "delta {delta}");
    }

    #[test]
    fn test_average_delta_no_valid_results() {
        let results = vec![query(failed(), 10)];
        assert_eq!(
            average_delta(&results, SystemTime::now(), Duration::from_secs(1)),
            Err(ConsensusError::NoAuthenticatedTime { attempted: 1 })
        );
    }

    #[test]
    fn test_claim_rejects_unknown_key_type() {
        let claim = ChainClaim {
            links: vec![ClaimLink {
                public_key_type: "ecdsa".to_string(),
                server_public_key: String::new(),
                nonce_or_blind: String::new(),
                reply: String::new(),
            }],
        };
        assert_eq!(
            claim.verify(),
            Err(ChainError {
                link: 0,
                kind: ChainErrorKind::UnsupportedKeyType {
                    key_type: "ecdsa".to_string()
                }
            })
        );
    }

    #[test]
    fn test_claim_json_field_names() {
        let claim = ChainClaim {
            links: vec![ClaimLink {
                public_key_type: "ed25519".to_string(),
                server_public_key: "a".to_string(),
                nonce_or_blind: "b".to_string(),
                reply: "c".to_string(),
            }],
        };
        let json = claim.to_json().unwrap();
        assert!(json.contains("\"serverPublicKey\""));
        assert!(json.contains("\"nonceOrBlind\""));
        assert_eq!(ChainClaim::from_json(&json).unwrap(), claim);
    }
}
