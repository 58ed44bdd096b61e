// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Delegation certificates binding a long-term root key to an online key.
//!
//! ```text
//! CERT = { SIG: sign(root, DELEGATION_CONTEXT || DELE), DELE }
//! DELE = { PUBK: online public key, MINT: µs, MAXT: µs }
//! ```

use ring::signature::Ed25519KeyPair;

use crate::crypto::{self, DELEGATION_CONTEXT, generate_key_pair};
use crate::error::{RangeError, RoughtimeError, SignatureKind, WireFormatError};
use crate::tag::Tag;
use crate::types::{PUBLIC_KEY_SIZE, PublicKey, SIGNATURE_SIZE};
use crate::wire::Message;

/// The validity window and online key carried by a verified certificate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Delegation {
    /// Start of validity, µs since the Unix epoch.
    pub min_time: u64,
    /// End of validity, µs since the Unix epoch.
    pub max_time: u64,
    /// The delegated online key.
    pub public_key: PublicKey,
}

impl Delegation {
    /// Check that the window is well formed and contains `midpoint`.
    pub fn check(&self, midpoint: u64) -> Result<(), RangeError> {
        if self.max_time < self.min_time {
            return Err(RangeError::InvertedWindow {
                min_time: self.min_time,
                max_time: self.max_time,
            });
        }
        if midpoint < self.min_time || midpoint > self.max_time {
            return Err(RangeError::OutsideDelegation {
                midpoint,
                min_time: self.min_time,
                max_time: self.max_time,
            });
        }
        Ok(())
    }
}

/// Sign a certificate delegating `[min_time, max_time]` to `delegated`.
pub fn create_certificate(
    min_time: u64,
    max_time: u64,
    delegated: &PublicKey,
    root_key: &Ed25519KeyPair,
) -> Result<Vec<u8>, RoughtimeError> {
    if max_time < min_time {
        return Err(RangeError::InvertedWindow { min_time, max_time }.into());
    }

    let dele = Message::new()
        .with(Tag::PUBK, delegated.to_vec())
        .with(Tag::MINT, min_time.to_le_bytes().to_vec())
        .with(Tag::MAXT, max_time.to_le_bytes().to_vec())
        .encode()?;

    let sig = crypto::sign(root_key, DELEGATION_CONTEXT, &dele);

    Message::new()
        .with(Tag::SIG, sig)
        .with(Tag::DELE, dele)
        .encode()
}

/// Verify a certificate's signature under `root_public_key` and extract its
/// contents. The window itself is checked by [`Delegation::check`].
pub fn verify_delegation(
    cert: &[u8],
    root_public_key: &PublicKey,
) -> Result<Delegation, RoughtimeError> {
    let cert = Message::decode(cert).map_err(|inner| WireFormatError::Nested {
        tag: Tag::CERT,
        inner: Box::new(inner),
    })?;
    let sig = cert.require_len(Tag::SIG, SIGNATURE_SIZE)?;
    let dele_bytes = cert.require(Tag::DELE)?;

    crypto::verify(
        root_public_key,
        DELEGATION_CONTEXT,
        dele_bytes,
        sig,
        SignatureKind::Delegation,
    )?;

    let dele = cert.nested(Tag::DELE)?;
    let min_time = dele.require_u64(Tag::MINT)?;
    let max_time = dele.require_u64(Tag::MAXT)?;
    let mut public_key = [0u8; PUBLIC_KEY_SIZE];
    public_key.copy_from_slice(dele.require_len(Tag::PUBK, PUBLIC_KEY_SIZE)?);

    Ok(Delegation {
        min_time,
        max_time,
        public_key,
    })
}

/// A freshly generated online key pair and the certificate that delegates
/// to it.
pub struct OnlineKey {
    key_pair: Ed25519KeyPair,
    certificate: Vec<u8>,
    min_time: u64,
    max_time: u64,
}

impl OnlineKey {
    /// Generate an online key and have `root_key` certify it for
    /// `[min_time, max_time]`.
    pub fn generate(
        root_key: &Ed25519KeyPair,
        min_time: u64,
        max_time: u64,
    ) -> Result<OnlineKey, RoughtimeError> {
        let key_pair = generate_key_pair()?;
        let certificate =
            create_certificate(min_time, max_time, &crypto::public_key(&key_pair), root_key)?;
        Ok(OnlineKey {
            key_pair,
            certificate,
            min_time,
            max_time,
        })
    }

    /// The encoded CERT value.
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    /// The online signing key.
    pub fn key_pair(&self) -> &Ed25519KeyPair {
        &self.key_pair
    }

    /// The online public key.
    pub fn public_key(&self) -> PublicKey {
        crypto::public_key(&self.key_pair)
    }

    /// Start of the delegated window, µs.
    pub fn min_time(&self) -> u64 {
        self.min_time
    }

    /// End of the delegated window, µs.
    pub fn max_time(&self) -> u64 {
        self.max_time
    }
}

impl core::fmt::Debug for OnlineKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OnlineKey")
            .field("public_key", &self.public_key())
            .field("min_time", &self.min_time)
            .field("max_time", &self.max_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key;

    #[test]
    fn test_certificate_round_trip() {
        let root = generate_key_pair().unwrap();
        let online = generate_key_pair().unwrap();
        let cert = create_certificate(10, 20, &public_key(&online), &root).unwrap();

        let delegation = verify_delegation(&cert, &public_key(&root)).unwrap();
        assert_eq!(
            delegation,
            Delegation {
                min_time: 10,
                max_time: 20,
                public_key: public_key(&online),
            }
        );
    }

    #[test]
    fn test_inverted_window_rejected_at_creation() {
        let root = generate_key_pair().unwrap();
        assert_eq!(
            create_certificate(20, 10, &[0u8; 32], &root),
            Err(RoughtimeError::Range(RangeError::InvertedWindow {
                min_time: 20,
                max_time: 10
            }))
        );
    }

    #[test]
    fn test_equal_bounds_allowed() {
        let root = generate_key_pair().unwrap();
        let cert = create_certificate(7, 7, &[1u8; 32], &root).unwrap();
        let delegation = verify_delegation(&cert, &public_key(&root)).unwrap();
        assert!(delegation.check(7).is_ok());
    }

    #[test]
    fn test_wrong_root_key() {
        let root = generate_key_pair().unwrap();
        let other = generate_key_pair().unwrap();
        let cert = create_certificate(0, 1, &[1u8; 32], &root).unwrap();
        assert_eq!(
            verify_delegation(&cert, &public_key(&other)),
            Err(RoughtimeError::CryptoVerification(SignatureKind::Delegation))
        );
    }

    #[test]
    fn test_tampered_dele() {
        let root = generate_key_pair().unwrap();
        let cert = create_certificate(0, 100, &[1u8; 32], &root).unwrap();
        let mut msg = Message::decode(&cert).unwrap();
        let dele = msg
            .nested(Tag::DELE)
            .unwrap()
            .with(Tag::MAXT, u64::MAX.to_le_bytes().to_vec())
            .encode()
            .unwrap();
        msg.insert(Tag::DELE, dele);
        assert_eq!(
            verify_delegation(&msg.encode().unwrap(), &public_key(&root)),
            Err(RoughtimeError::CryptoVerification(SignatureKind::Delegation))
        );
    }

    #[test]
    fn test_check() {
        let delegation = Delegation {
            min_time: 10,
            max_time: 20,
            public_key: [0u8; 32],
        };
        assert!(delegation.check(10).is_ok());
        assert!(delegation.check(20).is_ok());
        assert_eq!(
            delegation.check(21),
            Err(RangeError::OutsideDelegation {
                midpoint: 21,
                min_time: 10,
                max_time: 20
            })
        );

        let inverted = Delegation {
            min_time: 20,
            max_time: 10,
            ..delegation
        };
        assert_eq!(
            inverted.check(15),
            Err(RangeError::InvertedWindow {
                min_time: 20,
                max_time: 10
            })
        );
    }

    #[test]
    fn test_online_key_generate() {
        let root = generate_key_pair().unwrap();
        let online = OnlineKey::generate(&root, 1, 2).unwrap();
        let delegation = verify_delegation(online.certificate(), &public_key(&root)).unwrap();
        assert_eq!(delegation.public_key, online.public_key());
        assert_eq!((online.min_time(), online.max_time()), (1, 2));
    }
}
