// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Ed25519 signing contexts and end-to-end reply verification.

use ring::rand::SystemRandom;
use ring::signature::{self, Ed25519KeyPair, KeyPair};

use crate::delegation::verify_delegation;
use crate::error::{RoughtimeError, SignatureKind};
use crate::merkle::{self, HASH_SIZE};
use crate::tag::Tag;
use crate::types::{PublicKey, SIGNATURE_SIZE, SignedTime};
use crate::wire::Message;

/// Context prefixed to DELE before the root key signs it.
pub const DELEGATION_CONTEXT: &[u8] = b"RoughTime v1 delegation signature--\0";

/// Context prefixed to SREP before the online key signs it.
pub const RESPONSE_CONTEXT: &[u8] = b"RoughTime v1 response signature\0";

/// Generate a fresh Ed25519 key pair from the system random source.
pub fn generate_key_pair() -> Result<Ed25519KeyPair, RoughtimeError> {
    let rng = SystemRandom::new();
    let pkcs8 =
        Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| RoughtimeError::KeyGeneration)?;
    Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).map_err(|_| RoughtimeError::KeyGeneration)
}

/// The raw 32-byte public half of a key pair.
pub fn public_key(key_pair: &Ed25519KeyPair) -> PublicKey {
    let mut out = [0u8; 32];
    out.copy_from_slice(key_pair.public_key().as_ref());
    out
}

pub(crate) fn sign(key_pair: &Ed25519KeyPair, context: &[u8], msg: &[u8]) -> Vec<u8> {
    key_pair.sign(&with_context(context, msg)).as_ref().to_vec()
}

pub(crate) fn verify(
    public_key: &[u8],
    context: &[u8],
    msg: &[u8],
    sig: &[u8],
    kind: SignatureKind,
) -> Result<(), RoughtimeError> {
    signature::UnparsedPublicKey::new(&signature::ED25519, public_key)
        .verify(&with_context(context, msg), sig)
        .map_err(|_| RoughtimeError::CryptoVerification(kind))
}

fn with_context(context: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(context.len() + msg.len());
    buf.extend_from_slice(context);
    buf.extend_from_slice(msg);
    buf
}

/// Verify a reply against a server's root public key and the nonce that was
/// sent, returning the authenticated time.
///
/// Checks, in order:
/// 1. the reply decodes and carries CERT, SIG, SREP, INDX and PATH
/// 2. CERT is signed by `root_public_key`
/// 3. SIG covers SREP under the delegated key
/// 4. SREP carries ROOT, MIDP and RADI
/// 5. MINT ≤ MIDP ≤ MAXT
/// 6. the nonce hashes up to ROOT through PATH and INDX
pub fn verify_reply(
    reply: &[u8],
    root_public_key: &PublicKey,
    nonce: &[u8],
) -> Result<SignedTime, RoughtimeError> {
    let msg = Message::decode(reply)?;
    let cert = msg.require(Tag::CERT)?;
    let sig = msg.require_len(Tag::SIG, SIGNATURE_SIZE)?;
    let srep_bytes = msg.require(Tag::SREP)?;
    let index = msg.require_u32(Tag::INDX)?;
    let path = msg.require(Tag::PATH)?;

    let delegation = verify_delegation(cert, root_public_key)?;

    verify(
        &delegation.public_key,
        RESPONSE_CONTEXT,
        srep_bytes,
        sig,
        SignatureKind::Response,
    )?;

    let srep = msg.nested(Tag::SREP)?;
    let root = srep.require_len(Tag::ROOT, HASH_SIZE)?;
    let midpoint = srep.require_u64(Tag::MIDP)?;
    let radius = srep.require_u32(Tag::RADI)?;

    delegation.check(midpoint)?;

    merkle::verify_inclusion(nonce, index, path, root)?;

    Ok(SignedTime { midpoint, radius })
}
