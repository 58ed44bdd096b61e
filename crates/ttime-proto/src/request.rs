// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Client request construction and server-side request parsing.

use ring::digest;

use crate::error::{RoughtimeError, WireFormatError};
use crate::tag::Tag;
use crate::types::{Blind, MIN_REQUEST_SIZE, NONCE_SIZE, Nonce};
use crate::wire::Message;

/// PAD length that brings a `{NONC, PAD}` request to exactly
/// [`MIN_REQUEST_SIZE`] bytes.
const PADDING_SIZE: usize = MIN_REQUEST_SIZE - Message::overhead(2) - NONCE_SIZE;

/// An encoded request with the nonce and blind that produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    /// The NONC value.
    pub nonce: Nonce,
    /// The blind mixed into the nonce.
    pub blind: Blind,
    /// The request datagram.
    pub bytes: Vec<u8>,
}

/// `SHA-512(SHA-512(prev_reply) || blind)`.
///
/// An empty `prev_reply` starts a new chain.
pub fn calculate_chain_nonce(prev_reply: &[u8], blind: &Blind) -> Nonce {
    let prev_hash = digest::digest(&digest::SHA512, prev_reply);

    let mut ctx = digest::Context::new(&digest::SHA512);
    ctx.update(prev_hash.as_ref());
    ctx.update(blind);

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(ctx.finish().as_ref());
    nonce
}

/// Build a request chained off `prev_reply` with a fresh random blind.
pub fn create_request(prev_reply: &[u8]) -> Result<Request, RoughtimeError> {
    let mut blind = [0u8; NONCE_SIZE];
    rand::fill(&mut blind);
    create_request_with_blind(prev_reply, &blind)
}

/// Build a request chained off `prev_reply` with a caller-chosen blind.
pub fn create_request_with_blind(
    prev_reply: &[u8],
    blind: &Blind,
) -> Result<Request, RoughtimeError> {
    let nonce = calculate_chain_nonce(prev_reply, blind);
    let bytes = Message::new()
        .with(Tag::NONC, nonce.to_vec())
        .with(Tag::PAD, vec![0u8; PADDING_SIZE])
        .encode()?;

    Ok(Request {
        nonce,
        blind: *blind,
        bytes,
    })
}

/// Validate a received request and return its nonce.
///
/// Requests shorter than [`MIN_REQUEST_SIZE`] are rejected before decoding.
pub fn parse_request(bytes: &[u8]) -> Result<Nonce, RoughtimeError> {
    if bytes.len() < MIN_REQUEST_SIZE {
        return Err(WireFormatError::TooShort {
            needed: MIN_REQUEST_SIZE as u64,
            available: bytes.len(),
        }
        .into());
    }
    let msg = Message::decode(bytes)?;
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(msg.require_len(Tag::NONC, NONCE_SIZE)?);
    Ok(nonce)
}
