// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Batch reply construction.
//!
//! One signature over SREP authenticates every nonce in the batch; each reply
//! carries its own leaf index and inclusion path.

use ring::signature::Ed25519KeyPair;

use crate::crypto::{self, RESPONSE_CONTEXT};
use crate::error::RoughtimeError;
use crate::merkle::MerkleTree;
use crate::tag::Tag;
use crate::types::Nonce;
use crate::wire::Message;

/// Build one reply per nonce, in batch order.
///
/// `certificate` is the encoded CERT for `online_key`. An empty batch yields
/// no replies.
pub fn create_replies(
    nonces: &[Nonce],
    midpoint: u64,
    radius: u32,
    certificate: &[u8],
    online_key: &Ed25519KeyPair,
) -> Result<Vec<Vec<u8>>, RoughtimeError> {
    let Some(tree) = MerkleTree::new(nonces) else {
        return Ok(Vec::new());
    };

    let srep = Message::new()
        .with(Tag::MIDP, midpoint.to_le_bytes().to_vec())
        .with(Tag::RADI, radius.to_le_bytes().to_vec())
        .with(Tag::ROOT, tree.root().to_vec())
        .encode()?;
    let sig = crypto::sign(online_key, RESPONSE_CONTEXT, &srep);

    let template = Message::new()
        .with(Tag::SREP, srep)
        .with(Tag::SIG, sig)
        .with(Tag::CERT, certificate.to_vec());

    let mut replies = Vec::with_capacity(nonces.len());
    for index in 0..nonces.len() {
        let path = tree.path(index).unwrap_or_default().concat();
        let reply = template
            .clone()
            .with(Tag::INDX, (index as u32).to_le_bytes().to_vec())
            .with(Tag::PATH, path)
            .encode()?;
        replies.push(reply);
    }

    Ok(replies)
}
