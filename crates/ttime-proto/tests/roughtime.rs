use ring::signature::Ed25519KeyPair;
use ttime_proto::crypto::{
    DELEGATION_CONTEXT, RESPONSE_CONTEXT, generate_key_pair, public_key, verify_reply,
};
use ttime_proto::delegation::OnlineKey;
use ttime_proto::error::{RangeError, RoughtimeError, SignatureKind};
use ttime_proto::reply::create_replies;
use ttime_proto::request::{calculate_chain_nonce, create_request, parse_request};
use ttime_proto::types::{MIN_REQUEST_SIZE, Nonce};
use ttime_proto::{Message, SignedTime, Tag};

const MIDPOINT: u64 = 1_700_000_000_000_000;
const RADIUS: u32 = 1_000_000;

fn sign(key: &Ed25519KeyPair, context: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut buf = context.to_vec();
    buf.extend_from_slice(msg);
    key.sign(&buf).as_ref().to_vec()
}

fn server() -> (Ed25519KeyPair, OnlineKey) {
    let root = generate_key_pair().unwrap();
    let online = OnlineKey::generate(&root, 0, u64::MAX).unwrap();
    (root, online)
}

fn batch(n: usize) -> Vec<Nonce> {
    (0..n)
        .map(|i| create_request(&[i as u8]).unwrap().nonce)
        .collect()
}

#[test]
fn batch_sizes_all_verify() {
    let (root, online) = server();
    let root_pub = public_key(&root);
    for n in [1usize, 2, 3, 4, 5, 15, 16, 17] {
        let nonces = batch(n);
        let replies =
            create_replies(&nonces, MIDPOINT, RADIUS, online.certificate(), online.key_pair())
                .unwrap();
        assert_eq!(replies.len(), n);
        for (nonce, reply) in nonces.iter().zip(&replies) {
            assert_eq!(
                verify_reply(reply, &root_pub, nonce),
                Ok(SignedTime {
                    midpoint: MIDPOINT,
                    radius: RADIUS
                }),
                "batch of {n}"
            );
        }
    }
}

#[test]
fn request_parses_on_server_side() {
    let request = create_request(&[]).unwrap();
    assert_eq!(request.bytes.len(), MIN_REQUEST_SIZE);
    assert_eq!(parse_request(&request.bytes).unwrap(), request.nonce);
}

fn flip_bit(msg: &Message, tag: Tag, bit: usize) -> Vec<u8> {
    let mut value = msg.require(tag).unwrap().to_vec();
    value[bit / 8] ^= 1 << (bit % 8);
    msg.clone().with(tag, value).encode().unwrap()
}

#[test]
fn every_flipped_path_bit_is_tree_mismatch() {
    let (root, online) = server();
    let root_pub = public_key(&root);
    let nonces = batch(5);
    let replies =
        create_replies(&nonces, MIDPOINT, RADIUS, online.certificate(), online.key_pair())
            .unwrap();

    for (i, (nonce, reply)) in nonces.iter().zip(&replies).enumerate() {
        let msg = Message::decode(reply).unwrap();
        let bits = msg.require(Tag::PATH).unwrap().len() * 8;
        assert_eq!(bits, 3 * 64 * 8);
        for bit in 0..bits {
            assert_eq!(
                verify_reply(&flip_bit(&msg, Tag::PATH, bit), &root_pub, nonce),
                Err(RoughtimeError::TreeMismatch),
                "index {i} bit {bit}"
            );
        }
    }
}

#[test]
fn index_outside_tree_is_tree_mismatch() {
    let (root, online) = server();
    let root_pub = public_key(&root);
    let nonces = batch(5);
    let replies =
        create_replies(&nonces, MIDPOINT, RADIUS, online.certificate(), online.key_pair())
            .unwrap();

    for (i, (nonce, reply)) in nonces.iter().zip(&replies).enumerate() {
        let msg = Message::decode(reply).unwrap();
        let levels = msg.require(Tag::PATH).unwrap().len() / 64;
        let forged = (i as u32 + (1 << levels)).to_le_bytes().to_vec();
        let tampered = msg.clone().with(Tag::INDX, forged).encode().unwrap();
        assert_eq!(
            verify_reply(&tampered, &root_pub, nonce),
            Err(RoughtimeError::TreeMismatch),
            "index {i}"
        );
    }
}

#[test]
fn resigned_root_is_tree_mismatch() {
    // A server that signs a ROOT not covering the nonce still fails step six.
    let (root, online) = server();
    let nonces = batch(2);
    let replies =
        create_replies(&nonces, MIDPOINT, RADIUS, online.certificate(), online.key_pair())
            .unwrap();

    let mut msg = Message::decode(&replies[0]).unwrap();
    let srep = msg
        .nested(Tag::SREP)
        .unwrap()
        .with(Tag::ROOT, vec![0xAB; 64])
        .encode()
        .unwrap();
    msg.insert(Tag::SIG, sign(online.key_pair(), RESPONSE_CONTEXT, &srep));
    msg.insert(Tag::SREP, srep);

    assert_eq!(
        verify_reply(&msg.encode().unwrap(), &public_key(&root), &nonces[0]),
        Err(RoughtimeError::TreeMismatch)
    );
}

#[test]
fn every_flipped_signature_bit_fails_crypto() {
    let (root, online) = server();
    let root_pub = public_key(&root);
    let nonces = batch(1);
    let replies =
        create_replies(&nonces, MIDPOINT, RADIUS, online.certificate(), online.key_pair())
            .unwrap();

    let msg = Message::decode(&replies[0]).unwrap();
    for bit in 0..64 * 8 {
        assert_eq!(
            verify_reply(&flip_bit(&msg, Tag::SIG, bit), &root_pub, &nonces[0]),
            Err(RoughtimeError::CryptoVerification(SignatureKind::Response)),
            "bit {bit}"
        );
    }
}

#[test]
fn inverted_certificate_window_is_range_error() {
    // create_certificate refuses inverted windows, so sign one by hand.
    let root = generate_key_pair().unwrap();
    let online = generate_key_pair().unwrap();
    let dele = Message::new()
        .with(Tag::PUBK, public_key(&online).to_vec())
        .with(Tag::MINT, 200u64.to_le_bytes().to_vec())
        .with(Tag::MAXT, 100u64.to_le_bytes().to_vec())
        .encode()
        .unwrap();
    let cert = Message::new()
        .with(Tag::SIG, sign(&root, DELEGATION_CONTEXT, &dele))
        .with(Tag::DELE, dele)
        .encode()
        .unwrap();

    let nonces = batch(1);
    let replies = create_replies(&nonces, 150, RADIUS, &cert, &online).unwrap();
    assert_eq!(
        verify_reply(&replies[0], &public_key(&root), &nonces[0]),
        Err(RoughtimeError::Range(RangeError::InvertedWindow {
            min_time: 200,
            max_time: 100
        }))
    );
}

#[test]
fn chained_nonce_links_two_servers() {
    let (root_a, online_a) = server();
    let (root_b, online_b) = server();

    let first = create_request(&[]).unwrap();
    let reply_a = create_replies(
        &[first.nonce],
        MIDPOINT,
        RADIUS,
        online_a.certificate(),
        online_a.key_pair(),
    )
    .unwrap()
    .remove(0);
    verify_reply(&reply_a, &public_key(&root_a), &first.nonce).unwrap();

    let second = create_request(&reply_a).unwrap();
    assert_eq!(second.bytes.len(), MIN_REQUEST_SIZE);
    assert_eq!(parse_request(&second.bytes).unwrap(), second.nonce);
    assert_eq!(second.nonce, calculate_chain_nonce(&reply_a, &second.blind));
    let reply_b = create_replies(
        &[second.nonce],
        MIDPOINT + 1,
        RADIUS,
        online_b.certificate(),
        online_b.key_pair(),
    )
    .unwrap()
    .remove(0);
    verify_reply(&reply_b, &public_key(&root_b), &second.nonce).unwrap();

    // Substituting a different first reply breaks the link.
    let forged = calculate_chain_nonce(b"some other reply", &second.blind);
    assert_eq!(
        verify_reply(&reply_b, &public_key(&root_b), &forged),
        Err(RoughtimeError::TreeMismatch)
    );
}

#[test]
fn empty_message_encodes_to_four_zero_bytes() {
    assert_eq!(Message::new().encode().unwrap(), vec![0u8; 4]);
}
