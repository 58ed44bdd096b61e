// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime tag-value message codec.
//!
//! Layout:
//! ```text
//! num_tags: u32 LE
//! offsets:  [u32 LE; N-1]   (cumulative byte offsets of values 2..N)
//! tags:     [u32 LE; N]     (strictly ascending)
//! values:   [u8]            (concatenated, each 4-byte aligned)
//! ```
//!
//! An empty message encodes as four zero bytes.

use std::collections::BTreeMap;

use crate::error::{EncodeError, RoughtimeError, WireFormatError};
use crate::tag::Tag;

/// Largest payload region [`Message::decode`] accepts.
const MAX_PAYLOAD_LEN: usize = i32::MAX as usize;

/// A Roughtime message: unique tags mapped to 4-byte-aligned values.
///
/// Tags are kept in a sorted map, so iteration and encoding always visit them
/// in ascending numeric order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    fields: BTreeMap<Tag, Vec<u8>>,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Message {
        Message::default()
    }

    /// Set `tag` to `value`, returning the previous value if there was one.
    pub fn insert(&mut self, tag: Tag, value: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.fields.insert(tag, value.into())
    }

    /// Builder-style [`insert`](Message::insert).
    pub fn with(mut self, tag: Tag, value: impl Into<Vec<u8>>) -> Message {
        self.insert(tag, value);
        self
    }

    /// Remove `tag`, returning its value.
    pub fn remove(&mut self, tag: Tag) -> Option<Vec<u8>> {
        self.fields.remove(&tag)
    }

    /// Look up a tag's value.
    pub fn get(&self, tag: Tag) -> Option<&[u8]> {
        self.fields.get(&tag).map(Vec::as_slice)
    }

    /// Look up a required tag.
    pub fn require(&self, tag: Tag) -> Result<&[u8], WireFormatError> {
        self.get(tag).ok_or(WireFormatError::MissingTag { tag })
    }

    /// Look up a required tag whose value must be exactly `len` bytes.
    pub fn require_len(&self, tag: Tag, len: usize) -> Result<&[u8], WireFormatError> {
        let value = self.require(tag)?;
        if value.len() != len {
            return Err(WireFormatError::InvalidLength {
                tag,
                expected: len,
                actual: value.len(),
            });
        }
        Ok(value)
    }

    /// Read a required little-endian `u32` value.
    pub fn require_u32(&self, tag: Tag) -> Result<u32, WireFormatError> {
        let value = self.require_len(tag, 4)?;
        Ok(u32::from_le_bytes([value[0], value[1], value[2], value[3]]))
    }

    /// Read a required little-endian `u64` value.
    pub fn require_u64(&self, tag: Tag) -> Result<u64, WireFormatError> {
        let value = self.require_len(tag, 8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(value);
        Ok(u64::from_le_bytes(bytes))
    }

    /// Decode the value of `tag` as a nested message.
    pub fn nested(&self, tag: Tag) -> Result<Message, WireFormatError> {
        Message::decode(self.require(tag)?).map_err(|inner| WireFormatError::Nested {
            tag,
            inner: Box::new(inner),
        })
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the message has no tags.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(tag, value)` pairs in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &[u8])> + '_ {
        self.fields.iter().map(|(tag, value)| (*tag, value.as_slice()))
    }

    /// Number of header bytes needed to encode `num_tags` tags.
    pub const fn overhead(num_tags: usize) -> usize {
        if num_tags == 0 {
            4
        } else {
            4 * 2 * num_tags
        }
    }

    /// Encode into wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>, RoughtimeError> {
        if self.fields.is_empty() {
            return Ok(vec![0u8; 4]);
        }

        if self.fields.len() >= i32::MAX as usize {
            return Err(EncodeError::TooManyTags {
                count: self.fields.len(),
            }
            .into());
        }

        let mut payload_sum = 0u64;
        for (tag, value) in &self.fields {
            if value.len() % 4 != 0 {
                return Err(EncodeError::UnalignedValue {
                    tag: *tag,
                    len: value.len(),
                }
                .into());
            }
            payload_sum += value.len() as u64;
        }
        if payload_sum >= 1 << 32 {
            return Err(EncodeError::PayloadTooLarge { len: payload_sum }.into());
        }

        let num_tags = self.fields.len();
        let mut buf = Vec::with_capacity(Message::overhead(num_tags) + payload_sum as usize);
        buf.extend_from_slice(&(num_tags as u32).to_le_bytes());

        // Offsets of values 2..N; the first value starts at 0.
        let mut offset = 0u32;
        for value in self.fields.values().take(num_tags - 1) {
            offset += value.len() as u32;
            buf.extend_from_slice(&offset.to_le_bytes());
        }

        for tag in self.fields.keys() {
            buf.extend_from_slice(&tag.to_bytes());
        }

        for value in self.fields.values() {
            buf.extend_from_slice(value);
        }

        Ok(buf)
    }

    /// Parse wire bytes into a message.
    pub fn decode(buf: &[u8]) -> Result<Message, WireFormatError> {
        if buf.len() < 4 {
            return Err(WireFormatError::TooShort {
                needed: 4,
                available: buf.len(),
            });
        }
        if buf.len() % 4 != 0 {
            return Err(WireFormatError::UnalignedLength { len: buf.len() });
        }

        let num_tags = u64::from(read_u32(buf, 0));
        if num_tags == 0 {
            return Ok(Message::new());
        }

        let header_len = 4 * (1 + (num_tags - 1) + num_tags);
        if (buf.len() as u64) < header_len {
            return Err(WireFormatError::TooShort {
                needed: header_len,
                available: buf.len(),
            });
        }

        let num_tags = num_tags as usize;
        let header_len = header_len as usize;
        let offsets_start = 4;
        let tags_start = 4 * num_tags;
        let values = &buf[header_len..];
        if values.len() > MAX_PAYLOAD_LEN {
            return Err(WireFormatError::TooLarge { len: values.len() });
        }

        let mut fields = BTreeMap::new();
        let mut last_tag: Option<Tag> = None;
        let mut current = 0u32;

        for i in 0..num_tags {
            let tag = Tag::from_u32(read_u32(buf, tags_start + 4 * i));
            if last_tag.is_some_and(|last| last >= tag) {
                return Err(WireFormatError::TagsOutOfOrder);
            }

            let next = if i < num_tags - 1 {
                read_u32(buf, offsets_start + 4 * i)
            } else {
                values.len() as u32
            };

            if next % 4 != 0 {
                return Err(WireFormatError::UnalignedOffset { offset: next });
            }
            if next < current {
                return Err(WireFormatError::OffsetsOutOfOrder);
            }
            if next as usize > values.len() {
                return Err(WireFormatError::Truncated);
            }

            fields.insert(tag, values[current as usize..next as usize].to_vec());
            last_tag = Some(tag);
            current = next;
        }

        Ok(Message { fields })
    }
}

impl FromIterator<(Tag, Vec<u8>)> for Message {
    fn from_iter<I: IntoIterator<Item = (Tag, Vec<u8>)>>(iter: I) -> Message {
        Message {
            fields: iter.into_iter().collect(),
        }
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
