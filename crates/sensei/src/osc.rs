// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minimal OSC 1.0 wire codec.
//!
//! Covers exactly what the daemon speaks: messages with `i` (int32) and
//! `f` (float32) arguments. OSC strings are null-terminated and padded to
//! four bytes; numeric arguments are big-endian per the OSC spec. Bundles
//! are not supported.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// One OSC argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
}

/// A decoded OSC message.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

/// Length of an OSC string region: content, terminator, padding to 4.
#[inline]
fn padded_len(content_len: usize) -> usize {
    (content_len + 4) & !3
}

fn push_string(buf: &mut Vec<u8>, content: &str) {
    let start = buf.len();
    buf.extend_from_slice(content.as_bytes());
    buf.resize(start + padded_len(content.len()), 0);
}

/// Encode a message to its datagram form.
#[must_use]
pub fn encode_message(address: &str, args: &[OscArg]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(padded_len(address.len()) + 4 + args.len() * 4 + 4);
    push_string(&mut buf, address);

    let mut typetags = String::with_capacity(args.len() + 1);
    typetags.push(',');
    for arg in args {
        typetags.push(match arg {
            OscArg::Int(_) => 'i',
            OscArg::Float(_) => 'f',
        });
    }
    push_string(&mut buf, &typetags);

    for arg in args {
        let mut word = [0u8; 4];
        match arg {
            OscArg::Int(v) => BigEndian::write_i32(&mut word, *v),
            OscArg::Float(v) => BigEndian::write_f32(&mut word, *v),
        }
        buf.extend_from_slice(&word);
    }
    buf
}

/// Read one padded OSC string, returning it and the offset past its padding.
fn read_string(buf: &[u8], offset: usize) -> Result<(String, usize)> {
    let region = &buf[offset..];
    let end = region
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::Parsing("unterminated OSC string".to_string()))?;
    let content = std::str::from_utf8(&region[..end])
        .map_err(|_| Error::Parsing("OSC string is not valid UTF-8".to_string()))?;
    let next = offset + padded_len(end);
    if next > buf.len() {
        return Err(Error::Parsing("truncated OSC string padding".to_string()));
    }
    Ok((content.to_string(), next))
}

/// Decode a datagram into a message.
pub fn decode_message(datagram: &[u8]) -> Result<OscMessage> {
    if datagram.len() < 4 || datagram.len() % 4 != 0 {
        return Err(Error::Parsing(format!(
            "OSC datagram has invalid length: {}",
            datagram.len()
        )));
    }
    let (address, offset) = read_string(datagram, 0)?;
    if !address.starts_with('/') {
        return Err(Error::Parsing(format!("OSC address must start with '/': {}", address)));
    }
    let (typetags, mut offset) = read_string(datagram, offset)?;
    let tags = typetags
        .strip_prefix(',')
        .ok_or_else(|| Error::Parsing("OSC type tag string must start with ','".to_string()))?;

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        if offset + 4 > datagram.len() {
            return Err(Error::Parsing("OSC arguments truncated".to_string()));
        }
        let word = &datagram[offset..offset + 4];
        match tag {
            'i' => args.push(OscArg::Int(BigEndian::read_i32(word))),
            'f' => args.push(OscArg::Float(BigEndian::read_f32(word))),
            other => {
                return Err(Error::Parsing(format!("unsupported OSC type tag: '{}'", other)))
            }
        }
        offset += 4;
    }
    Ok(OscMessage { address, args })
}
