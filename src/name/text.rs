// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Textual name form: `lci:/T=V/T=V/...`.
//!
//! `T` is the decimal or `0x`-prefixed hex label type; `V` is the
//! URI-escaped value. A leading label of `0` (NAME) may be omitted, so
//! `lci:/foo/bar` is equivalent to `lci:/0=foo/0=bar`.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use super::{Component, Name, NameError};

const SCHEME: &str = "lci:/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextNameError {
    #[error("name must start with \"lci:/\"")]
    MissingScheme,
    #[error("invalid label type {0:?}")]
    InvalidLabel(String),
    #[error("invalid percent-escape in value {0:?}")]
    InvalidEscape(String),
    #[error(transparent)]
    Name(#[from] NameError),
}

/// Parses `lci:/T=V/...`. Empty segments (a doubled `/`) are ignored, so a
/// trailing slash does not add an empty component.
pub fn parse(s: &str) -> Result<Name, TextNameError> {
    let rest = s.strip_prefix(SCHEME).ok_or(TextNameError::MissingScheme)?;

    let mut components = Vec::new();
    for segment in rest.split('/').filter(|s| !s.is_empty()) {
        let (label, value) = match segment.split_once('=') {
            Some((t, v)) => (parse_label(t)?, v),
            None => (LABEL_NAME_DEFAULT, segment),
        };
        components.push(Component::new(label, unescape(value)?));
    }
    Ok(Name::from_components(components)?)
}

const LABEL_NAME_DEFAULT: u16 = super::LABEL_NAME;

fn parse_label(t: &str) -> Result<u16, TextNameError> {
    let parsed = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        t.parse::<u16>()
    };
    parsed.map_err(|_| TextNameError::InvalidLabel(t.to_string()))
}

fn unescape(v: &str) -> Result<Bytes, TextNameError> {
    let bytes = v.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| TextNameError::InvalidEscape(v.to_string()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(Bytes::from(out))
}

fn escape(value: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for &b in value {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                write!(f, "{}", b as char)?
            },
            _ => write!(f, "%{b:02X}")?,
        }
    }
    Ok(())
}

/// Formats `name` as `lci:/T=V/...`, always emitting the explicit `T=`
/// (including for NAME=0) for an unambiguous round trip.
pub fn format(name: &Name, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "lci:")?;
    for c in name.components() {
        write!(f, "/{}=", c.label)?;
        escape(&c.value, f)?;
    }
    Ok(())
}
