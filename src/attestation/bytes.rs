// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use base64::{engine::general_purpose, Engine as _};
use serde::ser::{Serialize, Serializer};

/// An OCTET STRING value.  Serialised as lowercase hex in human readable
/// formats, raw bytes otherwise.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Bytes(Vec::new())
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.0)
    }

    /// The bytes as text, if every byte is printable ASCII (0x20..=0x7e).
    /// An empty value is printable.
    pub fn printable(&self) -> Option<&str> {
        printable(&self.0)
    }
}

/// Returns `buf` as text when it is made only of printable ASCII.
pub fn printable(buf: &[u8]) -> Option<&str> {
    if buf.iter().all(|b| (0x20..=0x7e).contains(b)) {
        std::str::from_utf8(buf).ok()
    } else {
        None
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Self {
        Self(v.to_owned())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl Serialize for Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}
