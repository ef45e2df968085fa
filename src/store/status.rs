// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Revoked,
    Suspended,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One entry of the attestation status list
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusEntry {
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
}

/// Certificate serial number to status, as published in the attestation
/// status list: `{"entries": {"<serial>": {"status": "REVOKED", ...}}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RevocationMap {
    entries: HashMap<String, StatusEntry>,
}

impl RevocationMap {
    pub fn new() -> Self {
        Default::default()
    }

    /// Parse a status list.  A document without `entries` is refused.
    pub fn load_json(j: &str) -> Result<Self, Error> {
        serde_json::from_str(j).map_err(|e| Error::Syntax(e.to_string()))
    }

    pub fn insert(&mut self, serial: &str, entry: StatusEntry) {
        self.entries.insert(serial.to_string(), entry);
    }

    /// Look a serial up by its decimal form, then by its lowercase hex form.
    /// A hex form made only of digits is not tried: it would read as the
    /// decimal key of another serial.
    pub fn lookup(&self, decimal: &str, hex: &str) -> Option<&StatusEntry> {
        if let Some(e) = self.entries.get(decimal) {
            return Some(e);
        }

        if hex.bytes().any(|b| b.is_ascii_alphabetic()) {
            self.entries.get(hex)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
