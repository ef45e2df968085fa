// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::bytes::Bytes;
use super::common::*;
use super::errors::Error;
use serde::Serialize;
use std::fmt;
use x509_parser::der_parser::ber::BerObject;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VerifiedBootState {
    Verified,
    SelfSigned,
    Unverified,
    Failed,
}

impl TryFrom<u64> for VerifiedBootState {
    type Error = Error;

    fn try_from(v: u64) -> Result<Self, Error> {
        match v {
            0 => Ok(VerifiedBootState::Verified),
            1 => Ok(VerifiedBootState::SelfSigned),
            2 => Ok(VerifiedBootState::Unverified),
            3 => Ok(VerifiedBootState::Failed),
            x => Err(Error::Sema(format!("unknown verified boot state {x}"))),
        }
    }
}

impl fmt::Display for VerifiedBootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// RootOfTrust ::= SEQUENCE {
///     verifiedBootKey   OCTET_STRING,
///     deviceLocked      BOOLEAN,
///     verifiedBootState VerifiedBootState,
///     verifiedBootHash  OCTET_STRING,  -- attestation version 3 onwards
/// }
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootOfTrust {
    pub verified_boot_key: Bytes,
    pub device_locked: bool,
    pub verified_boot_state: VerifiedBootState,
    pub verified_boot_hash: Option<Bytes>,
}

impl RootOfTrust {
    pub(crate) fn parse(v: &BerObject) -> Result<RootOfTrust, Error> {
        let items = to_seq(v, "rootOfTrust")?;

        if items.len() != 3 && items.len() != 4 {
            return Err(Error::Syntax(format!(
                "rootOfTrust: expecting 3 or 4 items, got {}",
                items.len()
            )));
        }

        let state = to_enum(&items[2], "verifiedBootState")?;

        Ok(RootOfTrust {
            verified_boot_key: to_bstr(&items[0], "verifiedBootKey")?,
            device_locked: to_bool(&items[1], "deviceLocked")?,
            verified_boot_state: VerifiedBootState::try_from(state)?,
            verified_boot_hash: match items.get(3) {
                Some(h) => Some(to_bstr(h, "verifiedBootHash")?),
                None => None,
            },
        })
    }
}
