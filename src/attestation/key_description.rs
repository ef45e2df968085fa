// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::authorization_list::AuthorizationList;
use super::bytes::Bytes;
use super::common::*;
use super::errors::Error;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SecurityLevel {
    Software,
    TrustedEnvironment,
    StrongBox,
}

impl TryFrom<u64> for SecurityLevel {
    type Error = Error;

    fn try_from(v: u64) -> Result<Self, Error> {
        match v {
            0 => Ok(SecurityLevel::Software),
            1 => Ok(SecurityLevel::TrustedEnvironment),
            2 => Ok(SecurityLevel::StrongBox),
            x => Err(Error::Sema(format!("unknown security level {x}"))),
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// KeyDescription ::= SEQUENCE {
///     attestationVersion         INTEGER,
///     attestationSecurityLevel   SecurityLevel,
///     keyMintVersion             INTEGER,
///     keyMintSecurityLevel       SecurityLevel,
///     attestationChallenge       OCTET_STRING,
///     uniqueId                   OCTET_STRING,
///     softwareEnforced           AuthorizationList,
///     hardwareEnforced           AuthorizationList,
/// }
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDescription {
    pub attestation_version: Integer,
    pub attestation_security_level: SecurityLevel,
    pub keymaster_version: Integer,
    pub keymaster_security_level: SecurityLevel,
    pub attestation_challenge: Bytes,
    pub unique_id: Bytes,
    pub software_enforced: AuthorizationList,
    pub hardware_enforced: AuthorizationList,
}

impl KeyDescription {
    /// Decode the DER value carried by the attestation extension
    pub fn decode(buf: &[u8]) -> Result<KeyDescription, Error> {
        let v = parse_one(buf, "KeyDescription")?;
        let items = to_seq(&v, "KeyDescription")?;

        if items.len() != 8 {
            return Err(Error::Syntax(format!(
                "KeyDescription: expecting 8 items, got {}",
                items.len()
            )));
        }

        Ok(KeyDescription {
            attestation_version: to_int(&items[0], "attestationVersion")?,
            attestation_security_level: SecurityLevel::try_from(to_enum(
                &items[1],
                "attestationSecurityLevel",
            )?)?,
            keymaster_version: to_int(&items[2], "keymasterVersion")?,
            keymaster_security_level: SecurityLevel::try_from(to_enum(
                &items[3],
                "keymasterSecurityLevel",
            )?)?,
            attestation_challenge: to_bstr(&items[4], "attestationChallenge")?,
            unique_id: to_bstr(&items[5], "uniqueId")?,
            software_enforced: AuthorizationList::parse(&items[6])?,
            hardware_enforced: AuthorizationList::parse(&items[7])?,
        })
    }

    /// Key creation time in milliseconds since the epoch.  The software list
    /// is where KeyMint puts it; some implementations enforce it in hardware.
    pub fn creation_date_time(&self) -> Option<&Integer> {
        self.software_enforced
            .creation_date_time
            .as_ref()
            .or(self.hardware_enforced.creation_date_time.as_ref())
    }
}
