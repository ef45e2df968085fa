// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The attestation module decodes the Android key attestation extension
//! (OID `1.3.6.1.4.1.11129.2.1.17`) into a [`KeyDescription`].
//!
//! The extension value is a DER `KeyDescription` whose two
//! [`AuthorizationList`]s are sparse: each field is an explicit context
//! tag that may or may not be present, and absence is preserved as such.
//!
//! # Example
//!
//! ```no_run
//! use keyattest::attestation::{decode_extension, SecurityLevel};
//!
//! # let leaf_der: Vec<u8> = vec![];
//! if let Some(kd) = decode_extension(&leaf_der) {
//!     assert_eq!(kd.attestation_security_level, SecurityLevel::TrustedEnvironment);
//! }
//! ```

pub use self::application_id::{AttestationApplicationId, PackageInfo};
pub use self::authorization_list::{origin_name, AuthorizationList, ORIGIN_GENERATED};
pub use self::bytes::{printable, Bytes};
pub use self::common::Integer;
pub use self::errors::Error;
pub use self::key_description::{KeyDescription, SecurityLevel};
pub use self::root_of_trust::{RootOfTrust, VerifiedBootState};

mod application_id;
mod authorization_list;
mod bytes;
mod common;
mod errors;
mod key_description;
mod root_of_trust;

use tracing::{debug, warn};
use x509_parser::prelude::*;

/// Android key attestation extension
pub const ATTESTATION_OID: &str = "1.3.6.1.4.1.11129.2.1.17";

/// Returns the raw value of the attestation extension of a DER certificate,
/// if it has one.
pub fn find_extension(cert_der: &[u8]) -> Option<&[u8]> {
    let (_, cert) = parse_x509_certificate(cert_der).ok()?;

    cert.extensions()
        .iter()
        .find(|ext| ext.oid.to_id_string() == ATTESTATION_OID)
        .map(|ext| ext.value)
}

/// Locate and decode the attestation extension of a DER certificate.
///
/// Any failure (no extension, malformed DER, schema mismatch) yields `None`
/// and is logged.
pub fn decode_extension(cert_der: &[u8]) -> Option<KeyDescription> {
    let raw = match find_extension(cert_der) {
        Some(raw) => raw,
        None => {
            debug!("certificate carries no attestation extension");
            return None;
        }
    };

    match KeyDescription::decode(raw) {
        Ok(kd) => Some(kd),
        Err(e) => {
            warn!(error = %e, "unable to decode attestation extension");
            None
        }
    }
}
