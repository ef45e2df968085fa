// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Android hardware key attestation verification and appraisal.
//!
//! This crate verifies the X.509 certificate chain an Android device
//! produces when it attests a Keystore key, decodes the key attestation
//! extension carried by the leaf, and appraises the decoded claims against
//! a device trust policy.  For detailed information about the format, see
//! the Android [key attestation] documentation.
//!
//! The API allows:
//! * Parsing the `.`-joined, base64-encoded chain payload
//! * Validating chain linkage, the root against a set of trust anchors, the
//!   provisioning path and the revocation status of each certificate
//! * Decoding the `KeyDescription` into typed, sparse authorization lists
//! * Appraising security levels, origin, boot state and freshness
//!
//! [key attestation]: https://source.android.com/docs/security/features/keystore/attestation

pub mod attestation;
pub mod chain;
pub mod config;
pub mod device;
pub mod error;
pub mod policy;
pub mod report;
pub mod store;
pub mod verifier;

#[cfg(test)]
mod testutil;

pub use self::config::{Config, ConfigArgs};
pub use self::error::{Error, ErrorKind};
pub use self::verifier::{Response, VerificationOutcome, Verifier};
