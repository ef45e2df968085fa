// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The chain module turns the wire payload into a [`CertificateChain`] and
//! checks it: signature and name linkage up to a self-issued root, root
//! membership in a [`TrustAnchorSet`](crate::store::TrustAnchorSet),
//! provisioning path consistency and revocation status.
//!
//! # Example
//!
//! ```no_run
//! use keyattest::chain::{check_revocation, parse, ChainValidator};
//! use keyattest::store::{RevocationMap, TrustAnchorSet};
//!
//! # fn run(payload: &str, anchors: &TrustAnchorSet, status: &RevocationMap) -> Result<(), keyattest::Error> {
//! let chain = parse(Some(payload))?;
//!
//! ChainValidator::new(anchors, false).validate(&chain)?;
//! check_revocation(&chain, status)?;
//! # Ok(())
//! # }
//! ```

pub use self::base64::{decode_segment, to_pem};
pub use self::name::{names_match, normalize_dn, render_name};
pub use self::parser::{
    classify, parse, CertificateChain, ChainEntry, Metadata, ProvisioningMethod, Topology,
    PROVISIONING_INFO_OID,
};
pub use self::revocation::check_revocation;
pub use self::validator::ChainValidator;

mod base64;
mod name;
mod parser;
mod revocation;
mod validator;
