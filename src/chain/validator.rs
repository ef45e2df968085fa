// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::name::names_match;
use super::parser::{CertificateChain, ChainEntry, ProvisioningMethod, Topology};
use crate::error::Error;
use crate::store::{fingerprint, TrustAnchor, TrustAnchorSet};
use openssl::pkey::{HasPublic, PKeyRef};
use openssl::x509::X509Ref;
use tracing::debug;

/// A way a chain root can be recognised as a trust anchor
type AnchorRule = fn(&ChainEntry, &TrustAnchor) -> bool;

/// Tried in order for each anchor, first hit wins.
const ANCHOR_RULES: &[(&str, AnchorRule)] = &[
    ("der", same_der),
    ("fingerprint", same_fingerprint),
    ("subject+signature", signed_by_anchor),
];

fn same_der(root: &ChainEntry, anchor: &TrustAnchor) -> bool {
    root.der == anchor.der
}

fn same_fingerprint(root: &ChainEntry, anchor: &TrustAnchor) -> bool {
    match fingerprint(&root.cert) {
        Ok(fp) => fp == anchor.fingerprint,
        Err(_) => false,
    }
}

fn signed_by_anchor(root: &ChainEntry, anchor: &TrustAnchor) -> bool {
    if root.subject != anchor.subject {
        return false;
    }

    match anchor.cert.public_key() {
        Ok(k) => signed_by(&root.cert, &k),
        Err(_) => false,
    }
}

/// `cert` carries a valid signature by `key`.  Verification errors count as
/// a mismatch.
fn signed_by<T: HasPublic>(cert: &X509Ref, key: &PKeyRef<T>) -> bool {
    cert.verify(key).unwrap_or(false)
}

/// Checks an attestation chain against a set of trust anchors
pub struct ChainValidator<'a> {
    anchors: &'a TrustAnchorSet,
    enforce_remote_provisioning: bool,
}

impl<'a> ChainValidator<'a> {
    pub fn new(anchors: &'a TrustAnchorSet, enforce_remote_provisioning: bool) -> Self {
        ChainValidator {
            anchors,
            enforce_remote_provisioning,
        }
    }

    pub fn validate(&self, chain: &CertificateChain) -> Result<(), Error> {
        self.verify_linkage(chain)?;
        self.verify_root(chain.root())?;

        if self.enforce_remote_provisioning {
            verify_provisioning_path(chain)?;
        }

        Ok(())
    }

    /// Walk from the leaf to the root: each certificate is signed by, and
    /// names as issuer, the next one.
    fn verify_linkage(&self, chain: &CertificateChain) -> Result<(), Error> {
        for pair in chain.entries().windows(2) {
            let (child, parent) = (&pair[0], &pair[1]);

            let linked = match parent.cert.public_key() {
                Ok(k) => signed_by(&child.cert, &k),
                Err(_) => false,
            };

            if !linked {
                return Err(Error::ChainLinkage(
                    "Certificate signature mismatch".to_string(),
                ));
            }

            if !names_match(&child.issuer, &parent.subject) {
                return Err(Error::ChainLinkage(
                    "Subject/issuer name chaining failed".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn verify_root(&self, root: &ChainEntry) -> Result<(), Error> {
        if !names_match(&root.issuer, &root.subject) {
            return Err(Error::UntrustedRoot(
                "Root certificate not self-signed".to_string(),
            ));
        }

        for (i, anchor) in self.anchors.iter().enumerate() {
            for (rule, matches) in ANCHOR_RULES {
                if matches(root, anchor) {
                    debug!(anchor = i, rule, "chain root matches trust anchor");
                    return Ok(());
                }
            }
        }

        for (i, key) in self.anchors.fallback_keys().iter().enumerate() {
            if signed_by(&root.cert, key) {
                debug!(key = i, "chain root signed by fallback key");
                return Ok(());
            }
        }

        Err(Error::UntrustedRoot(
            "Root certificate not recognized".to_string(),
        ))
    }
}

/// A remote chain must carry provisioning info and no factory subject, a
/// factory chain neither provisioning info nor remote subjects.
fn verify_provisioning_path(chain: &CertificateChain) -> Result<(), Error> {
    let issuers = &chain.entries()[1..];
    let remote = chain.topology() == Topology::Remote;

    let info_present = issuers.iter().any(|e| e.metadata.has_provisioning_info);
    let has_method =
        |m: ProvisioningMethod| issuers.iter().any(|e| e.metadata.provisioning_method == m);

    if remote && !info_present {
        return Err(Error::ProvisioningPolicy(
            "Remote provisioning info missing in chain".to_string(),
        ));
    }

    if !remote && info_present {
        return Err(Error::ProvisioningPolicy(
            "Unexpected provisioning extension in factory chain".to_string(),
        ));
    }

    if !remote && has_method(ProvisioningMethod::Remote) {
        return Err(Error::ProvisioningPolicy(
            "Factory chain contains remote provisioning subject".to_string(),
        ));
    }

    if remote && has_method(ProvisioningMethod::Factory) {
        return Err(Error::ProvisioningPolicy(
            "Remote chain contains factory provisioning subject".to_string(),
        ));
    }

    Ok(())
}
