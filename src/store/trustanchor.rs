// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use crate::chain::render_name;
use base64::{engine::general_purpose, Engine as _};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Public};
use openssl::x509::{X509Ref, X509};
use pem::Pem;
use serde::Deserialize;
use tracing::warn;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";
const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// SHA-256 fingerprint as uppercase hex, no separators
pub fn fingerprint(cert: &X509Ref) -> Result<String, ErrorStack> {
    Ok(hex::encode_upper(cert.digest(MessageDigest::sha256())?))
}

/// A root CA certificate accepted as the end of an attestation chain
#[derive(Clone)]
pub struct TrustAnchor {
    pub cert: X509,
    pub der: Vec<u8>,
    pub fingerprint: String,
    pub subject: String,
}

impl std::fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustAnchor")
            .field("subject", &self.subject)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl TrustAnchor {
    pub fn from_x509(cert: X509) -> Result<TrustAnchor, Error> {
        let der = cert.to_der().map_err(|e| Error::Syntax(e.to_string()))?;
        let fingerprint = fingerprint(&cert).map_err(|e| Error::Sema(e.to_string()))?;

        Ok(TrustAnchor {
            subject: render_name(cert.subject_name()),
            cert,
            der,
            fingerprint,
        })
    }

    pub fn from_pem(pem: &str) -> Result<TrustAnchor, Error> {
        let cert = X509::from_pem(pem.as_bytes()).map_err(|e| Error::Syntax(e.to_string()))?;
        Self::from_x509(cert)
    }

    /// A bare base64 DER body, whitespace allowed
    pub fn from_base64(b64: &str) -> Result<TrustAnchor, Error> {
        let compact: String = b64.chars().filter(|c| !c.is_whitespace()).collect();
        let der = general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| Error::Syntax(e.to_string()))?;
        let cert = X509::from_der(&der).map_err(|e| Error::Syntax(e.to_string()))?;
        Self::from_x509(cert)
    }
}

#[derive(Deserialize)]
struct JsonAnchors {
    certificates: Vec<String>,
}

/// The set of accepted attestation roots, plus manufacturer public keys a
/// root may be signed by when it is not itself in the set.
#[derive(Clone, Debug, Default)]
pub struct TrustAnchorSet {
    anchors: Vec<TrustAnchor>,
    fallback_keys: Vec<PKey<Public>>,
}

impl TrustAnchorSet {
    /// Returns a new empty TrustAnchorSet
    pub fn new() -> Self {
        Default::default()
    }

    /// Build a set from PEM certificates.  Entries that do not parse are
    /// skipped.
    pub fn from_pems<S: AsRef<str>>(pems: &[S]) -> Self {
        let mut tas = Self::new();

        for (i, pem) in pems.iter().enumerate() {
            match TrustAnchor::from_pem(pem.as_ref()) {
                Ok(ta) => tas.anchors.push(ta),
                Err(e) => warn!(index = i, error = %e, "skipping unparsable trust anchor"),
            }
        }

        tas
    }

    /// Load a concatenation of PEM certificates.  Blocks that are not
    /// certificates, or do not parse, are skipped.
    pub fn load_pem_bundle(bundle: &str) -> Result<Self, Error> {
        let blocks = pem_blocks(bundle, CERTIFICATE_LABEL)?;

        if blocks.is_empty() {
            return Err(Error::Syntax("no PEM certificate found".to_string()));
        }

        let mut tas = Self::new();

        for (i, block) in blocks.iter().enumerate() {
            let res = X509::from_der(block.contents())
                .map_err(|e| Error::Syntax(e.to_string()))
                .and_then(TrustAnchor::from_x509);

            match res {
                Ok(ta) => tas.anchors.push(ta),
                Err(e) => warn!(index = i, error = %e, "skipping unparsable trust anchor"),
            }
        }

        Ok(tas)
    }

    /// Load `{"certificates": [...]}` where each entry is either a PEM
    /// certificate or its bare base64 body.  Entries that do not parse are
    /// skipped.
    pub fn load_json(j: &str) -> Result<Self, Error> {
        let doc: JsonAnchors = serde_json::from_str(j).map_err(|e| Error::Syntax(e.to_string()))?;
        let mut tas = Self::new();

        for (i, entry) in doc.certificates.iter().enumerate() {
            let res = if entry.contains("-----BEGIN") {
                TrustAnchor::from_pem(entry)
            } else {
                TrustAnchor::from_base64(entry)
            };

            match res {
                Ok(ta) => tas.anchors.push(ta),
                Err(e) => warn!(index = i, error = %e, "skipping unparsable trust anchor"),
            }
        }

        Ok(tas)
    }

    /// JSON or PEM bundle, whichever `s` looks like
    pub fn load(s: &str) -> Result<Self, Error> {
        if s.trim_start().starts_with('{') {
            Self::load_json(s)
        } else {
            Self::load_pem_bundle(s)
        }
    }

    pub fn add_fallback_key(&mut self, key: PKey<Public>) {
        self.fallback_keys.push(key);
    }

    /// Add the PEM public keys found in `s`, returning how many were added
    pub fn load_fallback_keys(&mut self, s: &str) -> Result<usize, Error> {
        let blocks = pem_blocks(s, PUBLIC_KEY_LABEL)?;

        for block in blocks.iter() {
            let key = PKey::public_key_from_der(block.contents())
                .map_err(|e| Error::Key(e.to_string()))?;
            self.fallback_keys.push(key);
        }

        Ok(blocks.len())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrustAnchor> {
        self.anchors.iter()
    }

    pub fn fallback_keys(&self) -> &[PKey<Public>] {
        &self.fallback_keys
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// No root certificate (fallback keys do not count)
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// The PEM blocks of `s` tagged `label`
fn pem_blocks(s: &str, label: &str) -> Result<Vec<Pem>, Error> {
    let blocks = pem::parse_many(s).map_err(|e| Error::Syntax(e.to_string()))?;

    Ok(blocks.into_iter().filter(|b| b.tag() == label).collect())
}
