// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::base64::{decode_segment, to_pem};
use super::name::render_name;
use crate::attestation::ATTESTATION_OID;
use crate::error::Error;
use openssl::x509::X509;
use serde::Serialize;
use tracing::debug;
use x509_parser::prelude::*;

/// Remote key provisioning info extension
pub const PROVISIONING_INFO_OID: &str = "1.3.6.1.4.1.11129.2.1.30";

const OID_COMMON_NAME: &str = "2.5.4.3";
const OID_SERIAL_NUMBER: &str = "2.5.4.5";
const OID_ORGANIZATION: &str = "2.5.4.10";
const OID_TITLE: &str = "2.5.4.12";

/// How the attestation key behind a certificate was provisioned, guessed
/// from the shape of its subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningMethod {
    Factory,
    Remote,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub has_attestation_extension: bool,
    pub has_provisioning_info: bool,
    pub provisioning_method: ProvisioningMethod,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            has_attestation_extension: false,
            has_provisioning_info: false,
            provisioning_method: ProvisioningMethod::Unknown,
        }
    }
}

impl Metadata {
    /// Inspect the extensions and subject of a DER certificate.  Anything
    /// x509-parser refuses gets the all-false default.
    pub fn inspect(der: &[u8]) -> Metadata {
        let cert = match parse_x509_certificate(der) {
            Ok((_, cert)) => cert,
            Err(e) => {
                debug!(error = %e, "certificate extensions cannot be inspected");
                return Metadata::default();
            }
        };

        let has = |oid: &str| {
            cert.extensions()
                .iter()
                .any(|ext| ext.oid.to_id_string() == oid)
        };

        Metadata {
            has_attestation_extension: has(ATTESTATION_OID),
            has_provisioning_info: has(PROVISIONING_INFO_OID),
            provisioning_method: classify(cert.subject()),
        }
    }
}

/// Factory provisioned intermediates carry a serialNumber and a title of
/// TEE or StrongBox, remotely provisioned ones a commonName and an
/// organization.
pub fn classify(subject: &X509Name) -> ProvisioningMethod {
    let mut serial = None;
    let mut title = None;
    let mut common_name = None;
    let mut organization = None;

    for attr in subject.iter_attributes() {
        let value = attr.as_str().ok().filter(|v| !v.is_empty());

        match attr.attr_type().to_id_string().as_str() {
            OID_SERIAL_NUMBER => serial = value,
            OID_TITLE => title = value,
            OID_COMMON_NAME => common_name = value,
            OID_ORGANIZATION => organization = value,
            _ => {}
        }
    }

    if serial.is_some() && matches!(title, Some("TEE") | Some("StrongBox")) {
        return ProvisioningMethod::Factory;
    }

    if common_name.is_some() && organization.is_some() {
        return ProvisioningMethod::Remote;
    }

    ProvisioningMethod::Unknown
}

/// One certificate of the attestation chain
#[derive(Clone)]
pub struct ChainEntry {
    pub cert: X509,
    pub der: Vec<u8>,
    pub pem: String,
    pub subject: String,
    pub issuer: String,
    pub metadata: Metadata,
}

impl std::fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainEntry")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl ChainEntry {
    pub fn from_der(der: Vec<u8>) -> Result<ChainEntry, Error> {
        let pem = to_pem(&der);

        let cert = X509::from_pem(pem.as_bytes())
            .map_err(|_| Error::CertificateParse("Unable to parse certificate".to_string()))?;

        Ok(ChainEntry {
            subject: render_name(cert.subject_name()),
            issuer: render_name(cert.issuer_name()),
            metadata: Metadata::inspect(&der),
            cert,
            der,
            pem,
        })
    }

    /// Serial number as a decimal string
    pub fn serial_decimal(&self) -> Option<String> {
        let bn = self.cert.serial_number().to_bn().ok()?;
        bn.to_dec_str().ok().map(|s| s.to_string())
    }

    /// Serial number as lowercase hex without leading zeroes
    pub fn serial_hex(&self) -> Option<String> {
        let bn = self.cert.serial_number().to_bn().ok()?;
        let hex = bn.to_hex_str().ok()?.to_lowercase();

        // openssl pads to whole bytes
        match hex.trim_start_matches('0') {
            "" => Some("0".to_string()),
            trimmed => Some(trimmed.to_string()),
        }
    }
}

/// Chain topology, as signalled by the number of certificates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// 4 certificates
    Factory,
    /// 5 certificates, the extra intermediate issued by the provisioning
    /// server
    Remote,
}

/// An attestation chain ordered leaf first, root last.  A chain that made
/// it through [`parse`] has 4 or 5 entries and the attestation extension on
/// the leaf only.
#[derive(Clone, Debug)]
pub struct CertificateChain {
    entries: Vec<ChainEntry>,
}

impl CertificateChain {
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn leaf(&self) -> &ChainEntry {
        &self.entries[0]
    }

    pub fn root(&self) -> &ChainEntry {
        &self.entries[self.entries.len() - 1]
    }

    /// Every entry but the root
    pub fn non_root(&self) -> &[ChainEntry] {
        &self.entries[..self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn topology(&self) -> Topology {
        if self.entries.len() == 5 {
            Topology::Remote
        } else {
            Topology::Factory
        }
    }
}

/// Split, decode and parse the `.`-joined certificate payload.
///
/// No signature is looked at here: a chain without the attestation
/// extension on its leaf is refused before any cryptographic work.
pub fn parse(payload: Option<&str>) -> Result<CertificateChain, Error> {
    let payload = match payload {
        Some(p) if !p.is_empty() => p,
        _ => {
            return Err(Error::MalformedInput(
                "Payload missing attestation data".to_string(),
            ))
        }
    };

    let segments: Vec<&str> = payload.split('.').collect();

    if segments.len() != 4 && segments.len() != 5 {
        return Err(Error::MalformedInput(
            "Invalid certificate chain length".to_string(),
        ));
    }

    let mut entries = Vec::with_capacity(segments.len());

    for segment in segments {
        let der = decode_segment(segment)?;
        entries.push(ChainEntry::from_der(der)?);
    }

    if !entries[0].metadata.has_attestation_extension {
        return Err(Error::ExtensionPolicy(
            "Leaf certificate missing attestation extension".to_string(),
        ));
    }

    if entries[1..]
        .iter()
        .any(|e| e.metadata.has_attestation_extension)
    {
        return Err(Error::ExtensionPolicy(
            "Multiple attestation extensions detected".to_string(),
        ));
    }

    Ok(CertificateChain { entries })
}
