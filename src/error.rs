// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

/// Verification failures.  Every variant is final for the call that produced
/// it: nothing in the pipeline retries.
#[derive(thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Certificate parse error: {0}")]
    CertificateParse(String),
    #[error("Extension policy violation: {0}")]
    ExtensionPolicy(String),
    #[error("Chain linkage error: {0}")]
    ChainLinkage(String),
    #[error("Untrusted root: {0}")]
    UntrustedRoot(String),
    #[error("Provisioning policy violation: {0}")]
    ProvisioningPolicy(String),
    #[error("Certificate revoked: {0}")]
    CertificateRevoked(String),
    #[error("Extension decode failure: {0}")]
    ExtensionDecode(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine readable counterpart of [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    MalformedInput,
    CertificateParse,
    ExtensionPolicy,
    ChainLinkage,
    UntrustedRoot,
    ProvisioningPolicy,
    CertificateRevoked,
    ExtensionDecode,
    ServiceUnavailable,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedInput(_) => ErrorKind::MalformedInput,
            Error::CertificateParse(_) => ErrorKind::CertificateParse,
            Error::ExtensionPolicy(_) => ErrorKind::ExtensionPolicy,
            Error::ChainLinkage(_) => ErrorKind::ChainLinkage,
            Error::UntrustedRoot(_) => ErrorKind::UntrustedRoot,
            Error::ProvisioningPolicy(_) => ErrorKind::ProvisioningPolicy,
            Error::CertificateRevoked(_) => ErrorKind::CertificateRevoked,
            Error::ExtensionDecode(_) => ErrorKind::ExtensionDecode,
            Error::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The bare message, without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Error::MalformedInput(e)
            | Error::CertificateParse(e)
            | Error::ExtensionPolicy(e)
            | Error::ChainLinkage(e)
            | Error::UntrustedRoot(e)
            | Error::ProvisioningPolicy(e)
            | Error::CertificateRevoked(e)
            | Error::ExtensionDecode(e)
            | Error::ServiceUnavailable(e)
            | Error::Internal(e) => e,
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind(), self.message())
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Error::Internal(e.to_string())
    }
}
