// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end verification of one attestation payload.
//!
//! A call reads one [`TrustSnapshot`] and keeps it until it returns, so a
//! concurrent publication is either fully seen or not seen at all.

use crate::attestation::{decode_extension, KeyDescription};
use crate::chain::{self, check_revocation, ChainValidator};
use crate::config::Config;
use crate::device::DeviceInfo;
use crate::error::{Error, ErrorKind};
use crate::policy::EvaluationResult;
use crate::report::{DebugTree, LedgerUpsert, LogEnvelope};
use crate::store::{ISnapshotSource, TrustSnapshot};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

/// What the caller of the service gets back
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Response {
    pub reason: String,
    pub errorcode: u16,
}

impl Response {
    pub fn authorized() -> Self {
        Response {
            reason: "Authorized".to_string(),
            errorcode: 200,
        }
    }

    pub fn unauthorized() -> Self {
        Response {
            reason: "Unauthorized".to_string(),
            errorcode: 401,
        }
    }

    /// Client facing rendition of a pipeline error.  The error's own
    /// message never leaves the service.
    pub fn from_error(e: &Error) -> Self {
        let (reason, errorcode) = match e.kind() {
            ErrorKind::MalformedInput | ErrorKind::CertificateParse => ("Bad Request", 400),
            ErrorKind::ServiceUnavailable => ("Service Unavailable", 503),
            ErrorKind::Internal => ("Internal error", 500),
            _ => return Response::unauthorized(),
        };

        Response {
            reason: reason.to_string(),
            errorcode,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub success: bool,
    pub reasons: Vec<String>,
    pub device: DeviceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_description: Option<KeyDescription>,
    pub response: Response,
    pub log: LogEnvelope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<LedgerUpsert>,
    /// Set when the pipeline stopped before evaluation
    #[serde(skip)]
    pub error: Option<Error>,
}

/// Milliseconds since the epoch
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(i64::MAX)
}

#[derive(Clone, Debug, Default)]
pub struct Verifier {
    config: Config,
}

impl Verifier {
    pub fn new(config: Config) -> Self {
        Verifier { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Verify `payload` against the snapshot `source` currently holds
    pub fn verify_with<S: ISnapshotSource + ?Sized>(
        &self,
        source: &S,
        payload: Option<&str>,
        debug: bool,
    ) -> VerificationOutcome {
        let snapshot = source.current();
        self.verify(&snapshot, payload, debug)
    }

    pub fn verify(
        &self,
        snapshot: &TrustSnapshot,
        payload: Option<&str>,
        debug: bool,
    ) -> VerificationOutcome {
        self.verify_at(snapshot, payload, debug, now_ms())
    }

    /// As [`Verifier::verify`], with the freshness check run at `now_ms`
    pub fn verify_at(
        &self,
        snapshot: &TrustSnapshot,
        payload: Option<&str>,
        debug: bool,
        now_ms: i64,
    ) -> VerificationOutcome {
        let outcome = match self.run(snapshot, payload, debug, now_ms) {
            Ok(o) => o,
            Err(e) => self.failure(e),
        };

        info!(target: "keyattest::access", envelope = %outcome.log.to_json(), "verify");

        if let Some(upsert) = &outcome.ledger {
            info!(
                target: "keyattest::ledger",
                serial = %upsert.serial,
                record = %serde_json::to_string(upsert).unwrap_or_default(),
                "device ledger upsert"
            );
        }

        outcome
    }

    fn run(
        &self,
        snapshot: &TrustSnapshot,
        payload: Option<&str>,
        debug: bool,
        now_ms: i64,
    ) -> Result<VerificationOutcome, Error> {
        if snapshot.anchors.is_empty() {
            return Err(Error::ServiceUnavailable(
                "Attestation root CA list not available".to_string(),
            ));
        }

        let revocations = snapshot.revocations.as_ref().ok_or_else(|| {
            Error::ServiceUnavailable("Attestation status list not available".to_string())
        })?;

        let chain = chain::parse(payload)?;
        debug!(len = chain.len(), topology = ?chain.topology(), "parsed attestation chain");

        ChainValidator::new(&snapshot.anchors, self.config.enforce_remote_provisioning)
            .validate(&chain)?;
        check_revocation(&chain, revocations)?;

        let kd = chain
            .entries()
            .iter()
            .find_map(|e| decode_extension(&e.der))
            .ok_or_else(|| Error::ExtensionDecode("Attestation extension missing".to_string()))?;

        let device = DeviceInfo::extract(Some(&kd));
        let EvaluationResult { valid, reasons } =
            self.config
                .policy()
                .evaluate(Some(&kd), device.warranty_valid, now_ms);

        let response = if valid {
            Response::authorized()
        } else {
            Response::unauthorized()
        };

        let mut log = LogEnvelope::new(
            response.errorcode,
            &response.reason,
            self.config.attestation_timeout_seconds,
        );
        log.device = device.to_log();
        log.evaluation_issues = reasons.clone();

        let debug = (debug || self.config.debug_attestation).then(|| DebugTree::new(&kd));
        let ledger = if valid {
            LedgerUpsert::propose(&device, &kd)
        } else {
            None
        };

        Ok(VerificationOutcome {
            success: valid,
            reasons,
            device,
            key_description: Some(kd),
            response,
            log,
            debug,
            ledger,
            error: None,
        })
    }

    fn failure(&self, e: Error) -> VerificationOutcome {
        let response = Response::from_error(&e);

        error!(kind = ?e.kind(), error = %e.message(), "verification aborted");

        let mut log = LogEnvelope::new(
            response.errorcode,
            &response.reason,
            self.config.attestation_timeout_seconds,
        );
        log.error = e.message().to_string();

        VerificationOutcome {
            success: false,
            reasons: vec![response.reason.clone()],
            device: DeviceInfo::default(),
            key_description: None,
            response,
            log,
            debug: None,
            ledger: None,
            error: Some(e),
        }
    }
}
