// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Appraisal of a decoded attestation against the device trust policy.
//!
//! The checklist is fixed and always run in full: every failed check adds
//! a reason, and the attestation passes only when there are none.

use crate::attestation::{Integer, KeyDescription, SecurityLevel, VerifiedBootState};
use serde::Serialize;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EvaluationResult {
    pub valid: bool,
    pub reasons: Vec<String>,
}

impl EvaluationResult {
    fn from_reasons(reasons: Vec<String>) -> Self {
        EvaluationResult {
            valid: reasons.is_empty(),
            reasons,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Policy {
    /// Maximum age of an attestation; 0 disables the freshness check
    pub timeout_seconds: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Policy {
    pub fn new(timeout_seconds: u64) -> Self {
        Policy { timeout_seconds }
    }

    /// Evaluate `kd` at `now_ms` (milliseconds since the epoch)
    pub fn evaluate(
        &self,
        kd: Option<&KeyDescription>,
        warranty_valid: Option<bool>,
        now_ms: i64,
    ) -> EvaluationResult {
        let kd = match kd {
            Some(kd) => kd,
            None => {
                return EvaluationResult::from_reasons(vec![
                    "Attestation extension missing".to_string()
                ])
            }
        };

        let mut reasons = vec![];

        if kd.attestation_security_level != SecurityLevel::TrustedEnvironment {
            reasons.push("Attestation security level not TrustedEnvironment".to_string());
        }

        if kd.keymaster_security_level != SecurityLevel::TrustedEnvironment {
            reasons.push("Keymaster security level not TrustedEnvironment".to_string());
        }

        if kd.attestation_security_level != kd.keymaster_security_level {
            reasons.push("Attestation/keymaster security level mismatch".to_string());
        }

        if let Some(origin) = kd.hardware_enforced.origin_name() {
            if origin != "Generated" {
                reasons.push(format!("Hardware origin {origin} not allowed"));
            }
        }

        let rot = kd.hardware_enforced.root_of_trust.as_ref();

        if !rot.map_or(false, |r| r.device_locked) {
            reasons.push("Device reported unlocked".to_string());
        }

        if !rot.map_or(false, |r| r.verified_boot_state == VerifiedBootState::Verified) {
            reasons.push("Verified boot state not Verified".to_string());
        }

        match kd.creation_date_time() {
            Some(ts) => {
                if self.timeout_seconds > 0 && self.is_stale(ts, now_ms) {
                    reasons.push(format!(
                        "Attestation older than {} seconds",
                        self.timeout_seconds
                    ));
                }
            }
            None => reasons.push("Attestation timestamp missing".to_string()),
        }

        if warranty_valid == Some(false) {
            reasons.push("Warranty flag revoked".to_string());
        }

        EvaluationResult::from_reasons(reasons)
    }

    /// Clock drift in either direction counts
    fn is_stale(&self, ts: &Integer, now_ms: i64) -> bool {
        let limit = i128::from(self.timeout_seconds) * 1000;

        match ts.as_i64() {
            Some(ts) => (i128::from(now_ms) - i128::from(ts)).abs() > limit,
            // beyond i64 milliseconds is beyond any timeout
            None => true,
        }
    }
}
