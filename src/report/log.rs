// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::device::DeviceLog;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyLog {
    pub attestation_timeout_seconds: u64,
}

/// Access log record, one per verification regardless of its result
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEnvelope {
    pub event: &'static str,
    pub status: u16,
    pub reason: String,
    pub device: DeviceLog,
    pub evaluation_issues: Vec<String>,
    /// Internal error message; empty unless the pipeline failed
    pub error: String,
    pub policy: PolicyLog,
}

impl LogEnvelope {
    pub fn new(status: u16, reason: &str, timeout_seconds: u64) -> Self {
        LogEnvelope {
            event: "verify",
            status,
            reason: reason.to_string(),
            device: DeviceLog::default(),
            evaluation_issues: vec![],
            error: String::new(),
            policy: PolicyLog {
                attestation_timeout_seconds: timeout_seconds,
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
