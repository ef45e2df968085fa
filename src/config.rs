// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::policy::{Policy, DEFAULT_TIMEOUT_SECONDS};
use clap::builder::BoolishValueParser;
use serde::{Deserialize, Serialize};

/// Verifier settings.  In JSON form:
///
/// ```json
/// {
///   "attestation-timeout-seconds": 600,
///   "enforce-remote-provisioning": false,
///   "debug-attestation": false
/// }
/// ```
///
/// Every key is optional.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Maximum attestation age; 0 disables the freshness check
    pub attestation_timeout_seconds: u64,
    /// Require remotely provisioned chains to carry provisioning info
    pub enforce_remote_provisioning: bool,
    /// Attach a debug tree to every outcome
    pub debug_attestation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            attestation_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            enforce_remote_provisioning: false,
            debug_attestation: false,
        }
    }
}

impl Config {
    pub fn load_json(j: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(j)
    }

    pub fn policy(&self) -> Policy {
        Policy::new(self.attestation_timeout_seconds)
    }
}

/// Command line settings, each also read from the environment
#[derive(Clone, Debug, Default, clap::Args)]
pub struct ConfigArgs {
    /// Maximum attestation age in seconds, 0 to disable
    #[arg(short, long, env = "ATTESTATION_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Check the provisioning path of remotely provisioned chains
    #[arg(long, env = "ENFORCE_REMOTE_KEY_PROVISION", value_parser = BoolishValueParser::new())]
    pub enforce_rkp: bool,

    /// Attach and print the decoded key description
    #[arg(short, long, env = "DEBUG_ATTESTATION", value_parser = BoolishValueParser::new())]
    pub debug: bool,
}

impl ConfigArgs {
    /// `base` with these settings laid over it
    pub fn apply(&self, base: Config) -> Config {
        Config {
            attestation_timeout_seconds: self.timeout.unwrap_or(base.attestation_timeout_seconds),
            enforce_remote_provisioning: base.enforce_remote_provisioning || self.enforce_rkp,
            debug_attestation: base.debug_attestation || self.debug,
        }
    }
}
