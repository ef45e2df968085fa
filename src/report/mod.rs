// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! What a verification leaves behind besides its response: the access log
//! envelope, the device ledger upsert and the optional debug dump.

pub use self::debug::{
    format_attestation_debug, BufferDescriptor, DebugTree, Node, AUTHORIZATION_FIELDS,
};
pub use self::ledger::{ChallengeDescriptor, KeyDescriptionSnapshot, LedgerUpsert};
pub use self::log::{LogEnvelope, PolicyLog};

mod debug;
mod ledger;
mod log;
