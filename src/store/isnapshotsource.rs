// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::snapshot::TrustSnapshot;
use std::sync::Arc;

/// Interface to whatever holds the trust data currently in force.
pub trait ISnapshotSource {
    /// The snapshot a verification call should use from start to finish
    fn current(&self) -> Arc<TrustSnapshot>;
}
