// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::isnapshotsource::ISnapshotSource;
use super::status::RevocationMap;
use super::trustanchor::TrustAnchorSet;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Trust data a verification call runs against
#[derive(Clone, Debug, Default)]
pub struct TrustSnapshot {
    pub anchors: TrustAnchorSet,
    pub revocations: Option<RevocationMap>,
}

impl TrustSnapshot {
    pub fn new(anchors: TrustAnchorSet, revocations: Option<RevocationMap>) -> Self {
        Self {
            anchors,
            revocations,
        }
    }
}

/// The place refreshed trust data is published to.  Readers get an `Arc` to
/// a whole snapshot; a publication swaps the pointer, it never touches a
/// snapshot someone may be reading.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    p: RwLock<Arc<TrustSnapshot>>,
}

impl SnapshotStore {
    pub fn new(snapshot: TrustSnapshot) -> Self {
        Self {
            p: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: TrustSnapshot) {
        info!(
            anchors = snapshot.anchors.len(),
            revocations = snapshot.revocations.as_ref().map(|r| r.len()),
            "publishing trust snapshot"
        );

        *self.p.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(snapshot);
    }

    /// Replace the anchors, keeping the current revocation map
    pub fn publish_anchors(&self, anchors: TrustAnchorSet) {
        let mut p = self.p.write().unwrap_or_else(|e| e.into_inner());
        *p = Arc::new(TrustSnapshot::new(anchors, p.revocations.clone()));
    }

    /// Replace the revocation map, keeping the current anchors
    pub fn publish_revocations(&self, revocations: RevocationMap) {
        let mut p = self.p.write().unwrap_or_else(|e| e.into_inner());
        *p = Arc::new(TrustSnapshot::new(p.anchors.clone(), Some(revocations)));
    }
}

impl ISnapshotSource for SnapshotStore {
    fn current(&self) -> Arc<TrustSnapshot> {
        self.p.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
