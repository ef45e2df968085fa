// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Trust data consumed by the verification pipeline: the accepted roots
//! ([`TrustAnchorSet`]), the attestation status list ([`RevocationMap`]) and
//! the [`SnapshotStore`] a refresher publishes both through.

pub use self::errors::Error;
pub use self::isnapshotsource::ISnapshotSource;
pub use self::snapshot::{SnapshotStore, TrustSnapshot};
pub use self::status::{RevocationMap, Status, StatusEntry};
pub use self::trustanchor::{fingerprint, TrustAnchor, TrustAnchorSet};

mod errors;
mod isnapshotsource;
mod snapshot;
mod status;
mod trustanchor;
