// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::parser::CertificateChain;
use crate::error::Error;
use crate::store::{RevocationMap, Status};
use tracing::{info, warn};

/// Look every non-root serial up in the revocation map.  Only an entry with
/// status REVOKED fails the chain; unknown serials pass.
pub fn check_revocation(chain: &CertificateChain, revocations: &RevocationMap) -> Result<(), Error> {
    for (i, entry) in chain.non_root().iter().enumerate() {
        let (dec, hex) = match (entry.serial_decimal(), entry.serial_hex()) {
            (Some(dec), Some(hex)) => (dec, hex),
            _ => continue,
        };

        let status = match revocations.lookup(&dec, &hex) {
            Some(s) => s,
            None => continue,
        };

        match status.status {
            Status::Revoked => {
                warn!(position = i, serial = %dec, reason = ?status.reason, "revoked certificate in chain");
                return Err(Error::CertificateRevoked(
                    "Certificate has been revoked".to_string(),
                ));
            }
            _ => {
                info!(position = i, serial = %dec, status = ?status.status, "certificate has a non-revoking status entry");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::parse;
    use crate::testutil::{ChainBuilder, FIRST_SERIAL};

    fn map(j: &str) -> RevocationMap {
        RevocationMap::load_json(j).unwrap()
    }

    #[test]
    fn revoked_intermediate() {
        let chain = ChainBuilder::factory().build();
        let c = parse(Some(&chain.payload())).unwrap();
        let j = format!(
            r#"{{"entries": {{"{}": {{"status": "REVOKED", "reason": "KEY_COMPROMISE"}}}}}}"#,
            FIRST_SERIAL + 1
        );

        assert_eq!(
            check_revocation(&c, &map(&j)),
            Err(Error::CertificateRevoked(
                "Certificate has been revoked".to_string()
            ))
        );
    }

    #[test]
    fn revoked_by_hex_serial() {
        let chain = ChainBuilder::remote().build();
        let c = parse(Some(&chain.payload())).unwrap();
        // 1000 is the leaf
        let j = r#"{"entries": {"3e8": {"status": "REVOKED"}}}"#;

        assert!(check_revocation(&c, &map(j)).is_err());
    }

    #[test]
    fn digit_only_hex_serial_does_not_alias() {
        // leaf 4096 is 0x1000, intermediates are 4097.. (0x1001..)
        let chain = ChainBuilder::factory().first_serial(4096).build();
        let c = parse(Some(&chain.payload())).unwrap();
        let j = r#"{"entries": {"1000": {"status": "REVOKED"}}}"#;

        assert_eq!(c.leaf().serial_hex().as_deref(), Some("1000"));
        assert_eq!(check_revocation(&c, &map(j)), Ok(()));

        let j = r#"{"entries": {"4096": {"status": "REVOKED"}}}"#;
        assert!(check_revocation(&c, &map(j)).is_err());
    }

    #[test]
    fn root_is_not_checked() {
        let chain = ChainBuilder::factory().build();
        let c = parse(Some(&chain.payload())).unwrap();
        let j = format!(
            r#"{{"entries": {{"{}": {{"status": "REVOKED"}}}}}}"#,
            FIRST_SERIAL + 3
        );

        assert_eq!(check_revocation(&c, &map(&j)), Ok(()));
    }

    #[test]
    fn suspended_and_absent_pass() {
        let chain = ChainBuilder::factory().build();
        let c = parse(Some(&chain.payload())).unwrap();
        let j = format!(
            r#"{{"entries": {{"{}": {{"status": "SUSPENDED"}}, "42": {{"status": "REVOKED"}}}}}}"#,
            FIRST_SERIAL
        );

        assert_eq!(check_revocation(&c, &map(&j)), Ok(()));
        assert_eq!(check_revocation(&c, &RevocationMap::default()), Ok(()));
    }
}
