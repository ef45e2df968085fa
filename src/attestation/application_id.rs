// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::bytes::Bytes;
use super::common::*;
use super::errors::Error;
use serde::ser::{Serialize, SerializeStruct, Serializer};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageInfo {
    pub package_name: Bytes,
    pub version_code: Integer,
}

/// AttestationApplicationId ::= SEQUENCE {
///     package_infos     SET OF AttestationPackageInfo,
///     signature_digests SET OF OCTET_STRING,
/// }
///
/// The value travels as an OCTET STRING inside the authorization list and is
/// decoded in a second pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationApplicationId {
    pub packages: Vec<PackageInfo>,
    pub signature_digests: Vec<Bytes>,
}

impl AttestationApplicationId {
    pub fn decode(buf: &[u8]) -> Result<AttestationApplicationId, Error> {
        let v = parse_one(buf, "attestationApplicationId")?;
        let items = to_seq(&v, "attestationApplicationId")?;

        if items.len() != 2 {
            return Err(Error::Syntax(format!(
                "attestationApplicationId: expecting 2 items, got {}",
                items.len()
            )));
        }

        let mut packages = Vec::new();

        for (i, p) in to_set(&items[0], "package_infos")?.iter().enumerate() {
            let info = to_seq(p, "package_info")?;

            if info.len() != 2 {
                return Err(Error::Syntax(format!(
                    "package_info[{i}]: expecting 2 items, got {}",
                    info.len()
                )));
            }

            packages.push(PackageInfo {
                package_name: to_bstr(&info[0], "package_name")?,
                version_code: to_int(&info[1], "version")?,
            });
        }

        if packages.is_empty() {
            return Err(Error::Sema(
                "package_infos: expecting at least one package".to_string(),
            ));
        }

        let signature_digests = to_set(&items[1], "signature_digests")?
            .iter()
            .map(|d| to_bstr(d, "signature_digest"))
            .collect::<Result<Vec<Bytes>, Error>>()?;

        Ok(AttestationApplicationId {
            packages,
            signature_digests,
        })
    }

    /// Name of the first attested package, when printable
    pub fn package_name(&self) -> Option<&str> {
        self.packages.first().and_then(|p| p.package_name.printable())
    }

    pub fn version_code(&self) -> Option<&Integer> {
        self.packages.first().map(|p| &p.version_code)
    }

    pub fn signature_digest(&self) -> Option<&Bytes> {
        self.signature_digests.first()
    }
}

impl Serialize for AttestationApplicationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("AttestationApplicationId", 3)?;
        s.serialize_field("packageName", &self.package_name())?;
        s.serialize_field("versionCode", &self.version_code())?;
        s.serialize_field("signatureDigest", &self.signature_digest())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::der;

    fn encode(name: &[u8], version: i64, digests: &[&[u8]]) -> Vec<u8> {
        der::seq(&[
            der::set(&[der::seq(&[der::octets(name), der::int(version)])]),
            der::set(&digests.iter().map(|d| der::octets(d)).collect::<Vec<_>>()),
        ])
    }

    #[test]
    fn decode_ok() {
        let buf = encode(b"com.example.app", 42, &[&[0xab; 32]]);

        let app = AttestationApplicationId::decode(&buf).unwrap();

        assert_eq!(app.package_name(), Some("com.example.app"));
        assert_eq!(app.version_code(), Some(&Integer::Small(42)));
        assert_eq!(app.signature_digest().map(|d| d.len()), Some(32));

        let j = serde_json::to_value(&app).unwrap();
        assert_eq!(j["packageName"], "com.example.app");
        assert_eq!(j["versionCode"], 42);
        assert_eq!(j["signatureDigest"], "ab".repeat(32));
    }

    #[test]
    fn no_digest() {
        let buf = encode(b"com.example.app", 1, &[]);

        let app = AttestationApplicationId::decode(&buf).unwrap();

        assert!(app.signature_digest().is_none());
    }

    #[test]
    fn no_package() {
        let buf = der::seq(&[der::set(&[]), der::set(&[])]);

        assert!(AttestationApplicationId::decode(&buf).is_err());
    }
}
