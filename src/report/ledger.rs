// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::attestation::{AuthorizationList, Integer, KeyDescription, SecurityLevel};
use crate::device::DeviceInfo;
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};

/// `{text, base64, hex}`, all empty for an empty challenge
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChallengeDescriptor {
    pub text: String,
    pub base64: String,
    pub hex: String,
}

/// Field-by-field copy of a KeyDescription as persisted in the device
/// ledger.  Both authorization lists carry every field, `null` when absent.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDescriptionSnapshot {
    pub attestation_version: Integer,
    pub attestation_security_level: SecurityLevel,
    pub keymaster_version: Integer,
    pub keymaster_security_level: SecurityLevel,
    pub attestation_challenge: ChallengeDescriptor,
    #[serde_as(as = "Hex")]
    pub unique_id: Vec<u8>,
    pub software_enforced: AuthorizationList,
    pub hardware_enforced: AuthorizationList,
}

impl From<&KeyDescription> for KeyDescriptionSnapshot {
    fn from(kd: &KeyDescription) -> Self {
        let challenge = &kd.attestation_challenge;

        KeyDescriptionSnapshot {
            attestation_version: kd.attestation_version.clone(),
            attestation_security_level: kd.attestation_security_level,
            keymaster_version: kd.keymaster_version.clone(),
            keymaster_security_level: kd.keymaster_security_level,
            attestation_challenge: ChallengeDescriptor {
                text: challenge.printable().unwrap_or_default().to_string(),
                base64: challenge.to_base64(),
                hex: challenge.to_hex(),
            },
            unique_id: kd.unique_id.as_slice().to_vec(),
            software_enforced: kd.software_enforced.clone(),
            hardware_enforced: kd.hardware_enforced.clone(),
        }
    }
}

/// Device ledger record proposed after a successful verification.  Keyed
/// by serial: a later upsert for the same serial replaces this one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerUpsert {
    pub serial: String,
    pub model: Option<String>,
    pub key_description: KeyDescriptionSnapshot,
}

impl LedgerUpsert {
    /// `None` unless the device has a serial to key the record on
    pub fn propose(device: &DeviceInfo, kd: &KeyDescription) -> Option<LedgerUpsert> {
        let serial = device.device_serial.as_deref().filter(|s| !s.is_empty())?;

        Some(LedgerUpsert {
            serial: serial.to_string(),
            model: device.device_model.clone(),
            key_description: kd.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::KeyDescriptionBuilder;

    fn kd(b: &KeyDescriptionBuilder) -> KeyDescription {
        KeyDescription::decode(&b.encode()).unwrap()
    }

    #[test]
    fn propose_keyed_by_serial() {
        let kd = kd(KeyDescriptionBuilder::new()
            .challenge(b"1,ABCDEFGH1234567890")
            .unique_id(&[0xca, 0xfe]));
        let device = DeviceInfo::extract(Some(&kd));

        let u = LedgerUpsert::propose(&device, &kd).unwrap();
        let j = serde_json::to_value(&u).unwrap();

        assert_eq!(j["serial"], "1234567890");
        assert_eq!(j["model"], "ABCDEFGH");

        let snap = &j["keyDescription"];
        assert_eq!(snap["attestationSecurityLevel"], "TrustedEnvironment");
        assert_eq!(snap["uniqueId"], "cafe");
        assert_eq!(
            snap["attestationChallenge"],
            serde_json::json!({
                "text": "1,ABCDEFGH1234567890",
                "base64": "MSxBQkNERUZHSDEyMzQ1Njc4OTA=",
                "hex": hex::encode("1,ABCDEFGH1234567890"),
            })
        );
        assert_eq!(snap["hardwareEnforced"]["keySize"], 256);
        assert!(snap["hardwareEnforced"]["callerNonce"].is_null());
        assert!(snap["softwareEnforced"]
            .as_object()
            .unwrap()
            .contains_key("creationDateTime"));
    }

    #[test]
    fn no_serial_no_upsert() {
        let kd = kd(&KeyDescriptionBuilder::new());
        let device = DeviceInfo::extract(Some(&kd));

        assert!(LedgerUpsert::propose(&device, &kd).is_none());
    }

    #[test]
    fn binary_challenge_has_no_text() {
        let kd = kd(KeyDescriptionBuilder::new().challenge(&[0xff, 0x00]));
        let snap = KeyDescriptionSnapshot::from(&kd);

        assert_eq!(
            snap.attestation_challenge,
            ChallengeDescriptor {
                text: String::new(),
                base64: "/wA=".to_string(),
                hex: "ff00".to_string(),
            }
        );
    }
}
