// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Device identity derived from an attestation: the attestation IDs, with
//! the challenge convention `<warranty flag>,<model:8><serial>` filling
//! whatever the IDs leave unset.

use crate::attestation::{AuthorizationList, Bytes, KeyDescription};
use serde::Serialize;

/// Length of the model prefix in the challenge payload
const CHALLENGE_MODEL_LEN: usize = 8;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_model: Option<String>,
    pub device_serial: Option<String>,
    pub manufacturer: Option<String>,
    /// `None` when the challenge carries no warranty flag
    pub warranty_valid: Option<bool>,
    pub warranty_raw: Option<String>,
}

/// The device as it appears in the access log: every field a string, empty
/// when unknown.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLog {
    pub model: String,
    pub serial: String,
    pub manufacturer: String,
    pub warranty_flag: String,
}

/// Printable, non-empty attestation ID
fn id_text(v: &Option<Bytes>) -> Option<String> {
    v.as_ref()
        .and_then(|b| b.printable())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Hardware-enforced value first, then the software-enforced one
fn attestation_id<F>(kd: &KeyDescription, field: F) -> Option<String>
where
    F: Fn(&AuthorizationList) -> &Option<Bytes>,
{
    id_text(field(&kd.hardware_enforced)).or_else(|| id_text(field(&kd.software_enforced)))
}

impl DeviceInfo {
    pub fn extract(kd: Option<&KeyDescription>) -> DeviceInfo {
        let kd = match kd {
            Some(kd) => kd,
            None => return DeviceInfo::default(),
        };

        let mut info = DeviceInfo {
            device_serial: attestation_id(kd, |l| &l.attestation_id_serial),
            device_model: attestation_id(kd, |l| &l.attestation_id_model)
                .or_else(|| attestation_id(kd, |l| &l.attestation_id_product)),
            manufacturer: attestation_id(kd, |l| &l.attestation_id_manufacturer),
            ..Default::default()
        };

        if let Some(challenge) = kd.attestation_challenge.printable() {
            info.overlay_challenge(challenge);
        }

        info
    }

    /// Reads `<flag>,<model><serial>`.  A challenge without a comma is an
    /// opaque nonce and contributes nothing.
    fn overlay_challenge(&mut self, challenge: &str) {
        let (flag, rest) = match challenge.split_once(',') {
            Some(parts) => parts,
            None => return,
        };

        if !flag.is_empty() {
            self.warranty_raw = Some(flag.to_string());
            self.warranty_valid = Some(flag == "1");
        }

        let payload = match rest.split(',').next().map(str::trim) {
            Some(p) if !p.is_empty() => p,
            _ => return,
        };

        // printable ASCII, so byte offsets are char offsets
        let model = (payload.len() >= CHALLENGE_MODEL_LEN).then(|| &payload[..CHALLENGE_MODEL_LEN]);
        let serial = if payload.len() > CHALLENGE_MODEL_LEN {
            &payload[CHALLENGE_MODEL_LEN..]
        } else {
            payload
        };

        if self.device_model.is_none() {
            self.device_model = model.map(str::to_string);
        }

        if self.device_serial.is_none() {
            self.device_serial = Some(serial.to_string());
        }
    }

    pub fn to_log(&self) -> DeviceLog {
        DeviceLog {
            model: self.device_model.clone().unwrap_or_default(),
            serial: self.device_serial.clone().unwrap_or_default(),
            manufacturer: self.manufacturer.clone().unwrap_or_default(),
            warranty_flag: self.warranty_raw.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::KeyDescriptionBuilder;

    fn extract(b: &KeyDescriptionBuilder) -> DeviceInfo {
        let kd = KeyDescription::decode(&b.encode()).unwrap();
        DeviceInfo::extract(Some(&kd))
    }

    #[test]
    fn challenge_overlay() {
        let info = extract(KeyDescriptionBuilder::new().challenge(b"1,ABCDEFGH1234567890"));

        assert_eq!(info.device_model.as_deref(), Some("ABCDEFGH"));
        assert_eq!(info.device_serial.as_deref(), Some("1234567890"));
        assert_eq!(info.warranty_valid, Some(true));
        assert_eq!(info.warranty_raw.as_deref(), Some("1"));
    }

    #[test]
    fn attestation_ids_win() {
        let info = extract(
            KeyDescriptionBuilder::new()
                .challenge(b"0, ABCDEFGH1234567890 ")
                .serial(b"HWSERIAL")
                .product(b"oriole")
                .manufacturer(b"Google"),
        );

        assert_eq!(info.device_serial.as_deref(), Some("HWSERIAL"));
        assert_eq!(info.device_model.as_deref(), Some("oriole"));
        assert_eq!(info.manufacturer.as_deref(), Some("Google"));
        assert_eq!(info.warranty_valid, Some(false));
    }

    #[test]
    fn software_list_fallback() {
        let mut b = KeyDescriptionBuilder::new();
        b.sw(713, crate::testutil::der::octets(b"SWSERIAL"))
            .model(b"Pixel 8");

        let info = extract(&b);

        assert_eq!(info.device_serial.as_deref(), Some("SWSERIAL"));
        assert_eq!(info.device_model.as_deref(), Some("Pixel 8"));
    }

    #[test]
    fn short_payload_is_serial_only() {
        let info = extract(KeyDescriptionBuilder::new().challenge(b"1,ABC"));

        assert_eq!(info.device_model, None);
        assert_eq!(info.device_serial.as_deref(), Some("ABC"));

        let info = extract(KeyDescriptionBuilder::new().challenge(b"1,ABCDEFGH"));

        assert_eq!(info.device_model.as_deref(), Some("ABCDEFGH"));
        assert_eq!(info.device_serial.as_deref(), Some("ABCDEFGH"));
    }

    #[test]
    fn no_parseable_challenge() {
        let info = extract(KeyDescriptionBuilder::new().challenge(&[0x00, 0x01, 0xff]));
        assert_eq!(info.warranty_valid, None);
        assert_eq!(info.to_log(), DeviceLog::default());

        let info = extract(KeyDescriptionBuilder::new().challenge(b"nonce"));
        assert_eq!(info.warranty_valid, None);
        assert_eq!(info.warranty_raw, None);
        assert_eq!(info.device_serial, None);

        let info = extract(KeyDescriptionBuilder::new().challenge(b",ABCDEFGH42"));
        assert_eq!(info.warranty_valid, None);
        assert_eq!(info.device_serial.as_deref(), Some("42"));

        assert_eq!(DeviceInfo::extract(None), DeviceInfo::default());
    }

    #[test]
    fn log_fields() {
        let info = extract(
            KeyDescriptionBuilder::new()
                .challenge(b"1,ABCDEFGH1234567890")
                .manufacturer(b"Google"),
        );

        let j = serde_json::to_value(info.to_log()).unwrap();

        assert_eq!(
            j,
            serde_json::json!({
                "model": "ABCDEFGH",
                "serial": "1234567890",
                "manufacturer": "Google",
                "warrantyFlag": "1"
            })
        );
    }
}
