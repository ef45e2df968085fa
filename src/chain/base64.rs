// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::error::Error;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use pem::{EncodeConfig, LineEnding, Pem};

// Padding and trailing bits are accepted on decode; canonical form is
// enforced afterwards by re-encoding.
const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_allow_trailing_bits(true)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// decodes one certificate segment of the wire payload.  Both the standard
/// and the URL-safe alphabet are accepted, padding is optional, and the
/// segment must survive a decode/encode round trip in its own alphabet.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, Error> {
    let engine = if segment.contains(|c| c == '-' || c == '_') {
        &URL_SAFE
    } else {
        &STANDARD
    };

    let decoded = engine
        .decode(segment)
        .map_err(|_| Error::MalformedInput("Invalid base64-encoded certificate".to_string()))?;

    if decoded.is_empty() {
        return Err(Error::MalformedInput(
            "Empty certificate segment".to_string(),
        ));
    }

    let reencoded = engine.encode(&decoded);

    if reencoded.trim_end_matches('=') != segment.trim_end_matches('=') {
        return Err(Error::MalformedInput(
            "Malformed base64 certificate segment".to_string(),
        ));
    }

    Ok(decoded)
}

/// PEM framing of a DER certificate, 64 columns per line
pub fn to_pem(der: &[u8]) -> String {
    let config = EncodeConfig::new().set_line_ending(LineEnding::LF);
    pem::encode_config(&Pem::new("CERTIFICATE", der), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_and_url_safe() {
        assert_eq!(decode_segment("+/8="), Ok(vec![0xfb, 0xff]));
        assert_eq!(decode_segment("+/8"), Ok(vec![0xfb, 0xff]));
        assert_eq!(decode_segment("-_8"), Ok(vec![0xfb, 0xff]));
        assert_eq!(decode_segment("-_8="), Ok(vec![0xfb, 0xff]));
    }

    #[test]
    fn mixed_alphabets() {
        assert_eq!(
            decode_segment("+_8="),
            Err(Error::MalformedInput(
                "Invalid base64-encoded certificate".to_string()
            ))
        );
    }

    #[test]
    fn non_canonical() {
        // 'R' leaves non-zero trailing bits, canonical form is "QQ=="
        assert_eq!(
            decode_segment("QR=="),
            Err(Error::MalformedInput(
                "Malformed base64 certificate segment".to_string()
            ))
        );
    }

    #[test]
    fn empty_and_garbage() {
        assert_eq!(
            decode_segment(""),
            Err(Error::MalformedInput("Empty certificate segment".to_string()))
        );
        assert!(decode_segment("not base64!").is_err());
    }

    #[test]
    fn pem_lines() {
        let pem = to_pem(&[0u8; 60]);
        let lines: Vec<&str> = pem.lines().collect();

        assert_eq!(lines[0], "-----BEGIN CERTIFICATE-----");
        assert_eq!(lines[1].len(), 64);
        assert_eq!(lines[2].len(), 16);
        assert_eq!(lines[3], "-----END CERTIFICATE-----");
        assert!(!pem.contains('\r'));
    }
}
