// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use openssl::x509::X509NameRef;

/// Renders a distinguished name as `SN=value, SN=value, ...` in encoding
/// order.  Attributes openssl has no short name for are rendered by OID and
/// values that are not text are rendered as hex.
pub fn render_name(name: &X509NameRef) -> String {
    name.entries()
        .map(|e| {
            let key = match e.object().nid().short_name() {
                Ok(sn) => sn.to_string(),
                Err(_) => e.object().to_string(),
            };
            let value = match e.data().as_utf8() {
                Ok(v) => v.to_string(),
                Err(_) => hex::encode(e.data().as_slice()),
            };
            format!("{key}={value}")
        })
        .collect::<Vec<String>>()
        .join(", ")
}

/// Canonical form of a rendered name: split into components on `,` (with an
/// optional preceding `+`), trim, drop empties, sort byte-wise and rejoin.
pub fn normalize_dn(dn: &str) -> String {
    let mut parts: Vec<&str> = dn
        .split(',')
        .map(|p| {
            let p = p.trim_end();
            p.strip_suffix('+').unwrap_or(p).trim()
        })
        .filter(|p| !p.is_empty())
        .collect();

    parts.sort_unstable();
    parts.join(",")
}

/// Issuer/subject equality under [`normalize_dn`].  An empty name never
/// matches.
pub fn names_match(issuer: &str, subject: &str) -> bool {
    if issuer.is_empty() || subject.is_empty() {
        return false;
    }

    normalize_dn(issuer) == normalize_dn(subject)
}
