// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Fixtures shared by the unit tests: a minimal DER writer, a
//! KeyDescription builder and a factory of signed attestation chains.

use crate::attestation::ATTESTATION_OID;
use crate::chain::PROVISIONING_INFO_OID;
use crate::store::{RevocationMap, TrustAnchorSet, TrustSnapshot};
use base64::{engine::general_purpose, Engine as _};
use openssl::asn1::{Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509Extension, X509Name, X509NameBuilder, X509};

pub mod der {
    fn len(n: usize) -> Vec<u8> {
        if n < 0x80 {
            vec![n as u8]
        } else if n < 0x100 {
            vec![0x81, n as u8]
        } else if n < 0x10000 {
            vec![0x82, (n >> 8) as u8, n as u8]
        } else {
            vec![0x83, (n >> 16) as u8, (n >> 8) as u8, n as u8]
        }
    }

    pub fn tlv(tag: &[u8], content: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend(len(content.len()));
        out.extend_from_slice(content);
        out
    }

    fn minimal(v: i64) -> Vec<u8> {
        let b = v.to_be_bytes();
        let mut i = 0;
        while i < 7 {
            let redundant = (b[i] == 0x00 && b[i + 1] & 0x80 == 0)
                || (b[i] == 0xff && b[i + 1] & 0x80 != 0);
            if !redundant {
                break;
            }
            i += 1;
        }
        b[i..].to_vec()
    }

    pub fn int(v: i64) -> Vec<u8> {
        tlv(&[0x02], &minimal(v))
    }

    pub fn enumerated(v: u64) -> Vec<u8> {
        let mut c: Vec<u8> = v.to_be_bytes().iter().copied().skip_while(|b| *b == 0).collect();
        if c.is_empty() || c[0] & 0x80 != 0 {
            c.insert(0, 0);
        }
        tlv(&[0x0a], &c)
    }

    pub fn boolean(v: bool) -> Vec<u8> {
        tlv(&[0x01], &[if v { 0xff } else { 0x00 }])
    }

    pub fn octets(v: &[u8]) -> Vec<u8> {
        tlv(&[0x04], v)
    }

    pub fn null() -> Vec<u8> {
        vec![0x05, 0x00]
    }

    pub fn seq(items: &[Vec<u8>]) -> Vec<u8> {
        tlv(&[0x30], &items.concat())
    }

    pub fn set(items: &[Vec<u8>]) -> Vec<u8> {
        tlv(&[0x31], &items.concat())
    }

    /// `[tag] EXPLICIT`, context-specific and constructed
    pub fn explicit(tag: u32, inner: Vec<u8>) -> Vec<u8> {
        if tag < 31 {
            return tlv(&[0xa0 | tag as u8], &inner);
        }

        let mut id = vec![];
        let mut t = tag;
        id.push((t & 0x7f) as u8);
        t >>= 7;
        while t > 0 {
            id.push(0x80 | (t & 0x7f) as u8);
            t >>= 7;
        }
        id.push(0xbf);
        id.reverse();

        tlv(&id, &inner)
    }
}

pub const TE: u64 = 1;
pub const SOFTWARE: u64 = 0;
pub const VERIFIED: u64 = 0;
pub const UNVERIFIED: u64 = 2;

/// Builds DER KeyDescriptions.  The default is a healthy TEE attestation:
/// both levels TrustedEnvironment, generated key, locked and verified boot,
/// a binary challenge.  It has no creation time.
pub struct KeyDescriptionBuilder {
    attestation_level: u64,
    keymaster_level: u64,
    challenge: Vec<u8>,
    unique_id: Vec<u8>,
    sw: Vec<(u32, Vec<u8>)>,
    hw: Vec<(u32, Vec<u8>)>,
}

fn put(list: &mut Vec<(u32, Vec<u8>)>, tag: u32, value: Vec<u8>) {
    list.retain(|(t, _)| *t != tag);
    list.push((tag, value));
}

impl KeyDescriptionBuilder {
    pub fn new() -> Self {
        let mut b = KeyDescriptionBuilder {
            attestation_level: TE,
            keymaster_level: TE,
            challenge: vec![0x9a; 16],
            unique_id: vec![],
            sw: vec![],
            hw: vec![],
        };
        b.hw(1, der::set(&[der::int(2), der::int(3)]))
            .hw(2, der::int(3))
            .hw(3, der::int(256))
            .hw(702, der::int(0))
            .root_of_trust(true, VERIFIED)
            .hw(705, der::int(140000))
            .hw(706, der::int(202401));
        b
    }

    pub fn sw(&mut self, tag: u32, value: Vec<u8>) -> &mut Self {
        put(&mut self.sw, tag, value);
        self
    }

    pub fn hw(&mut self, tag: u32, value: Vec<u8>) -> &mut Self {
        put(&mut self.hw, tag, value);
        self
    }

    pub fn without_hw(&mut self, tag: u32) -> &mut Self {
        self.hw.retain(|(t, _)| *t != tag);
        self
    }

    pub fn security_levels(&mut self, attestation: u64, keymaster: u64) -> &mut Self {
        self.attestation_level = attestation;
        self.keymaster_level = keymaster;
        self
    }

    pub fn challenge(&mut self, c: &[u8]) -> &mut Self {
        self.challenge = c.to_vec();
        self
    }

    pub fn unique_id(&mut self, u: &[u8]) -> &mut Self {
        self.unique_id = u.to_vec();
        self
    }

    pub fn creation(&mut self, ms: i64) -> &mut Self {
        self.sw(701, der::int(ms))
    }

    pub fn hw_creation(&mut self, ms: i64) -> &mut Self {
        self.hw(701, der::int(ms))
    }

    pub fn origin(&mut self, o: i64) -> &mut Self {
        self.hw(702, der::int(o))
    }

    pub fn root_of_trust(&mut self, locked: bool, state: u64) -> &mut Self {
        self.hw(
            704,
            der::seq(&[
                der::octets(&[0x11; 32]),
                der::boolean(locked),
                der::enumerated(state),
                der::octets(&[0x22; 32]),
            ]),
        )
    }

    pub fn serial(&mut self, s: &[u8]) -> &mut Self {
        self.hw(713, der::octets(s))
    }

    pub fn model(&mut self, m: &[u8]) -> &mut Self {
        self.hw(717, der::octets(m))
    }

    pub fn product(&mut self, p: &[u8]) -> &mut Self {
        self.hw(712, der::octets(p))
    }

    pub fn manufacturer(&mut self, m: &[u8]) -> &mut Self {
        self.hw(716, der::octets(m))
    }

    pub fn app_id(&mut self, package: &[u8], version: i64) -> &mut Self {
        let app = der::seq(&[
            der::set(&[der::seq(&[der::octets(package), der::int(version)])]),
            der::set(&[der::octets(&[0xab; 32])]),
        ]);
        self.sw(709, der::octets(&app))
    }

    pub fn raw_app_id(&mut self, raw: &[u8]) -> &mut Self {
        self.sw(709, der::octets(raw))
    }

    fn list(items: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let mut sorted = items.to_vec();
        sorted.sort_by_key(|(t, _)| *t);
        der::seq(
            &sorted
                .into_iter()
                .map(|(t, v)| der::explicit(t, v))
                .collect::<Vec<_>>(),
        )
    }

    pub fn encode(&self) -> Vec<u8> {
        der::seq(&[
            der::int(200),
            der::enumerated(self.attestation_level),
            der::int(200),
            der::enumerated(self.keymaster_level),
            der::octets(&self.challenge),
            der::octets(&self.unique_id),
            Self::list(&self.sw),
            Self::list(&self.hw),
        ])
    }
}

pub fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn name(entries: &[(Nid, &str)]) -> X509Name {
    let mut b = X509NameBuilder::new().unwrap();
    for (nid, v) in entries {
        b.append_entry_by_nid(*nid, v).unwrap();
    }
    b.build()
}

fn extension(oid: &str, value: &[u8]) -> X509Extension {
    let obj = Asn1Object::from_str(oid).unwrap();
    let os = Asn1OctetString::new_from_bytes(value).unwrap();
    X509Extension::new_from_der(&obj, false, &os).unwrap()
}

pub fn sign_cert(
    subject: &[(Nid, &str)],
    issuer: &[(Nid, &str)],
    key: &PKey<Private>,
    signer: &PKey<Private>,
    serial: u32,
    exts: &[(&str, Vec<u8>)],
) -> X509 {
    let mut b = X509::builder().unwrap();
    b.set_version(2).unwrap();
    let sn = BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap();
    b.set_serial_number(&sn).unwrap();
    b.set_subject_name(&name(subject)).unwrap();
    b.set_issuer_name(&name(issuer)).unwrap();
    b.set_pubkey(key).unwrap();
    b.set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    b.set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    for (oid, v) in exts {
        b.append_extension(extension(oid, v)).unwrap();
    }
    b.sign(signer, MessageDigest::sha256()).unwrap();
    b.build()
}

/// Which certificate in the chain, counted from the leaf
pub type Position = usize;

/// Builds a signed chain, leaf first.  Factory chains have four
/// certificates with `serialNumber`+`title` intermediates; remote chains
/// have five with `CN`+`O` intermediates and a provisioning info extension.
pub struct ChainBuilder {
    remote: bool,
    key_description: Vec<u8>,
    attestation_on: Vec<Position>,
    provisioning_on: Vec<Position>,
    factory_subject_on: Vec<Position>,
    first_serial: u32,
}

pub const FIRST_SERIAL: u32 = 1000;

impl ChainBuilder {
    pub fn factory() -> Self {
        ChainBuilder {
            remote: false,
            key_description: KeyDescriptionBuilder::new().encode(),
            attestation_on: vec![0],
            provisioning_on: vec![],
            factory_subject_on: vec![1, 2],
            first_serial: FIRST_SERIAL,
        }
    }

    pub fn remote() -> Self {
        ChainBuilder {
            remote: true,
            key_description: KeyDescriptionBuilder::new().encode(),
            attestation_on: vec![0],
            provisioning_on: vec![1],
            factory_subject_on: vec![],
            first_serial: FIRST_SERIAL,
        }
    }

    pub fn key_description(mut self, kd: Vec<u8>) -> Self {
        self.key_description = kd;
        self
    }

    pub fn attestation_on(mut self, at: &[Position]) -> Self {
        self.attestation_on = at.to_vec();
        self
    }

    pub fn provisioning_on(mut self, at: &[Position]) -> Self {
        self.provisioning_on = at.to_vec();
        self
    }

    pub fn factory_subject_on(mut self, at: &[Position]) -> Self {
        self.factory_subject_on = at.to_vec();
        self
    }

    /// Serial of the leaf; each certificate up the chain adds one
    pub fn first_serial(mut self, serial: u32) -> Self {
        self.first_serial = serial;
        self
    }

    fn subject(&self, i: Position, len: usize) -> Vec<(Nid, &'static str)> {
        const SERIALS: [&str; 5] = [
            "f92009e853b6b045",
            "87f4514475ba0a2b",
            "c6047571d8f0d17c",
            "e18c4f2ca699739a",
            "2c3e4bd0a7c1b5d9",
        ];

        if i == len - 1 {
            return vec![(Nid::SERIALNUMBER, SERIALS[0])];
        }
        if i == 0 {
            return vec![(Nid::COMMONNAME, "Android Keystore Key")];
        }
        if self.factory_subject_on.contains(&i) {
            return vec![(Nid::SERIALNUMBER, SERIALS[i]), (Nid::TITLE, "TEE")];
        }
        const CAS: [&str; 5] = ["", "Droid CA3", "Droid CA2", "Droid CA1", ""];
        vec![
            (Nid::COMMONNAME, CAS[i]),
            (Nid::ORGANIZATIONNAME, "Google LLC"),
        ]
    }

    pub fn build(&self) -> TestChain {
        let len = if self.remote { 5 } else { 4 };
        let keys: Vec<PKey<Private>> = (0..len).map(|_| ec_key()).collect();

        let mut certs = Vec::with_capacity(len);
        for i in 0..len {
            let issuer = if i == len - 1 { i } else { i + 1 };

            let mut exts = vec![];
            if self.attestation_on.contains(&i) {
                exts.push((ATTESTATION_OID, self.key_description.clone()));
            }
            if self.provisioning_on.contains(&i) {
                // CBOR map {1: 1}
                exts.push((PROVISIONING_INFO_OID, vec![0xa1, 0x01, 0x01]));
            }

            certs.push(sign_cert(
                &self.subject(i, len),
                &self.subject(issuer, len),
                &keys[i],
                &keys[issuer],
                self.first_serial + i as u32,
                &exts,
            ));
        }

        TestChain {
            ders: certs.iter().map(|c| c.to_der().unwrap()).collect(),
            keys,
        }
    }
}

pub struct TestChain {
    pub ders: Vec<Vec<u8>>,
    pub keys: Vec<PKey<Private>>,
}

impl TestChain {
    pub fn payload(&self) -> String {
        self.ders
            .iter()
            .map(|d| general_purpose::STANDARD.encode(d))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn url_safe_payload(&self) -> String {
        self.ders
            .iter()
            .map(|d| general_purpose::URL_SAFE_NO_PAD.encode(d))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn root_pem(&self) -> String {
        let root = self.ders.last().unwrap();
        String::from_utf8(X509::from_der(root).unwrap().to_pem().unwrap()).unwrap()
    }

    /// Corrupt the signature of the certificate at `i`
    pub fn flip_signature(&mut self, i: Position) {
        let der = &mut self.ders[i];
        let last = der.len() - 1;
        der[last] ^= 0x01;
    }

    pub fn anchors(&self) -> TrustAnchorSet {
        TrustAnchorSet::from_pems(&[self.root_pem()])
    }

    /// A snapshot trusting this chain's root, with an empty revocation map
    pub fn snapshot(&self) -> TrustSnapshot {
        TrustSnapshot::new(self.anchors(), Some(RevocationMap::default()))
    }
}
