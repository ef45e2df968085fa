// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::attestation::{
    AttestationApplicationId, AuthorizationList, Bytes, Integer, KeyDescription, RootOfTrust,
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashSet;

/// Authorization list fields, in tag order
pub const AUTHORIZATION_FIELDS: &[&str] = &[
    "purpose",
    "algorithm",
    "keySize",
    "blockMode",
    "digest",
    "padding",
    "callerNonce",
    "minMacLength",
    "ecCurve",
    "rsaPublicExponent",
    "rollbackResistance",
    "activeDateTime",
    "originationExpireDateTime",
    "usageExpireDateTime",
    "userSecureId",
    "noAuthRequired",
    "userAuthType",
    "authTimeout",
    "allowWhileOnBody",
    "trustedUserPresenceReq",
    "trustedConfirmationReq",
    "unlockedDeviceReq",
    "allApplications",
    "applicationId",
    "creationDateTime",
    "origin",
    "rollbackResistant",
    "rootOfTrust",
    "osVersion",
    "osPatchLevel",
    "attestationApplicationId",
    "attestationIdBrand",
    "attestationIdDevice",
    "attestationIdProduct",
    "attestationIdSerial",
    "attestationIdImei",
    "attestationIdMeid",
    "attestationIdManufacturer",
    "attestationIdModel",
    "vendorPatchLevel",
    "bootPatchLevel",
    "deviceUniqueAttestation",
    "attestationIdSecondImei",
    "moduleHash",
];

const TOP_FIELDS: &[(&str, bool)] = &[
    ("attestationVersion", false),
    ("attestationSecurityLevel", false),
    ("keymasterVersion", false),
    ("keymasterSecurityLevel", false),
    ("attestationChallenge", true),
    ("uniqueId", true),
];

const TOP_WIDTH: usize = 30;
const LIST_WIDTH: usize = 32;
const DETAIL_WIDTH: usize = 28;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub length: usize,
    pub base64: String,
    pub hex: String,
    pub text: Option<String>,
}

impl From<&Bytes> for BufferDescriptor {
    fn from(b: &Bytes) -> Self {
        BufferDescriptor {
            length: b.len(),
            base64: b.to_base64(),
            hex: b.to_hex(),
            text: b.printable().map(str::to_string),
        }
    }
}

/// A decoded value as shown in debug output.  Fields that were absent are
/// not in their parent map; a present NULL is [`Node::Null`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(Integer),
    Text(String),
    Buffer(BufferDescriptor),
    List(Vec<Node>),
    Map(Vec<(String, Node)>),
}

impl Node {
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Node::Null => serializer.serialize_none(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Int(i) => i.serialize(serializer),
            Node::Text(t) => serializer.serialize_str(t),
            Node::Buffer(d) => {
                let mut m = serializer.serialize_map(None)?;
                m.serialize_entry("length", &d.length)?;
                m.serialize_entry("base64", &d.base64)?;
                m.serialize_entry("hex", &d.hex)?;
                if let Some(t) = &d.text {
                    m.serialize_entry("text", t)?;
                }
                m.end()
            }
            Node::List(items) => items.serialize(serializer),
            Node::Map(fields) => {
                let mut m = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

/// `{"KeyDescription": ...}`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugTree {
    pub key_description: Node,
}

impl Serialize for DebugTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut m = serializer.serialize_map(Some(1))?;
        m.serialize_entry("KeyDescription", &self.key_description)?;
        m.end()
    }
}

#[derive(Default)]
struct Fields(Vec<(String, Node)>);

impl Fields {
    fn put(&mut self, k: &str, v: Node) {
        self.0.push((k.to_string(), v));
    }

    fn int(&mut self, k: &str, v: &Option<Integer>) {
        if let Some(v) = v {
            self.put(k, Node::Int(v.clone()));
        }
    }

    fn ints(&mut self, k: &str, v: &Option<Vec<Integer>>) {
        if let Some(v) = v {
            self.put(k, Node::List(v.iter().cloned().map(Node::Int).collect()));
        }
    }

    fn bytes(&mut self, k: &str, v: &Option<Bytes>) {
        if let Some(v) = v {
            self.put(k, Node::Buffer(v.into()));
        }
    }

    fn flag(&mut self, k: &str, present: bool) {
        if present {
            self.put(k, Node::Null);
        }
    }
}

fn root_of_trust_node(rot: &RootOfTrust) -> Node {
    let mut f = Fields::default();
    f.put("verifiedBootKey", Node::Buffer((&rot.verified_boot_key).into()));
    f.put("deviceLocked", Node::Bool(rot.device_locked));
    f.put(
        "verifiedBootState",
        Node::Text(rot.verified_boot_state.to_string()),
    );
    f.bytes("verifiedBootHash", &rot.verified_boot_hash);
    Node::Map(f.0)
}

fn application_id_node(app: &AttestationApplicationId) -> Node {
    let mut f = Fields::default();
    if let Some(p) = app.packages.first() {
        f.put("packageName", Node::Buffer((&p.package_name).into()));
        f.put("versionCode", Node::Int(p.version_code.clone()));
    }
    if let Some(d) = app.signature_digest() {
        f.put("signatureDigest", Node::Buffer(d.into()));
    }
    Node::Map(f.0)
}

fn authorization_list_node(al: &AuthorizationList) -> Node {
    let mut f = Fields::default();

    f.ints("purpose", &al.purpose);
    f.int("algorithm", &al.algorithm);
    f.int("keySize", &al.key_size);
    f.ints("blockMode", &al.block_mode);
    f.ints("digest", &al.digest);
    f.ints("padding", &al.padding);
    f.flag("callerNonce", al.caller_nonce);
    f.int("minMacLength", &al.min_mac_length);
    f.int("ecCurve", &al.ec_curve);
    f.int("rsaPublicExponent", &al.rsa_public_exponent);
    f.flag("rollbackResistance", al.rollback_resistance);
    f.int("activeDateTime", &al.active_date_time);
    f.int("originationExpireDateTime", &al.origination_expire_date_time);
    f.int("usageExpireDateTime", &al.usage_expire_date_time);
    f.int("userSecureId", &al.user_secure_id);
    f.flag("noAuthRequired", al.no_auth_required);
    f.int("userAuthType", &al.user_auth_type);
    f.int("authTimeout", &al.auth_timeout);
    f.flag("allowWhileOnBody", al.allow_while_on_body);
    f.flag("trustedUserPresenceReq", al.trusted_user_presence_req);
    f.flag("trustedConfirmationReq", al.trusted_confirmation_req);
    f.flag("unlockedDeviceReq", al.unlocked_device_req);
    f.flag("allApplications", al.all_applications);
    f.bytes("applicationId", &al.application_id);
    f.int("creationDateTime", &al.creation_date_time);
    f.int("origin", &al.origin);
    f.flag("rollbackResistant", al.rollback_resistant);
    if let Some(rot) = &al.root_of_trust {
        f.put("rootOfTrust", root_of_trust_node(rot));
    }
    f.int("osVersion", &al.os_version);
    f.int("osPatchLevel", &al.os_patch_level);
    if let Some(app) = &al.attestation_application_id {
        f.put("attestationApplicationId", application_id_node(app));
    }
    f.bytes("attestationIdBrand", &al.attestation_id_brand);
    f.bytes("attestationIdDevice", &al.attestation_id_device);
    f.bytes("attestationIdProduct", &al.attestation_id_product);
    f.bytes("attestationIdSerial", &al.attestation_id_serial);
    f.bytes("attestationIdImei", &al.attestation_id_imei);
    f.bytes("attestationIdMeid", &al.attestation_id_meid);
    f.bytes("attestationIdManufacturer", &al.attestation_id_manufacturer);
    f.bytes("attestationIdModel", &al.attestation_id_model);
    f.int("vendorPatchLevel", &al.vendor_patch_level);
    f.int("bootPatchLevel", &al.boot_patch_level);
    f.flag("deviceUniqueAttestation", al.device_unique_attestation);
    f.bytes("attestationIdSecondImei", &al.attestation_id_second_imei);
    f.bytes("moduleHash", &al.module_hash);

    Node::Map(f.0)
}

impl DebugTree {
    pub fn new(kd: &KeyDescription) -> DebugTree {
        let challenge = match kd.attestation_challenge.printable() {
            Some(text) => Node::Text(text.to_string()),
            None => Node::Buffer((&kd.attestation_challenge).into()),
        };

        let mut f = Fields::default();
        f.put("attestationVersion", Node::Int(kd.attestation_version.clone()));
        f.put(
            "attestationSecurityLevel",
            Node::Text(kd.attestation_security_level.to_string()),
        );
        f.put("keymasterVersion", Node::Int(kd.keymaster_version.clone()));
        f.put(
            "keymasterSecurityLevel",
            Node::Text(kd.keymaster_security_level.to_string()),
        );
        f.put("attestationChallenge", challenge);
        f.put("uniqueId", Node::Buffer((&kd.unique_id).into()));
        f.put("softwareEnforced", authorization_list_node(&kd.software_enforced));
        f.put("hardwareEnforced", authorization_list_node(&kd.hardware_enforced));

        DebugTree {
            key_description: Node::Map(f.0),
        }
    }
}

fn render_buffer(d: &BufferDescriptor) -> String {
    if d.length == 0 {
        return "(empty)".to_string();
    }

    let mut parts = vec![];
    if let Some(t) = d.text.as_ref().filter(|t| !t.is_empty()) {
        parts.push(format!("\"{t}\""));
    }
    parts.push(format!("hex:{}", d.hex));
    parts.push(format!("base64:{}", d.base64));
    parts.join(" | ")
}

/// JSON value for nested nodes, guarded against revisiting a node
fn json_value(node: &Node, seen: &mut HashSet<*const Node>) -> Value {
    let key = node as *const Node;

    match node {
        Node::List(_) | Node::Map(_) if !seen.insert(key) => Value::from("[Circular]"),
        Node::List(items) => {
            let v = Value::Array(items.iter().map(|n| json_value(n, seen)).collect());
            seen.remove(&key);
            v
        }
        Node::Map(fields) => {
            let v = Value::Object(
                fields
                    .iter()
                    .map(|(k, n)| (k.clone(), json_value(n, seen)))
                    .collect(),
            );
            seen.remove(&key);
            v
        }
        other => serde_json::to_value(other).unwrap_or(Value::Null),
    }
}

fn format_value(node: Option<&Node>, quote: bool) -> String {
    let node = match node {
        Some(n) => n,
        None => return "(absent)".to_string(),
    };

    match node {
        Node::Null => "present".to_string(),
        Node::Bool(b) => b.to_string(),
        Node::Int(i) => i.to_string(),
        Node::Text(t) if quote => format!("\"{t}\""),
        Node::Text(t) => t.clone(),
        Node::Buffer(d) => render_buffer(d),
        Node::List(items) => {
            let inner: Vec<String> = items.iter().map(|n| format_value(Some(n), quote)).collect();
            format!("[{}]", inner.join(", "))
        }
        Node::Map(fields) => match fields.as_slice() {
            [(_, v @ Node::List(_))] => format_value(Some(v), quote),
            [(_, v @ (Node::Int(_) | Node::Text(_) | Node::Bool(_)))] => format_value(Some(v), quote),
            _ => json_value(node, &mut HashSet::new()).to_string(),
        },
    }
}

fn push_buffer_details(lines: &mut Vec<String>, bullet: &str, plain: &str, label: &str, node: Option<&Node>) {
    let d = match node {
        Some(Node::Buffer(d)) => d,
        other => {
            lines.push(format!("{bullet}{label:<DETAIL_WIDTH$}: {}", format_value(other, false)));
            return;
        }
    };

    if let Some(t) = d.text.as_ref().filter(|t| !t.is_empty()) {
        let l = format!("{label} (text)");
        lines.push(format!("{bullet}{l:<DETAIL_WIDTH$}: \"{t}\""));
    }

    let hex = if d.hex.is_empty() { "(absent)" } else { &d.hex };
    let b64 = if d.base64.is_empty() { "(absent)" } else { &d.base64 };
    let (hl, bl) = (format!("{label} (hex)"), format!("{label} (b64)"));
    lines.push(format!("{bullet}{hl:<DETAIL_WIDTH$}: {hex}"));
    lines.push(format!("{plain}{bl:<DETAIL_WIDTH$}: {b64}"));
}

fn format_authorization_list(label: &str, list: Option<&Node>) -> Vec<String> {
    const INDENT: &str = "    ";
    let bullet = format!("{INDENT}• ");
    let sub_bullet = format!("{INDENT}    • ");
    let sub_plain = format!("{INDENT}      ");

    let mut lines = vec![format!("  {label}")];

    for field in AUTHORIZATION_FIELDS {
        let value = list.and_then(|l| l.get(field));

        match (*field, value) {
            ("rootOfTrust", Some(rot)) => {
                lines.push(format!("{bullet}{field:<LIST_WIDTH$}:"));
                for detail in ["verifiedBootKey", "deviceLocked", "verifiedBootState", "verifiedBootHash"] {
                    lines.push(format!(
                        "{sub_bullet}{detail:<DETAIL_WIDTH$}: {}",
                        format_value(rot.get(detail), false)
                    ));
                }
            }
            ("attestationApplicationId", Some(app)) => {
                lines.push(format!("{bullet}{field:<LIST_WIDTH$}:"));
                lines.push(format!(
                    "{sub_bullet}{:<DETAIL_WIDTH$}: {}",
                    "packageName",
                    format_value(app.get("packageName"), true)
                ));
                lines.push(format!(
                    "{sub_bullet}{:<DETAIL_WIDTH$}: {}",
                    "versionCode",
                    format_value(app.get("versionCode"), false)
                ));
                push_buffer_details(
                    &mut lines,
                    &sub_bullet,
                    &sub_plain,
                    "signatureDigest",
                    app.get("signatureDigest"),
                );
            }
            _ => lines.push(format!("{bullet}{field:<LIST_WIDTH$}: {}", format_value(value, false))),
        }
    }

    lines
}

/// Human readable dump of a debug tree, one field per line
pub fn format_attestation_debug(tree: Option<&DebugTree>) -> String {
    let kd = match tree {
        Some(t) => &t.key_description,
        None => return "[debug][cert0] (no attestation data)".to_string(),
    };

    let mut lines = vec!["[debug][cert0]".to_string(), "KeyDescription".to_string()];

    for (field, quote) in TOP_FIELDS {
        lines.push(format!(
            "  • {field:<TOP_WIDTH$}: {}",
            format_value(kd.get(field), *quote)
        ));
    }

    lines.extend(format_authorization_list("softwareEnforced", kd.get("softwareEnforced")));
    lines.extend(format_authorization_list("hardwareEnforced", kd.get("hardwareEnforced")));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::KeyDescriptionBuilder;

    fn tree(b: &KeyDescriptionBuilder) -> DebugTree {
        DebugTree::new(&KeyDescription::decode(&b.encode()).unwrap())
    }

    #[test]
    fn tree_shape() {
        let mut b = KeyDescriptionBuilder::new();
        b.challenge(b"1,ABCDEFGH1234567890")
            .hw(503, crate::testutil::der::null());
        let t = tree(&b);

        let j = serde_json::to_value(&t).unwrap();
        let kd = &j["KeyDescription"];

        assert_eq!(kd["attestationChallenge"], "1,ABCDEFGH1234567890");
        assert_eq!(kd["attestationSecurityLevel"], "TrustedEnvironment");
        assert_eq!(kd["uniqueId"]["length"], 0);
        assert_eq!(kd["hardwareEnforced"]["purpose"], serde_json::json!([2, 3]));
        assert!(kd["hardwareEnforced"]["noAuthRequired"].is_null());
        assert!(kd["hardwareEnforced"]
            .as_object()
            .unwrap()
            .contains_key("noAuthRequired"));
        assert!(!kd["hardwareEnforced"]
            .as_object()
            .unwrap()
            .contains_key("callerNonce"));
        assert_eq!(
            kd["hardwareEnforced"]["rootOfTrust"]["verifiedBootState"],
            "Verified"
        );
    }

    #[test]
    fn binary_challenge_is_described() {
        let t = tree(KeyDescriptionBuilder::new().challenge(&[0xde, 0xad]));

        assert_eq!(
            t.key_description.get("attestationChallenge"),
            Some(&Node::Buffer(BufferDescriptor {
                length: 2,
                base64: "3q0=".to_string(),
                hex: "dead".to_string(),
                text: None,
            }))
        );
    }

    #[test]
    fn formatted() {
        let mut b = KeyDescriptionBuilder::new();
        b.challenge(b"hello")
            .hw(503, crate::testutil::der::null())
            .app_id(b"com.example.app", 7);
        let s = format_attestation_debug(Some(&tree(&b)));
        let lines: Vec<&str> = s.lines().collect();

        assert_eq!(lines[0], "[debug][cert0]");
        assert_eq!(lines[1], "KeyDescription");
        assert_eq!(lines[2], format!("  • {:<30}: 200", "attestationVersion"));
        assert_eq!(lines[3], format!("  • {:<30}: TrustedEnvironment", "attestationSecurityLevel"));
        assert!(lines.contains(&format!("  • {:<30}: \"hello\"", "attestationChallenge").as_str()));
        assert!(lines.contains(&format!("  • {:<30}: (empty)", "uniqueId").as_str()));
        assert!(lines.contains(&format!("    • {:<32}: [2, 3]", "purpose").as_str()));
        assert!(lines.contains(&format!("    • {:<32}: present", "noAuthRequired").as_str()));
        assert!(lines.contains(&format!("    • {:<32}: (absent)", "callerNonce").as_str()));
        assert!(lines.contains(&format!("        • {:<28}: true", "deviceLocked").as_str()));
        assert!(lines.contains(&format!("        • {:<28}: Verified", "verifiedBootState").as_str()));
        assert!(lines.contains(
            &format!(
                "        • {:<28}: \"com.example.app\" | hex:{} | base64:{}",
                "packageName",
                hex::encode("com.example.app"),
                "Y29tLmV4YW1wbGUuYXBw"
            )
            .as_str()
        ));
        assert!(lines.contains(&format!("        • {:<28}: 7", "versionCode").as_str()));
        assert!(lines.contains(&format!("        • {:<28}: {}", "signatureDigest (hex)", "ab".repeat(32)).as_str()));
        assert!(lines.iter().any(|l| l.starts_with("          signatureDigest (b64)")));
    }

    #[test]
    fn no_attestation() {
        assert_eq!(
            format_attestation_debug(None),
            "[debug][cert0] (no attestation data)"
        );
    }

    #[test]
    fn nested_maps_render_as_json() {
        let n = Node::Map(vec![
            ("a".to_string(), Node::Int(Integer::Small(1))),
            ("b".to_string(), Node::List(vec![Node::Null, Node::Bool(true)])),
        ]);

        assert_eq!(format_value(Some(&n), false), r#"{"a":1,"b":[null,true]}"#);
    }

    #[test]
    fn nested_json_keeps_field_order_and_escapes() {
        let n = Node::Map(vec![
            ("z\"q".to_string(), Node::Text("line\nbreak".to_string())),
            ("a".to_string(), Node::Map(vec![])),
        ]);

        let s = format_value(Some(&n), false);

        assert_eq!(s, r#"{"z\"q":"line\nbreak","a":{}}"#);
        assert_eq!(
            serde_json::from_str::<Value>(&s).unwrap(),
            serde_json::json!({"z\"q": "line\nbreak", "a": {}})
        );
    }
}
