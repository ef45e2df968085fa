// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::application_id::AttestationApplicationId;
use super::bytes::Bytes;
use super::common::*;
use super::errors::Error;
use super::root_of_trust::RootOfTrust;
use bitmask::*;
use serde::{Serialize, Serializer};
use x509_parser::der_parser::ber::BerObject;
use x509_parser::der_parser::ber::Class;

const TAG_PURPOSE: u32 = 1;
const TAG_ALGORITHM: u32 = 2;
const TAG_KEY_SIZE: u32 = 3;
const TAG_BLOCK_MODE: u32 = 4;
const TAG_DIGEST: u32 = 5;
const TAG_PADDING: u32 = 6;
const TAG_CALLER_NONCE: u32 = 7;
const TAG_MIN_MAC_LENGTH: u32 = 8;
const TAG_EC_CURVE: u32 = 10;
const TAG_RSA_PUBLIC_EXPONENT: u32 = 200;
const TAG_ROLLBACK_RESISTANCE: u32 = 303;
const TAG_ACTIVE_DATE_TIME: u32 = 400;
const TAG_ORIGINATION_EXPIRE_DATE_TIME: u32 = 401;
const TAG_USAGE_EXPIRE_DATE_TIME: u32 = 402;
const TAG_USER_SECURE_ID: u32 = 502;
const TAG_NO_AUTH_REQUIRED: u32 = 503;
const TAG_USER_AUTH_TYPE: u32 = 504;
const TAG_AUTH_TIMEOUT: u32 = 505;
const TAG_ALLOW_WHILE_ON_BODY: u32 = 506;
const TAG_TRUSTED_USER_PRESENCE_REQ: u32 = 507;
const TAG_TRUSTED_CONFIRMATION_REQ: u32 = 508;
const TAG_UNLOCKED_DEVICE_REQ: u32 = 509;
const TAG_ALL_APPLICATIONS: u32 = 600;
const TAG_APPLICATION_ID: u32 = 601;
const TAG_CREATION_DATE_TIME: u32 = 701;
const TAG_ORIGIN: u32 = 702;
const TAG_ROLLBACK_RESISTANT: u32 = 703;
const TAG_ROOT_OF_TRUST: u32 = 704;
const TAG_OS_VERSION: u32 = 705;
const TAG_OS_PATCH_LEVEL: u32 = 706;
const TAG_ATTESTATION_APPLICATION_ID: u32 = 709;
const TAG_ATTESTATION_ID_BRAND: u32 = 710;
const TAG_ATTESTATION_ID_DEVICE: u32 = 711;
const TAG_ATTESTATION_ID_PRODUCT: u32 = 712;
const TAG_ATTESTATION_ID_SERIAL: u32 = 713;
const TAG_ATTESTATION_ID_IMEI: u32 = 714;
const TAG_ATTESTATION_ID_MEID: u32 = 715;
const TAG_ATTESTATION_ID_MANUFACTURER: u32 = 716;
const TAG_ATTESTATION_ID_MODEL: u32 = 717;
const TAG_VENDOR_PATCH_LEVEL: u32 = 718;
const TAG_BOOT_PATCH_LEVEL: u32 = 719;
const TAG_DEVICE_UNIQUE_ATTESTATION: u32 = 720;
const TAG_ATTESTATION_ID_SECOND_IMEI: u32 = 723;
const TAG_MODULE_HASH: u32 = 724;

bitmask! {
    #[derive(Debug)]
    mask FieldsSet: u64 where flags Fields {
        Purpose                   = 0x0000_0000_0001,
        Algorithm                 = 0x0000_0000_0002,
        KeySize                   = 0x0000_0000_0004,
        BlockMode                 = 0x0000_0000_0008,
        Digest                    = 0x0000_0000_0010,
        Padding                   = 0x0000_0000_0020,
        CallerNonce               = 0x0000_0000_0040,
        MinMacLength              = 0x0000_0000_0080,
        EcCurve                   = 0x0000_0000_0100,
        RsaPublicExponent         = 0x0000_0000_0200,
        RollbackResistance        = 0x0000_0000_0400,
        ActiveDateTime            = 0x0000_0000_0800,
        OriginationExpireDateTime = 0x0000_0000_1000,
        UsageExpireDateTime       = 0x0000_0000_2000,
        UserSecureId              = 0x0000_0000_4000,
        NoAuthRequired            = 0x0000_0000_8000,
        UserAuthType              = 0x0000_0001_0000,
        AuthTimeout               = 0x0000_0002_0000,
        AllowWhileOnBody          = 0x0000_0004_0000,
        TrustedUserPresenceReq    = 0x0000_0008_0000,
        TrustedConfirmationReq    = 0x0000_0010_0000,
        UnlockedDeviceReq         = 0x0000_0020_0000,
        AllApplications           = 0x0000_0040_0000,
        ApplicationId             = 0x0000_0080_0000,
        CreationDateTime          = 0x0000_0100_0000,
        Origin                    = 0x0000_0200_0000,
        RollbackResistant         = 0x0000_0400_0000,
        RootOfTrust               = 0x0000_0800_0000,
        OsVersion                 = 0x0000_1000_0000,
        OsPatchLevel              = 0x0000_2000_0000,
        AttestationApplicationId  = 0x0000_4000_0000,
        IdBrand                   = 0x0000_8000_0000,
        IdDevice                  = 0x0001_0000_0000,
        IdProduct                 = 0x0002_0000_0000,
        IdSerial                  = 0x0004_0000_0000,
        IdImei                    = 0x0008_0000_0000,
        IdMeid                    = 0x0010_0000_0000,
        IdManufacturer            = 0x0020_0000_0000,
        IdModel                   = 0x0040_0000_0000,
        VendorPatchLevel          = 0x0080_0000_0000,
        BootPatchLevel            = 0x0100_0000_0000,
        DeviceUniqueAttestation   = 0x0200_0000_0000,
        IdSecondImei              = 0x0400_0000_0000,
        ModuleHash                = 0x0800_0000_0000,
    }
}

/// Key origin values, see KeyMint `KeyOrigin`
pub const ORIGIN_GENERATED: i64 = 0;

/// Human readable name of a key origin value
pub fn origin_name(v: &Integer) -> String {
    match v.as_i64() {
        Some(0) => "Generated".to_string(),
        Some(1) => "Derived".to_string(),
        Some(2) => "Imported".to_string(),
        Some(3) => "Reserved".to_string(),
        Some(4) => "SecurelyImported".to_string(),
        _ => v.to_string(),
    }
}

// NULL-typed tags carry no value: present is rendered as `true`, absent as
// `null`, so that the two never collapse.
fn flag<S>(present: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if *present {
        serializer.serialize_bool(true)
    } else {
        serializer.serialize_none()
    }
}

/// The sparse set of KeyMint authorizations.  Every field is independently
/// optional: `None` means the tag was not in the list, which is not the same
/// as a zero value.  NULL-typed tags are booleans recording presence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationList {
    pub purpose: Option<Vec<Integer>>,     // [1] SET OF INTEGER
    pub algorithm: Option<Integer>,        // [2]
    pub key_size: Option<Integer>,         // [3]
    pub block_mode: Option<Vec<Integer>>,  // [4] SET OF INTEGER
    pub digest: Option<Vec<Integer>>,      // [5] SET OF INTEGER
    pub padding: Option<Vec<Integer>>,     // [6] SET OF INTEGER
    #[serde(serialize_with = "flag")]
    pub caller_nonce: bool, // [7] NULL
    pub min_mac_length: Option<Integer>,      // [8]
    pub ec_curve: Option<Integer>,            // [10]
    pub rsa_public_exponent: Option<Integer>, // [200]
    #[serde(serialize_with = "flag")]
    pub rollback_resistance: bool, // [303] NULL
    pub active_date_time: Option<Integer>,            // [400]
    pub origination_expire_date_time: Option<Integer>, // [401]
    pub usage_expire_date_time: Option<Integer>,      // [402]
    pub user_secure_id: Option<Integer>,              // [502]
    #[serde(serialize_with = "flag")]
    pub no_auth_required: bool, // [503] NULL
    pub user_auth_type: Option<Integer>, // [504]
    pub auth_timeout: Option<Integer>,   // [505]
    #[serde(serialize_with = "flag")]
    pub allow_while_on_body: bool, // [506] NULL
    #[serde(serialize_with = "flag")]
    pub trusted_user_presence_req: bool, // [507] NULL
    #[serde(serialize_with = "flag")]
    pub trusted_confirmation_req: bool, // [508] NULL
    #[serde(serialize_with = "flag")]
    pub unlocked_device_req: bool, // [509] NULL
    #[serde(serialize_with = "flag")]
    pub all_applications: bool, // [600] NULL
    pub application_id: Option<Bytes>,      // [601]
    pub creation_date_time: Option<Integer>, // [701] milliseconds since the epoch
    pub origin: Option<Integer>,             // [702]
    #[serde(serialize_with = "flag")]
    pub rollback_resistant: bool, // [703] NULL
    pub root_of_trust: Option<RootOfTrust>, // [704]
    pub os_version: Option<Integer>,        // [705]
    pub os_patch_level: Option<Integer>,    // [706]
    pub attestation_application_id: Option<AttestationApplicationId>, // [709]
    pub attestation_id_brand: Option<Bytes>,        // [710]
    pub attestation_id_device: Option<Bytes>,       // [711]
    pub attestation_id_product: Option<Bytes>,      // [712]
    pub attestation_id_serial: Option<Bytes>,       // [713]
    pub attestation_id_imei: Option<Bytes>,         // [714]
    pub attestation_id_meid: Option<Bytes>,         // [715]
    pub attestation_id_manufacturer: Option<Bytes>, // [716]
    pub attestation_id_model: Option<Bytes>,        // [717]
    pub vendor_patch_level: Option<Integer>,        // [718]
    pub boot_patch_level: Option<Integer>,          // [719]
    #[serde(serialize_with = "flag")]
    pub device_unique_attestation: bool, // [720] NULL
    pub attestation_id_second_imei: Option<Bytes>, // [723]
    pub module_hash: Option<Bytes>,                // [724]
}

impl AuthorizationList {
    pub fn new() -> Self {
        Default::default()
    }

    pub(crate) fn parse(v: &BerObject) -> Result<AuthorizationList, Error> {
        let mut al = AuthorizationList::new();
        let mut seen = FieldsSet::none();

        for item in to_seq(v, "AuthorizationList")?.iter() {
            if item.header.class() != Class::ContextSpecific {
                return Err(Error::Syntax(format!(
                    "unexpected {:?} tag {} in AuthorizationList",
                    item.header.class(),
                    item.header.tag().0
                )));
            }

            al.parse_field(&mut seen, item.header.tag().0, item)?;
        }

        Ok(al)
    }

    fn parse_field(
        &mut self,
        seen: &mut FieldsSet,
        tag: u32,
        tagged: &BerObject,
    ) -> Result<(), Error> {
        match tag {
            TAG_PURPOSE => {
                mark(seen, Fields::Purpose, "purpose")?;
                self.purpose = Some(to_int_set(&explicit(tagged, "purpose")?, "purpose")?);
            }
            TAG_ALGORITHM => {
                mark(seen, Fields::Algorithm, "algorithm")?;
                self.algorithm = Some(int_field(tagged, "algorithm")?);
            }
            TAG_KEY_SIZE => {
                mark(seen, Fields::KeySize, "keySize")?;
                self.key_size = Some(int_field(tagged, "keySize")?);
            }
            TAG_BLOCK_MODE => {
                mark(seen, Fields::BlockMode, "blockMode")?;
                self.block_mode = Some(to_int_set(&explicit(tagged, "blockMode")?, "blockMode")?);
            }
            TAG_DIGEST => {
                mark(seen, Fields::Digest, "digest")?;
                self.digest = Some(to_int_set(&explicit(tagged, "digest")?, "digest")?);
            }
            TAG_PADDING => {
                mark(seen, Fields::Padding, "padding")?;
                self.padding = Some(to_int_set(&explicit(tagged, "padding")?, "padding")?);
            }
            TAG_CALLER_NONCE => {
                mark(seen, Fields::CallerNonce, "callerNonce")?;
                self.caller_nonce = null_field(tagged, "callerNonce")?;
            }
            TAG_MIN_MAC_LENGTH => {
                mark(seen, Fields::MinMacLength, "minMacLength")?;
                self.min_mac_length = Some(int_field(tagged, "minMacLength")?);
            }
            TAG_EC_CURVE => {
                mark(seen, Fields::EcCurve, "ecCurve")?;
                self.ec_curve = Some(int_field(tagged, "ecCurve")?);
            }
            TAG_RSA_PUBLIC_EXPONENT => {
                mark(seen, Fields::RsaPublicExponent, "rsaPublicExponent")?;
                self.rsa_public_exponent = Some(int_field(tagged, "rsaPublicExponent")?);
            }
            TAG_ROLLBACK_RESISTANCE => {
                mark(seen, Fields::RollbackResistance, "rollbackResistance")?;
                self.rollback_resistance = null_field(tagged, "rollbackResistance")?;
            }
            TAG_ACTIVE_DATE_TIME => {
                mark(seen, Fields::ActiveDateTime, "activeDateTime")?;
                self.active_date_time = Some(int_field(tagged, "activeDateTime")?);
            }
            TAG_ORIGINATION_EXPIRE_DATE_TIME => {
                mark(seen, Fields::OriginationExpireDateTime, "originationExpireDateTime")?;
                self.origination_expire_date_time =
                    Some(int_field(tagged, "originationExpireDateTime")?);
            }
            TAG_USAGE_EXPIRE_DATE_TIME => {
                mark(seen, Fields::UsageExpireDateTime, "usageExpireDateTime")?;
                self.usage_expire_date_time = Some(int_field(tagged, "usageExpireDateTime")?);
            }
            TAG_USER_SECURE_ID => {
                mark(seen, Fields::UserSecureId, "userSecureId")?;
                self.user_secure_id = Some(int_field(tagged, "userSecureId")?);
            }
            TAG_NO_AUTH_REQUIRED => {
                mark(seen, Fields::NoAuthRequired, "noAuthRequired")?;
                self.no_auth_required = null_field(tagged, "noAuthRequired")?;
            }
            TAG_USER_AUTH_TYPE => {
                mark(seen, Fields::UserAuthType, "userAuthType")?;
                self.user_auth_type = Some(int_field(tagged, "userAuthType")?);
            }
            TAG_AUTH_TIMEOUT => {
                mark(seen, Fields::AuthTimeout, "authTimeout")?;
                self.auth_timeout = Some(int_field(tagged, "authTimeout")?);
            }
            TAG_ALLOW_WHILE_ON_BODY => {
                mark(seen, Fields::AllowWhileOnBody, "allowWhileOnBody")?;
                self.allow_while_on_body = null_field(tagged, "allowWhileOnBody")?;
            }
            TAG_TRUSTED_USER_PRESENCE_REQ => {
                mark(seen, Fields::TrustedUserPresenceReq, "trustedUserPresenceReq")?;
                self.trusted_user_presence_req = null_field(tagged, "trustedUserPresenceReq")?;
            }
            TAG_TRUSTED_CONFIRMATION_REQ => {
                mark(seen, Fields::TrustedConfirmationReq, "trustedConfirmationReq")?;
                self.trusted_confirmation_req = null_field(tagged, "trustedConfirmationReq")?;
            }
            TAG_UNLOCKED_DEVICE_REQ => {
                mark(seen, Fields::UnlockedDeviceReq, "unlockedDeviceReq")?;
                self.unlocked_device_req = null_field(tagged, "unlockedDeviceReq")?;
            }
            TAG_ALL_APPLICATIONS => {
                mark(seen, Fields::AllApplications, "allApplications")?;
                self.all_applications = null_field(tagged, "allApplications")?;
            }
            TAG_APPLICATION_ID => {
                mark(seen, Fields::ApplicationId, "applicationId")?;
                self.application_id = Some(bstr_field(tagged, "applicationId")?);
            }
            TAG_CREATION_DATE_TIME => {
                mark(seen, Fields::CreationDateTime, "creationDateTime")?;
                self.creation_date_time = Some(int_field(tagged, "creationDateTime")?);
            }
            TAG_ORIGIN => {
                mark(seen, Fields::Origin, "origin")?;
                self.origin = Some(int_field(tagged, "origin")?);
            }
            TAG_ROLLBACK_RESISTANT => {
                mark(seen, Fields::RollbackResistant, "rollbackResistant")?;
                self.rollback_resistant = null_field(tagged, "rollbackResistant")?;
            }
            TAG_ROOT_OF_TRUST => {
                mark(seen, Fields::RootOfTrust, "rootOfTrust")?;
                self.root_of_trust = Some(RootOfTrust::parse(&explicit(tagged, "rootOfTrust")?)?);
            }
            TAG_OS_VERSION => {
                mark(seen, Fields::OsVersion, "osVersion")?;
                self.os_version = Some(int_field(tagged, "osVersion")?);
            }
            TAG_OS_PATCH_LEVEL => {
                mark(seen, Fields::OsPatchLevel, "osPatchLevel")?;
                self.os_patch_level = Some(int_field(tagged, "osPatchLevel")?);
            }
            TAG_ATTESTATION_APPLICATION_ID => {
                mark(seen, Fields::AttestationApplicationId, "attestationApplicationId")?;
                let raw = bstr_field(tagged, "attestationApplicationId")?;
                self.attestation_application_id =
                    Some(AttestationApplicationId::decode(raw.as_slice())?);
            }
            TAG_ATTESTATION_ID_BRAND => {
                mark(seen, Fields::IdBrand, "attestationIdBrand")?;
                self.attestation_id_brand = Some(bstr_field(tagged, "attestationIdBrand")?);
            }
            TAG_ATTESTATION_ID_DEVICE => {
                mark(seen, Fields::IdDevice, "attestationIdDevice")?;
                self.attestation_id_device = Some(bstr_field(tagged, "attestationIdDevice")?);
            }
            TAG_ATTESTATION_ID_PRODUCT => {
                mark(seen, Fields::IdProduct, "attestationIdProduct")?;
                self.attestation_id_product = Some(bstr_field(tagged, "attestationIdProduct")?);
            }
            TAG_ATTESTATION_ID_SERIAL => {
                mark(seen, Fields::IdSerial, "attestationIdSerial")?;
                self.attestation_id_serial = Some(bstr_field(tagged, "attestationIdSerial")?);
            }
            TAG_ATTESTATION_ID_IMEI => {
                mark(seen, Fields::IdImei, "attestationIdImei")?;
                self.attestation_id_imei = Some(bstr_field(tagged, "attestationIdImei")?);
            }
            TAG_ATTESTATION_ID_MEID => {
                mark(seen, Fields::IdMeid, "attestationIdMeid")?;
                self.attestation_id_meid = Some(bstr_field(tagged, "attestationIdMeid")?);
            }
            TAG_ATTESTATION_ID_MANUFACTURER => {
                mark(seen, Fields::IdManufacturer, "attestationIdManufacturer")?;
                self.attestation_id_manufacturer =
                    Some(bstr_field(tagged, "attestationIdManufacturer")?);
            }
            TAG_ATTESTATION_ID_MODEL => {
                mark(seen, Fields::IdModel, "attestationIdModel")?;
                self.attestation_id_model = Some(bstr_field(tagged, "attestationIdModel")?);
            }
            TAG_VENDOR_PATCH_LEVEL => {
                mark(seen, Fields::VendorPatchLevel, "vendorPatchLevel")?;
                self.vendor_patch_level = Some(int_field(tagged, "vendorPatchLevel")?);
            }
            TAG_BOOT_PATCH_LEVEL => {
                mark(seen, Fields::BootPatchLevel, "bootPatchLevel")?;
                self.boot_patch_level = Some(int_field(tagged, "bootPatchLevel")?);
            }
            TAG_DEVICE_UNIQUE_ATTESTATION => {
                mark(seen, Fields::DeviceUniqueAttestation, "deviceUniqueAttestation")?;
                self.device_unique_attestation = null_field(tagged, "deviceUniqueAttestation")?;
            }
            TAG_ATTESTATION_ID_SECOND_IMEI => {
                mark(seen, Fields::IdSecondImei, "attestationIdSecondImei")?;
                self.attestation_id_second_imei =
                    Some(bstr_field(tagged, "attestationIdSecondImei")?);
            }
            TAG_MODULE_HASH => {
                mark(seen, Fields::ModuleHash, "moduleHash")?;
                self.module_hash = Some(bstr_field(tagged, "moduleHash")?);
            }
            // tags introduced by later KeyMint versions
            _ => {}
        }

        Ok(())
    }

    /// Name of the key origin, if the tag is present
    pub fn origin_name(&self) -> Option<String> {
        self.origin.as_ref().map(origin_name)
    }
}

fn mark(seen: &mut FieldsSet, f: Fields, name: &str) -> Result<(), Error> {
    if seen.contains(f) {
        return Err(Error::DuplicatedField(name.to_string()));
    }

    seen.set(f);

    Ok(())
}

fn int_field(tagged: &BerObject, what: &str) -> Result<Integer, Error> {
    to_int(&explicit(tagged, what)?, what)
}

fn bstr_field(tagged: &BerObject, what: &str) -> Result<Bytes, Error> {
    to_bstr(&explicit(tagged, what)?, what)
}

fn null_field(tagged: &BerObject, what: &str) -> Result<bool, Error> {
    to_null(&explicit(tagged, what)?, what)?;
    Ok(true)
}
