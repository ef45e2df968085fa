// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::bytes::Bytes;
use super::errors::Error;
use openssl::bn::BigNum;
use serde::ser::{Serialize, Serializer};
use std::fmt;
use x509_parser::der_parser::ber::{BerObject, BerObjectContent};
use x509_parser::der_parser::der::parse_der;

/// An ASN.1 INTEGER.  Values that fit an i64 are kept native, anything wider
/// is kept as its decimal representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Integer {
    Small(i64),
    Big(String),
}

impl Integer {
    /// Decode the two's complement content octets of a DER INTEGER
    pub fn from_der_content(raw: &[u8]) -> Result<Integer, Error> {
        if raw.is_empty() {
            return Err(Error::Syntax("zero-length integer".to_string()));
        }

        let negative = raw[0] & 0x80 != 0;

        if raw.len() <= 16 {
            let mut acc: i128 = if negative { -1 } else { 0 };
            for b in raw {
                acc = (acc << 8) | i128::from(*b);
            }

            return Ok(match i64::try_from(acc) {
                Ok(v) => Integer::Small(v),
                Err(_) => Integer::Big(acc.to_string()),
            });
        }

        if !negative {
            let bn = BigNum::from_slice(raw).map_err(|e| Error::Syntax(e.to_string()))?;
            let s = bn.to_dec_str().map_err(|e| Error::Syntax(e.to_string()))?;
            return Ok(Integer::Big(s.to_string()));
        }

        // magnitude of a negative value: invert and add one
        let mut mag: Vec<u8> = raw.iter().map(|b| !b).collect();
        for b in mag.iter_mut().rev() {
            let (v, carry) = b.overflowing_add(1);
            *b = v;
            if !carry {
                break;
            }
        }
        let bn = BigNum::from_slice(&mag).map_err(|e| Error::Syntax(e.to_string()))?;
        let s = bn.to_dec_str().map_err(|e| Error::Syntax(e.to_string()))?;

        Ok(Integer::Big(format!("-{}", &*s)))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Integer::Small(v) => Some(*v),
            Integer::Big(_) => None,
        }
    }
}

impl From<i64> for Integer {
    fn from(v: i64) -> Self {
        Integer::Small(v)
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Integer::Small(v) => write!(f, "{}", v),
            Integer::Big(s) => f.write_str(s),
        }
    }
}

impl Serialize for Integer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Integer::Small(v) => serializer.serialize_i64(*v),
            Integer::Big(s) => serializer.serialize_str(s),
        }
    }
}

/// Parse exactly one DER object out of `buf`
pub fn parse_one<'a>(buf: &'a [u8], what: &str) -> Result<BerObject<'a>, Error> {
    let (rem, obj) = parse_der(buf).map_err(|e| Error::Syntax(format!("{what}: {e}")))?;

    if !rem.is_empty() {
        return Err(Error::Syntax(format!(
            "{what}: {} trailing bytes",
            rem.len()
        )));
    }

    Ok(obj)
}

/// Unwrap the content of an EXPLICIT context-specific tag
pub fn explicit<'a>(v: &BerObject<'a>, what: &str) -> Result<BerObject<'a>, Error> {
    match &v.content {
        BerObjectContent::Unknown(any) => parse_one(any.data, what),
        BerObjectContent::Tagged(_, _, inner) => Ok((**inner).clone()),
        BerObjectContent::Optional(Some(inner)) => Ok((**inner).clone()),
        _ => Err(Error::TypeMismatch(format!(
            "{what} MUST be explicitly tagged"
        ))),
    }
}

pub fn to_int(v: &BerObject, what: &str) -> Result<Integer, Error> {
    match &v.content {
        BerObjectContent::Integer(raw) => Integer::from_der_content(raw),
        _ => Err(Error::TypeMismatch(format!("{what} MUST be integer"))),
    }
}

pub fn to_enum(v: &BerObject, what: &str) -> Result<u64, Error> {
    match &v.content {
        BerObjectContent::Enum(x) => Ok(*x),
        _ => Err(Error::TypeMismatch(format!("{what} MUST be enumerated"))),
    }
}

pub fn to_bool(v: &BerObject, what: &str) -> Result<bool, Error> {
    match &v.content {
        BerObjectContent::Boolean(x) => Ok(*x),
        _ => Err(Error::TypeMismatch(format!("{what} MUST be boolean"))),
    }
}

pub fn to_bstr(v: &BerObject, what: &str) -> Result<Bytes, Error> {
    match &v.content {
        BerObjectContent::OctetString(x) => Ok(Bytes::from(*x)),
        _ => Err(Error::TypeMismatch(format!("{what} MUST be octet string"))),
    }
}

pub fn to_null(v: &BerObject, what: &str) -> Result<(), Error> {
    match &v.content {
        BerObjectContent::Null => Ok(()),
        _ => Err(Error::TypeMismatch(format!("{what} MUST be null"))),
    }
}

pub fn to_seq<'v, 'a>(v: &'v BerObject<'a>, what: &str) -> Result<&'v [BerObject<'a>], Error> {
    match &v.content {
        BerObjectContent::Sequence(x) => Ok(x.as_slice()),
        _ => Err(Error::TypeMismatch(format!("{what} MUST be sequence"))),
    }
}

pub fn to_set<'v, 'a>(v: &'v BerObject<'a>, what: &str) -> Result<&'v [BerObject<'a>], Error> {
    match &v.content {
        BerObjectContent::Set(x) => Ok(x.as_slice()),
        _ => Err(Error::TypeMismatch(format!("{what} MUST be set"))),
    }
}

/// SET OF INTEGER
pub fn to_int_set(v: &BerObject, what: &str) -> Result<Vec<Integer>, Error> {
    to_set(v, what)?
        .iter()
        .map(|x| to_int(x, what))
        .collect()
}
