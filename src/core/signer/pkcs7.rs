//! Detached PKCS#7/CMS signature over the `.SF` signature file.
//!
//! Only the single-signer SignedData shape needed for v1 package signing is
//! modelled: SHA-256 digest, RSA PKCS#1 v1.5 signature, the signer
//! certificate embedded, and exactly two signed attributes (content-type
//! and message-digest). The S/MIME capabilities attribute must never be
//! emitted: the Android package installer rejects signatures carrying it.

use rasn::types::{Any, Integer, ObjectIdentifier, OctetString, SetOf};
use rasn::{AsnType, Decode, Encode};
use rasn_pkix::{AlgorithmIdentifier, Certificate, Name};
use rsa::{PaddingScheme, RsaPrivateKey};
use sha2::{Digest as _, Sha256};
use std::borrow::Cow;

use crate::core::error::SignError;

pub const OID_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unchecked(Cow::Borrowed(&[1, 2, 840, 113549, 1, 7, 1]));
pub const OID_SIGNED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unchecked(Cow::Borrowed(&[1, 2, 840, 113549, 1, 7, 2]));
pub const OID_CONTENT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unchecked(Cow::Borrowed(&[1, 2, 840, 113549, 1, 9, 3]));
pub const OID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unchecked(Cow::Borrowed(&[1, 2, 840, 113549, 1, 9, 4]));
pub const OID_SMIME_CAPABILITIES: ObjectIdentifier =
    ObjectIdentifier::new_unchecked(Cow::Borrowed(&[1, 2, 840, 113549, 1, 9, 15]));
const OID_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unchecked(Cow::Borrowed(&[2, 16, 840, 1, 101, 3, 4, 2, 1]));
const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unchecked(Cow::Borrowed(&[1, 2, 840, 113549, 1, 1, 1]));

/// Outermost `ContentInfo` wrapping a SignedData.
///
/// The `content` field is ANY in the ASN.1 module; typing it as
/// [`SignedData`] is wire-identical for the one content type we carry.
#[derive(AsnType, Clone, Debug, Decode, Encode, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ContentInfo {
    pub content_type: ObjectIdentifier,
    #[rasn(tag(explicit(0)))]
    pub content: SignedData,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SignedData {
    pub version: Integer,
    pub digest_algorithms: SetOf<AlgorithmIdentifier>,
    pub encap_content_info: EncapContentInfo,
    #[rasn(tag(0))]
    pub certificates: Option<SetOf<Certificate>>,
    pub signer_infos: SetOf<SignerInfo>,
}

/// Encapsulated content. Always detached here, so `content` stays absent.
#[derive(AsnType, Clone, Debug, Decode, Encode, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EncapContentInfo {
    pub content_type: ObjectIdentifier,
    #[rasn(tag(explicit(0)))]
    pub content: Option<OctetString>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SignerInfo {
    pub version: Integer,
    pub sid: IssuerAndSerialNumber,
    pub digest_algorithm: AlgorithmIdentifier,
    #[rasn(tag(0))]
    pub signed_attrs: Option<SetOf<Attribute>>,
    pub signature_algorithm: AlgorithmIdentifier,
    pub signature: OctetString,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct IssuerAndSerialNumber {
    pub issuer: Name,
    pub serial_number: Integer,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Attribute {
    pub r#type: ObjectIdentifier,
    pub values: SetOf<Any>,
}

fn der<T: Encode>(value: &T) -> Result<Vec<u8>, SignError> {
    rasn::der::encode(value).map_err(|err| SignError::Crypto(err.to_string()))
}

fn algorithm(oid: ObjectIdentifier) -> AlgorithmIdentifier {
    AlgorithmIdentifier {
        algorithm: oid,
        // DER NULL, matching what common signing toolchains emit.
        parameters: Some(Any::new(vec![0x05, 0x00])),
    }
}

fn attribute(oid: ObjectIdentifier, value: Any) -> Attribute {
    let mut values = SetOf::new();
    values.insert(value);
    Attribute { r#type: oid, values }
}

/// Sign `data` detached: the returned DER proves the identity endorsed the
/// bytes without embedding them.
pub fn sign_detached(
    data: &[u8],
    cert: &Certificate,
    key: &RsaPrivateKey,
) -> Result<Vec<u8>, SignError> {
    let mut signed_attrs = SetOf::new();
    signed_attrs.insert(attribute(OID_CONTENT_TYPE, Any::new(der(&OID_DATA)?)));
    signed_attrs.insert(attribute(
        OID_MESSAGE_DIGEST,
        Any::new(der(&OctetString::from(Sha256::digest(data).to_vec()))?),
    ));

    // With signed attributes present the signature covers their DER as a
    // plain SET OF, not the [0]-tagged form embedded in the SignerInfo.
    let attrs_der = der(&signed_attrs)?;
    let padding = PaddingScheme::new_pkcs1v15_sign::<Sha256>();
    let signature = key
        .sign(padding, &Sha256::digest(&attrs_der))
        .map_err(|err| SignError::Crypto(format!("rsa signing failed: {err}")))?;

    let signer_info = SignerInfo {
        version: Integer::from(1),
        sid: IssuerAndSerialNumber {
            issuer: cert.tbs_certificate.issuer.clone(),
            serial_number: cert.tbs_certificate.serial_number.clone(),
        },
        digest_algorithm: algorithm(OID_SHA256),
        signed_attrs: Some(signed_attrs),
        signature_algorithm: algorithm(OID_RSA_ENCRYPTION),
        signature: OctetString::from(signature),
    };

    let mut digest_algorithms = SetOf::new();
    digest_algorithms.insert(algorithm(OID_SHA256));
    let mut certificates = SetOf::new();
    certificates.insert(cert.clone());
    let mut signer_infos = SetOf::new();
    signer_infos.insert(signer_info);

    let signed_data = SignedData {
        version: Integer::from(1),
        digest_algorithms,
        encap_content_info: EncapContentInfo {
            content_type: OID_DATA,
            content: None,
        },
        certificates: Some(certificates),
        signer_infos,
    };

    der(&ContentInfo {
        content_type: OID_SIGNED_DATA,
        content: signed_data,
    })
}
