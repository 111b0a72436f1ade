// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Off-chain attestation payloads (EAS off-chain protocol, version 1).
//!
//! An off-chain attestation is an EIP-712 signed `Attest` struct plus the
//! domain and type tables it was signed under, and a uid derived from the
//! packed message contents. Nothing here touches a chain: payloads are
//! verifiable by signature alone.
//!
//! ## Wire format notes
//!
//! The upstream SDK serializes `bigint` fields (`time`, `expirationTime`,
//! chain ids) as JSON strings, older payloads carry them as numbers, and
//! some wrap the signed object in a `sig` envelope. Deserialization accepts
//! all of these.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str::FromStr;

use alloy::hex;
use alloy::primitives::{keccak256, Address, Signature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

sol! {
    /// EAS off-chain `Attest` typed-data struct, protocol version 1.
    struct Attest {
        uint16 version;
        bytes32 schema;
        address recipient;
        uint64 time;
        uint64 expirationTime;
        bool revocable;
        bytes32 refUID;
        bytes data;
    }
}

/// Off-chain protocol version this service signs with.
pub const OFFCHAIN_VERSION: u16 = 1;

/// EIP-712 domain name used by every EAS deployment.
pub const DOMAIN_NAME: &str = "EAS Attestation";

/// Zero uid used for `refUID` when an attestation references nothing.
pub const ZERO_UID: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, thiserror::Error)]
pub enum OffchainError {
    #[error("unsupported primary type `{0}` (expected Attest)")]
    UnsupportedPrimaryType(String),

    #[error("invalid {0}: {1}")]
    InvalidField(&'static str, String),

    #[error("signature recovery failed: {0}")]
    Recovery(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// One entry of an EIP-712 type table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TypeField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// EIP-712 domain carried inside a signed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttestationDomain {
    pub name: String,
    pub version: String,
    #[serde(deserialize_with = "u64_flex")]
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,
}

/// The signed `Attest` message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttestMessage {
    #[serde(default = "default_version")]
    pub version: u16,
    pub schema: String,
    pub recipient: String,
    #[serde(deserialize_with = "u64_flex")]
    pub time: u64,
    #[serde(deserialize_with = "u64_flex")]
    pub expiration_time: u64,
    pub revocable: bool,
    #[serde(rename = "refUID")]
    pub ref_uid: String,
    /// Schema-encoded payload, 0x-prefixed hex.
    pub data: String,
    #[serde(
        default,
        deserialize_with = "u64_flex_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub nonce: Option<u64>,
}

fn default_version() -> u16 {
    OFFCHAIN_VERSION
}

/// Split r/s/v signature as the SDK emits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EcdsaSignature {
    #[serde(deserialize_with = "u64_flex")]
    pub v: u64,
    pub r: String,
    pub s: String,
}

/// A complete signed off-chain attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OffchainAttestation {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u16>,
    pub domain: AttestationDomain,
    pub primary_type: String,
    pub types: BTreeMap<String, Vec<TypeField>>,
    pub message: AttestMessage,
    pub signature: EcdsaSignature,
}

impl OffchainAttestation {
    /// EIP-712 signing hash of the payload under its own declared domain.
    pub fn signing_hash(&self) -> Result<B256, OffchainError> {
        if self.primary_type != "Attest" {
            return Err(OffchainError::UnsupportedPrimaryType(
                self.primary_type.clone(),
            ));
        }
        let attest = self.message.to_struct()?;
        let verifying_contract = match &self.domain.verifying_contract {
            Some(raw) => Some(parse_address("verifyingContract", raw)?),
            None => None,
        };
        let domain = Eip712Domain::new(
            Some(Cow::Owned(self.domain.name.clone())),
            Some(Cow::Owned(self.domain.version.clone())),
            Some(U256::from(self.domain.chain_id)),
            verifying_contract,
            None,
        );
        Ok(attest.eip712_signing_hash(&domain))
    }

    /// Recover the attester address from the payload signature.
    pub fn recover_attester(&self) -> Result<Address, OffchainError> {
        let digest = self.signing_hash()?;
        let signature = self.signature.to_signature()?;
        signature
            .recover_address_from_prehash(&digest)
            .map_err(|e| OffchainError::Recovery(e.to_string()))
    }
}

impl AttestMessage {
    fn to_struct(&self) -> Result<Attest, OffchainError> {
        Ok(Attest {
            version: self.version,
            schema: parse_b256("schema", &self.schema)?,
            recipient: parse_address("recipient", &self.recipient)?,
            time: self.time,
            expirationTime: self.expiration_time,
            revocable: self.revocable,
            refUID: parse_b256("refUID", &self.ref_uid)?,
            data: hex::decode(&self.data)
                .map_err(|e| OffchainError::InvalidField("data", e.to_string()))?
                .into(),
        })
    }
}

impl EcdsaSignature {
    fn to_signature(&self) -> Result<Signature, OffchainError> {
        let r = parse_b256("signature.r", &self.r)?;
        let s = parse_b256("signature.s", &self.s)?;
        let parity = match self.v {
            0 | 27 => false,
            1 | 28 => true,
            other => {
                return Err(OffchainError::InvalidField(
                    "signature.v",
                    format!("unexpected recovery id {other}"),
                ))
            }
        };
        Ok(Signature::new(
            U256::from_be_bytes(r.0),
            U256::from_be_bytes(s.0),
            parity,
        ))
    }

    fn from_signature(sig: &Signature) -> Self {
        Self {
            v: 27 + u64::from(sig.v()),
            r: hex::encode_prefixed(sig.r().to_be_bytes::<32>()),
            s: hex::encode_prefixed(sig.s().to_be_bytes::<32>()),
        }
    }
}

/// Inputs for signing a new off-chain attestation with the service wallet.
#[derive(Debug, Clone)]
pub struct AttestParams {
    pub schema_uid: String,
    pub recipient: Address,
    /// Attestation timestamp, also the store's ordering key.
    pub time: u64,
    /// Expiration in seconds since epoch; 0 means never.
    pub expiration_time: u64,
    pub revocable: bool,
    /// Schema-encoded payload bytes.
    pub data: Vec<u8>,
    pub chain_id: u64,
    /// EAS contract version string for the domain (e.g. `"1.2.0"`).
    pub version: String,
    pub verifying_contract: Address,
}

/// Sign an off-chain attestation server-side and derive its uid.
pub fn sign_offchain_attestation(
    signer: &PrivateKeySigner,
    params: AttestParams,
) -> Result<OffchainAttestation, OffchainError> {
    let schema = parse_b256("schema", &params.schema_uid)?;
    let ref_uid = parse_b256("refUID", ZERO_UID)?;
    let attest = Attest {
        version: OFFCHAIN_VERSION,
        schema,
        recipient: params.recipient,
        time: params.time,
        expirationTime: params.expiration_time,
        revocable: params.revocable,
        refUID: ref_uid,
        data: params.data.clone().into(),
    };
    let domain = Eip712Domain::new(
        Some(Cow::Borrowed(DOMAIN_NAME)),
        Some(Cow::Owned(params.version.clone())),
        Some(U256::from(params.chain_id)),
        Some(params.verifying_contract),
        None,
    );
    let digest = attest.eip712_signing_hash(&domain);
    let signature = signer
        .sign_hash_sync(&digest)
        .map_err(|e| OffchainError::Signing(e.to_string()))?;

    let uid = offchain_uid_v1(
        &params.schema_uid,
        params.recipient,
        params.time,
        params.expiration_time,
        params.revocable,
        ref_uid,
        &params.data,
    );

    Ok(OffchainAttestation {
        uid: format!("{uid}"),
        version: Some(OFFCHAIN_VERSION),
        domain: AttestationDomain {
            name: DOMAIN_NAME.to_string(),
            version: params.version,
            chain_id: params.chain_id,
            verifying_contract: Some(params.verifying_contract.to_checksum(None)),
        },
        primary_type: "Attest".to_string(),
        types: attest_types(),
        message: AttestMessage {
            version: OFFCHAIN_VERSION,
            schema: params.schema_uid,
            recipient: params.recipient.to_checksum(None),
            time: params.time,
            expiration_time: params.expiration_time,
            revocable: params.revocable,
            ref_uid: ZERO_UID.to_string(),
            data: hex::encode_prefixed(&params.data),
            nonce: Some(0),
        },
        signature: EcdsaSignature::from_signature(&signature),
    })
}

/// EAS v1 off-chain uid: keccak of the packed message fields.
///
/// Layout: `uint16 version ‖ utf8(schema uid string) ‖ recipient ‖
/// uint64 time ‖ uint64 expirationTime ‖ bool revocable ‖ refUID ‖
/// data ‖ uint32 bump(0)`.
fn offchain_uid_v1(
    schema_uid: &str,
    recipient: Address,
    time: u64,
    expiration_time: u64,
    revocable: bool,
    ref_uid: B256,
    data: &[u8],
) -> B256 {
    let mut packed = Vec::with_capacity(2 + schema_uid.len() + 20 + 8 + 8 + 1 + 32 + data.len() + 4);
    packed.extend_from_slice(&OFFCHAIN_VERSION.to_be_bytes());
    packed.extend_from_slice(schema_uid.as_bytes());
    packed.extend_from_slice(recipient.as_slice());
    packed.extend_from_slice(&time.to_be_bytes());
    packed.extend_from_slice(&expiration_time.to_be_bytes());
    packed.push(u8::from(revocable));
    packed.extend_from_slice(ref_uid.as_slice());
    packed.extend_from_slice(data);
    packed.extend_from_slice(&0u32.to_be_bytes());
    keccak256(&packed)
}

/// Type table advertised with freshly signed payloads.
fn attest_types() -> BTreeMap<String, Vec<TypeField>> {
    let fields = [
        ("version", "uint16"),
        ("schema", "bytes32"),
        ("recipient", "address"),
        ("time", "uint64"),
        ("expirationTime", "uint64"),
        ("revocable", "bool"),
        ("refUID", "bytes32"),
        ("data", "bytes"),
    ];
    let mut types = BTreeMap::new();
    types.insert(
        "Attest".to_string(),
        fields
            .into_iter()
            .map(|(name, type_name)| TypeField {
                name: name.to_string(),
                type_name: type_name.to_string(),
            })
            .collect(),
    );
    types
}

fn parse_address(field: &'static str, raw: &str) -> Result<Address, OffchainError> {
    Address::from_str(raw).map_err(|e| OffchainError::InvalidField(field, e.to_string()))
}

fn parse_b256(field: &'static str, raw: &str) -> Result<B256, OffchainError> {
    B256::from_str(raw).map_err(|e| OffchainError::InvalidField(field, e.to_string()))
}

/// Accept a u64 encoded as JSON number or decimal string.
fn u64_flex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom("number out of u64 range")),
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid integer string `{s}`"))),
        other => Err(D::Error::custom(format!(
            "expected number or string, got {other}"
        ))),
    }
}

fn u64_flex_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| D::Error::custom("number out of u64 range")),
        serde_json::Value::String(s) => s
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid integer string `{s}`"))),
        other => Err(D::Error::custom(format!(
            "expected number or string, got {other}"
        ))),
    }
}
