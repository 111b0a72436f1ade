// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Signature recovery for identity claims and upload authorization.
//!
//! Two recovery modes exist (see the service layer for how they are used):
//!
//! 1. Identity claims: a wallet signs the `idData` typed struct
//!    (`{idType, value[, secret]}`) under the EAS domain without a
//!    verifying contract. The recovered address must equal the `receiver`
//!    the request claims.
//! 2. Upload authorization: the uploader signs the raw attestation JSON as
//!    an EIP-191 personal message. The recovered address must match the
//!    attester or the recipient, depending on the claimed role.
//!
//! A mismatch is a definitive authorization failure, never retried.

use std::borrow::Cow;

use alloy::hex;
use alloy::primitives::{eip191_hash_message, keccak256, Address, Signature, B256, U256};
use alloy::sol_types::Eip712Domain;

use super::offchain::DOMAIN_NAME;

/// `encodeType` for an identity claim without a secret.
const ID_DATA_TYPE: &str = "idData(string idType,string value)";

/// `encodeType` for an email identity claim carrying an OTP secret.
const ID_DATA_SECRET_TYPE: &str = "idData(string idType,string value,string secret)";

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid signature encoding: {0}")]
    BadSignature(String),

    #[error("signature recovery failed: {0}")]
    Recovery(String),
}

/// Domain for identity claims: name, version and chain only, no verifying
/// contract.
fn id_domain(chain_id: u64, version: &str) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(DOMAIN_NAME)),
        Some(Cow::Owned(version.to_string())),
        Some(U256::from(chain_id)),
        None,
        None,
    )
}

/// EIP-712 struct hash of an `idData` claim. The secret field participates
/// in the hash only when present, matching the two type declarations.
fn id_struct_hash(id_type: &str, value: &str, secret: Option<&str>) -> B256 {
    let type_hash = match secret {
        Some(_) => keccak256(ID_DATA_SECRET_TYPE.as_bytes()),
        None => keccak256(ID_DATA_TYPE.as_bytes()),
    };
    let mut encoded = Vec::with_capacity(128);
    encoded.extend_from_slice(type_hash.as_slice());
    encoded.extend_from_slice(keccak256(id_type.as_bytes()).as_slice());
    encoded.extend_from_slice(keccak256(value.as_bytes()).as_slice());
    if let Some(secret) = secret {
        encoded.extend_from_slice(keccak256(secret.as_bytes()).as_slice());
    }
    keccak256(&encoded)
}

/// EIP-712 signing hash of an identity claim.
pub fn id_signing_hash(
    id_type: &str,
    value: &str,
    secret: Option<&str>,
    chain_id: u64,
    version: &str,
) -> B256 {
    let separator = id_domain(chain_id, version).separator();
    let struct_hash = id_struct_hash(id_type, value, secret);
    let mut digest_input = Vec::with_capacity(2 + 32 + 32);
    digest_input.extend_from_slice(&[0x19, 0x01]);
    digest_input.extend_from_slice(separator.as_slice());
    digest_input.extend_from_slice(struct_hash.as_slice());
    keccak256(&digest_input)
}

/// Recover the wallet that signed an identity claim.
pub fn recover_id_signer(
    id_type: &str,
    value: &str,
    secret: Option<&str>,
    signature_hex: &str,
    chain_id: u64,
    version: &str,
) -> Result<Address, VerifyError> {
    let digest = id_signing_hash(id_type, value, secret, chain_id, version);
    let signature = parse_signature(signature_hex)?;
    signature
        .recover_address_from_prehash(&digest)
        .map_err(|e| VerifyError::Recovery(e.to_string()))
}

/// Recover the wallet that signed `message` as an EIP-191 personal message.
pub fn recover_message_signer(message: &str, signature_hex: &str) -> Result<Address, VerifyError> {
    let digest = eip191_hash_message(message.as_bytes());
    let signature = parse_signature(signature_hex)?;
    signature
        .recover_address_from_prehash(&digest)
        .map_err(|e| VerifyError::Recovery(e.to_string()))
}

/// Parse a 65-byte `r ‖ s ‖ v` hex signature. Accepts both 0/1 and 27/28
/// recovery ids.
pub fn parse_signature(signature_hex: &str) -> Result<Signature, VerifyError> {
    let bytes = hex::decode(signature_hex).map_err(|e| VerifyError::BadSignature(e.to_string()))?;
    if bytes.len() != 65 {
        return Err(VerifyError::BadSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }
    let r = U256::from_be_slice(&bytes[0..32]);
    let s = U256::from_be_slice(&bytes[32..64]);
    let parity = match bytes[64] {
        0 | 27 => false,
        1 | 28 => true,
        other => {
            return Err(VerifyError::BadSignature(format!(
                "unexpected recovery id {other}"
            )))
        }
    };
    Ok(Signature::new(r, s, parity))
}
