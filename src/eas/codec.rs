// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Schema-driven ABI codec for attestation payloads.
//!
//! An EAS schema signature is an ordered, comma-separated list of
//! `type name` pairs, e.g. `"string idType, string id, address subject"`.
//! Payload bytes are the standard ABI encoding of those fields as
//! parameters. Decoding produces a JSON object keyed by field name.
//!
//! Only single-level schemas are supported: tuple fields (embedded schemas)
//! are rejected at parse time. This mirrors the upstream limitation and is
//! intentional.
//!
//! Decoded value mapping is fixed so stored projections are queryable:
//! addresses become EIP-55 checksum strings, integers become decimal
//! strings, bytes become 0x-hex strings.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::hex;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed schema field `{0}`")]
    MalformedField(String),

    #[error("unsupported field type `{0}`: {1}")]
    BadType(String, String),

    #[error("embedded schemas are not supported (field `{0}`)")]
    NestedSchema(String),

    #[error("invalid payload hex: {0}")]
    BadHex(#[from] hex::FromHexError),

    #[error("payload does not match schema: {0}")]
    Mismatch(String),
}

/// One parsed schema field.
#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: String,
    pub ty: DynSolType,
}

/// Parsed schema signature, ready to encode or decode payloads.
#[derive(Debug, Clone)]
pub struct SchemaCodec {
    fields: Vec<SchemaField>,
}

impl SchemaCodec {
    /// Parse a schema signature string into an ordered field list.
    pub fn parse(signature: &str) -> Result<Self, CodecError> {
        let mut fields = Vec::new();
        for raw in signature.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let mut parts = raw.split_whitespace();
            let (ty_str, name) = match (parts.next(), parts.next(), parts.next()) {
                (Some(ty), Some(name), None) => (ty, name),
                _ => return Err(CodecError::MalformedField(raw.to_string())),
            };
            if ty_str.starts_with('(') || ty_str.starts_with("tuple") {
                return Err(CodecError::NestedSchema(name.to_string()));
            }
            let ty: DynSolType = normalize_type(ty_str)
                .parse()
                .map_err(|e: alloy::dyn_abi::Error| {
                    CodecError::BadType(ty_str.to_string(), e.to_string())
                })?;
            if matches!(ty, DynSolType::Tuple(_) | DynSolType::CustomStruct { .. }) {
                return Err(CodecError::NestedSchema(name.to_string()));
            }
            fields.push(SchemaField {
                name: name.to_string(),
                ty,
            });
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Decode 0x-prefixed payload hex into a field-name-keyed JSON object.
    pub fn decode(&self, data_hex: &str) -> Result<serde_json::Map<String, Value>, CodecError> {
        let bytes = hex::decode(data_hex)?;
        let tuple = DynSolType::Tuple(self.fields.iter().map(|f| f.ty.clone()).collect());
        let decoded = tuple
            .abi_decode_params(&bytes)
            .map_err(|e| CodecError::Mismatch(e.to_string()))?;
        let values = match decoded {
            DynSolValue::Tuple(values) => values,
            single => vec![single],
        };
        if values.len() != self.fields.len() {
            return Err(CodecError::Mismatch(format!(
                "expected {} fields, decoded {}",
                self.fields.len(),
                values.len()
            )));
        }
        let mut out = serde_json::Map::new();
        for (field, value) in self.fields.iter().zip(values) {
            out.insert(field.name.clone(), value_to_json(&value));
        }
        Ok(out)
    }

    /// Encode typed values in schema order. The caller supplies one value
    /// per field; a count or type mismatch is an error.
    pub fn encode(&self, values: Vec<DynSolValue>) -> Result<Vec<u8>, CodecError> {
        if values.len() != self.fields.len() {
            return Err(CodecError::Mismatch(format!(
                "expected {} values, got {}",
                self.fields.len(),
                values.len()
            )));
        }
        for (field, value) in self.fields.iter().zip(&values) {
            if !field.ty.matches(value) {
                return Err(CodecError::Mismatch(format!(
                    "value for `{}` is not a {}",
                    field.name, field.ty
                )));
            }
        }
        Ok(DynSolValue::Tuple(values).abi_encode_params())
    }
}

/// Expand the bare Solidity aliases EAS schema signatures use.
fn normalize_type(ty: &str) -> String {
    if let Some(rest) = ty.strip_prefix("uint") {
        if rest.is_empty() || rest.starts_with('[') {
            return format!("uint256{rest}");
        }
    }
    if let Some(rest) = ty.strip_prefix("int") {
        if rest.is_empty() || rest.starts_with('[') {
            return format!("int256{rest}");
        }
    }
    ty.to_string()
}

/// Project a decoded ABI value onto JSON with a stable, queryable shape.
fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => json!(b),
        DynSolValue::String(s) => json!(s),
        DynSolValue::Address(a) => json!(a.to_checksum(None)),
        DynSolValue::Uint(v, _) => json!(v.to_string()),
        DynSolValue::Int(v, _) => json!(v.to_string()),
        DynSolValue::Bytes(b) => json!(hex::encode_prefixed(b)),
        DynSolValue::FixedBytes(word, size) => json!(hex::encode_prefixed(&word[..*size])),
        DynSolValue::Function(f) => json!(hex::encode_prefixed(f.as_slice())),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        // Tuples are rejected at schema parse time.
        DynSolValue::Tuple(_) | DynSolValue::CustomStruct { .. } => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use std::str::FromStr;

    const ID_SCHEMA: &str = "string idType, string id, address subject, string scriptURI";

    fn sample_values() -> Vec<DynSolValue> {
        vec![
            DynSolValue::String("email".into()),
            DynSolValue::String("alice@example.org".into()),
            DynSolValue::Address(
                Address::from_str("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").unwrap(),
            ),
            DynSolValue::String("ipfs://script".into()),
        ]
    }

    #[test]
    fn encode_decode_round_trip() {
        let codec = SchemaCodec::parse(ID_SCHEMA).unwrap();
        let encoded = codec.encode(sample_values()).unwrap();
        let decoded = codec.decode(&hex::encode_prefixed(&encoded)).unwrap();

        assert_eq!(decoded["idType"], "email");
        assert_eq!(decoded["id"], "alice@example.org");
        assert_eq!(
            decoded["subject"],
            "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12"
        );
        assert_eq!(decoded["scriptURI"], "ipfs://script");
    }

    #[test]
    fn bare_uint_alias_decodes_as_uint256() {
        let codec = SchemaCodec::parse("address token, uint id").unwrap();
        let encoded = codec
            .encode(vec![
                DynSolValue::Address(Address::ZERO),
                DynSolValue::Uint(U256::from(42u64), 256),
            ])
            .unwrap();
        let decoded = codec.decode(&hex::encode_prefixed(&encoded)).unwrap();
        assert_eq!(decoded["id"], "42");
    }

    #[test]
    fn nested_schema_is_rejected() {
        let err = SchemaCodec::parse("(string a, string b) inner, string c").unwrap_err();
        assert!(matches!(err, CodecError::NestedSchema(_)));
    }

    #[test]
    fn malformed_field_is_rejected() {
        let err = SchemaCodec::parse("string").unwrap_err();
        assert!(matches!(err, CodecError::MalformedField(_)));
    }

    #[test]
    fn arity_mismatch_fails_encode() {
        let codec = SchemaCodec::parse(ID_SCHEMA).unwrap();
        let err = codec
            .encode(vec![DynSolValue::String("email".into())])
            .unwrap_err();
        assert!(matches!(err, CodecError::Mismatch(_)));
    }

    #[test]
    fn truncated_payload_fails_decode() {
        let codec = SchemaCodec::parse(ID_SCHEMA).unwrap();
        let err = codec.decode("0x00ff").unwrap_err();
        assert!(matches!(err, CodecError::Mismatch(_)));
    }

    #[test]
    fn type_mismatch_fails_encode() {
        let codec = SchemaCodec::parse("address token").unwrap();
        let err = codec
            .encode(vec![DynSolValue::String("not-an-address".into())])
            .unwrap_err();
        assert!(matches!(err, CodecError::Mismatch(_)));
    }
}
