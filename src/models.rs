// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! # API Data Models
//!
//! Request, response and stored-record data structures for the REST API.
//! All types derive `Serialize`/`Deserialize` and `ToSchema` for automatic
//! JSON handling and OpenAPI documentation. JSON field names are camelCase
//! to match the upstream SDK payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::eas::offchain::OffchainAttestation;

// =============================================================================
// Identity Types
// =============================================================================

/// The fixed set of identity providers an identity attestation may claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    Email,
    Discord,
    Twitter,
    Github,
}

impl IdType {
    pub const ALL: [IdType; 4] = [
        IdType::Email,
        IdType::Discord,
        IdType::Twitter,
        IdType::Github,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Email => "email",
            IdType::Discord => "discord",
            IdType::Twitter => "twitter",
            IdType::Github => "github",
        }
    }
}

impl std::str::FromStr for IdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(IdType::Email),
            "discord" => Ok(IdType::Discord),
            "twitter" => Ok(IdType::Twitter),
            "github" => Ok(IdType::Github),
            other => Err(format!("unsupported id type `{other}`")),
        }
    }
}

impl std::fmt::Display for IdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Stored Attestation
// =============================================================================

/// A persisted off-chain attestation.
///
/// `decoded` is a cached projection of `raw_data` through the schema codec,
/// computed once at save time. `created_at` is the attestation message's
/// `time` field and the sort/pagination key for all list queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EasAttestation {
    /// Globally unique identifier derived from the signed contents.
    pub uid: String,
    /// Address recovered from the payload signature at save time.
    pub attester: String,
    /// Recipient address from the attestation message.
    pub subject: String,
    /// Schema uid the payload was encoded with.
    pub schema: String,
    /// Field name to decoded value mapping.
    #[schema(value_type = Object)]
    pub decoded: serde_json::Map<String, serde_json::Value>,
    /// Chain whose EAS deployment the schema belongs to.
    pub chain_id: String,
    /// Full signed payload, verbatim, for auditability and re-verification.
    pub raw_data: OffchainAttestation,
    /// Epoch timestamp from the message `time` field.
    pub created_at: u64,
}

// =============================================================================
// Summary Views
// =============================================================================

/// Trimmed raw-data view returned by the point lookup: enough to display
/// revocability and expiry without shipping the whole signed payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RawDataSummary {
    pub message: RawMessageSummary,
    pub domain: RawDomainSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawMessageSummary {
    pub revocable: bool,
    pub expiration_time: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawDomainSummary {
    pub chain_id: u64,
}

/// Attestation record with the raw payload reduced to [`RawDataSummary`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttestationSummary {
    pub uid: String,
    pub attester: String,
    pub subject: String,
    pub schema: String,
    #[schema(value_type = Object)]
    pub decoded: serde_json::Map<String, serde_json::Value>,
    pub created_at: u64,
    pub raw_data: RawDataSummary,
}

impl From<EasAttestation> for AttestationSummary {
    fn from(att: EasAttestation) -> Self {
        Self {
            uid: att.uid,
            attester: att.attester,
            subject: att.subject,
            schema: att.schema,
            decoded: att.decoded,
            created_at: att.created_at,
            raw_data: RawDataSummary {
                message: RawMessageSummary {
                    revocable: att.raw_data.message.revocable,
                    expiration_time: att.raw_data.message.expiration_time,
                },
                domain: RawDomainSummary {
                    chain_id: att.raw_data.domain.chain_id,
                },
            },
        }
    }
}

/// Flattened view of one identity attestation for the per-type listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdAttestationView {
    pub uid: String,
    pub attester: String,
    /// The claimed identity value (named `email` for historical reasons,
    /// regardless of provider).
    pub email: String,
    pub created_at: u64,
    pub expiration_time: u64,
    pub revocable: bool,
    pub id_type: IdType,
}

/// Counts of issued identity attestations per provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdStatus {
    pub email: u64,
    pub discord: u64,
    pub twitter: u64,
    pub github: u64,
}

// =============================================================================
// Requests
// =============================================================================

/// Which role the uploader of an attestation claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadRole {
    Attester,
    Subject,
}

/// Body of `POST /attestations`.
///
/// `attestation` is the signed off-chain attestation as a JSON string; the
/// uploader signs exactly that string (EIP-191) to produce `signature`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadAttestationRequest {
    pub attestation: String,
    pub signature: String,
    pub by: UploadRole,
}

/// The identity claim a wallet signs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdPayload {
    /// Provider name; must be one of [`IdType`]. Kept as a string because
    /// the EIP-712 signature covers the raw value.
    pub id_type: String,
    /// The claimed handle or address, e.g. an email address.
    pub value: String,
    /// Email OTP; present only for `idType == "email"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Body of `POST /attestations/id`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttestIdRequest {
    pub id: IdPayload,
    /// Receiver wallet's signature over the `idData` typed struct.
    pub id_signature: String,
    /// Address the identity attestation is issued to.
    pub receiver: String,
    /// Rendering script URI embedded in the attestation.
    #[serde(rename = "scriptURI")]
    pub script_uri: String,
    /// Expiry in hours; 0 means the attestation never expires.
    pub expire_time: u64,
}

/// Body of `POST /attestations/id/otp`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestOtpRequest {
    pub email: String,
}

// =============================================================================
// Queries
// =============================================================================

/// Query string of `GET /attestations`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub attester: Option<String>,
    pub subject: Option<String>,
    pub start_at: Option<u64>,
    pub max: Option<usize>,
}

/// Query string of paginated identity listings.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub start_at: Option<u64>,
    pub max: Option<usize>,
}
