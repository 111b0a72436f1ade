// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Attestation service: orchestrates the store, the schema codec and
//! signature verification.
//!
//! Every operation is terminal for its request: a failed step halts the
//! flow and nothing partial is ever persisted. The creation flow for an
//! identity attestation is strictly
//! `signature-verified → (OTP-verified) → encoded/signed → persisted`.

use std::str::FromStr;
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use chrono::Utc;

use crate::config::{Config, MAX_LIMIT};
use crate::eas::codec::{CodecError, SchemaCodec};
use crate::eas::offchain::{self, AttestParams, OffchainAttestation, OffchainError};
use crate::eas::schemas::SchemaRegistry;
use crate::eas::verify;
use crate::mailer::{MailClient, MailError};
use crate::models::{
    AttestIdRequest, EasAttestation, IdAttestationView, IdStatus, IdType,
    UploadAttestationRequest, UploadRole,
};
use crate::otp::{normalize_identity, OtpStore};
use crate::storage::{AttestationDatabase, AttestationDbError};

const OTP_MAIL_SUBJECT: &str = "Your verification code";
const OTP_MAIL_TEMPLATE: &str =
    "https://resources.smartlayer.network/templates/attestation-otp.html";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidPayload(String),

    #[error("{0}")]
    RoleMismatch(String),

    #[error("{0}")]
    InvalidSignature(String),

    #[error("invalid or expired code")]
    OtpRejected,

    #[error("unknown schema {0}")]
    UnknownSchema(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Database(#[from] AttestationDbError),

    #[error(transparent)]
    Signing(#[from] OffchainError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("setup error: {0}")]
    Setup(String),
}

type Result<T> = std::result::Result<T, ServiceError>;

/// Orchestrator over store, codec, verifier, OTP store and mail client.
/// All collaborators are constructor-injected so tests can substitute them.
pub struct AttestationService {
    db: AttestationDatabase,
    registry: SchemaRegistry,
    signer: PrivateKeySigner,
    eas_version: String,
    pub(crate) otp: OtpStore,
    mailer: Option<MailClient>,
}

impl AttestationService {
    pub fn new(config: &Config, db: AttestationDatabase) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .attester_sk
            .parse()
            .map_err(|e| ServiceError::Setup(format!("invalid ATTESTER_SK: {e}")))?;
        let registry = SchemaRegistry::for_chain(config.chain_id).ok_or_else(|| {
            ServiceError::Setup(format!("no EAS deployment for chain {}", config.chain_id))
        })?;
        let otp = OtpStore::new(
            config.attester_sk.as_bytes().to_vec(),
            Duration::from_secs(config.secret_ttl_secs),
        );
        let mailer = config
            .mail_api
            .clone()
            .map(|base| MailClient::new(base, config.project_api_key.clone()));

        Ok(Self {
            db,
            registry,
            signer,
            eas_version: config.eas_version.clone(),
            otp,
            mailer,
        })
    }

    /// Address of the service attester wallet.
    pub fn attester_address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.registry.chain_id()
    }

    pub fn is_healthy(&self) -> bool {
        self.db.is_healthy()
    }

    // =========================================================================
    // Save / Upload
    // =========================================================================

    /// Verify, decode and persist a signed off-chain attestation.
    ///
    /// The stored `attester` is always the recovered signer, and `decoded`
    /// is derived here once through the schema codec.
    pub fn save(&self, raw: OffchainAttestation) -> Result<EasAttestation> {
        let attester = raw
            .recover_attester()
            .map_err(|e| ServiceError::InvalidPayload(e.to_string()))?;

        let schema_uid = raw.message.schema.clone();
        let signature = self
            .registry
            .signature_of(&schema_uid)
            .ok_or_else(|| ServiceError::UnknownSchema(schema_uid.clone()))?;
        let codec = SchemaCodec::parse(signature)?;
        let decoded = codec.decode(&raw.message.data)?;

        let record = EasAttestation {
            uid: raw.uid.clone(),
            attester: attester.to_checksum(None),
            subject: raw.message.recipient.clone(),
            schema: schema_uid,
            decoded,
            chain_id: self.registry.chain_id().to_string(),
            created_at: raw.message.time,
            raw_data: raw,
        };
        self.db.insert(&record)?;

        tracing::info!(
            uid = %record.uid,
            attester = %record.attester,
            schema = %record.schema,
            "Attestation stored"
        );
        Ok(record)
    }

    /// Upload path: authenticate the uploader against the claimed role,
    /// then save.
    pub fn upload(&self, request: &UploadAttestationRequest) -> Result<EasAttestation> {
        let value: serde_json::Value = serde_json::from_str(&request.attestation)
            .map_err(|e| ServiceError::InvalidPayload(format!("invalid attestation JSON: {e}")))?;
        // Accept both the bare signed object and the `{sig, signer}` envelope.
        let normalized = match value.get("sig") {
            Some(sig) => sig.clone(),
            None => value,
        };
        let raw: OffchainAttestation = serde_json::from_value(normalized)
            .map_err(|e| ServiceError::InvalidPayload(format!("invalid attestation: {e}")))?;

        let uploader = verify::recover_message_signer(&request.attestation, &request.signature)
            .map_err(|e| ServiceError::InvalidPayload(e.to_string()))?;

        match request.by {
            UploadRole::Attester => {
                let attester = raw
                    .recover_attester()
                    .map_err(|e| ServiceError::InvalidPayload(e.to_string()))?;
                if uploader != attester {
                    return Err(ServiceError::RoleMismatch(
                        "Signer is not the attester".to_string(),
                    ));
                }
            }
            UploadRole::Subject => {
                let recipient = Address::from_str(&raw.message.recipient)
                    .map_err(|e| ServiceError::InvalidPayload(format!("invalid recipient: {e}")))?;
                if uploader != recipient {
                    return Err(ServiceError::RoleMismatch(
                        "Signer is not the subject".to_string(),
                    ));
                }
            }
        }
        self.save(raw)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn get(&self, attester: &str, uid: &str) -> Result<Option<EasAttestation>> {
        Ok(self.db.get_by_attester(attester, uid)?)
    }

    pub fn get_by_subject(&self, subject: &str, uid: &str) -> Result<Option<EasAttestation>> {
        Ok(self.db.get_by_subject(subject, uid)?)
    }

    /// Raw signed payload for (attester, uid) on a specific chain.
    pub fn get_raw_data(
        &self,
        attester: &str,
        uid: &str,
        chain: &str,
    ) -> Result<Option<OffchainAttestation>> {
        Ok(self
            .db
            .get_raw_by_attester(attester, uid, chain)?
            .map(|att| att.raw_data))
    }

    /// Point lookup by decoded-field equality (`token`, `id`) within a
    /// schema. Used by the marketplace to detect an already-registered
    /// selling offer; the caller deliberately treats a hit as "reuse the
    /// existing attestation" rather than an error.
    pub fn get_by_decoded(
        &self,
        schema: &str,
        token: &str,
        id: &str,
    ) -> Result<Option<EasAttestation>> {
        Ok(self.db.find_by_decoded(schema, token, id)?)
    }

    /// List by attester and/or subject; at least one filter is required.
    pub fn list(
        &self,
        attester: Option<&str>,
        subject: Option<&str>,
        start_at: Option<u64>,
        max: Option<usize>,
    ) -> Result<Vec<EasAttestation>> {
        let start_at = start_at.unwrap_or(0);
        let max = clamp_page_size(max);
        let rows = match (attester, subject) {
            (Some(attester), Some(subject)) => {
                self.db
                    .list_by_attester_and_subject(attester, subject, start_at, max)?
            }
            (Some(attester), None) => self.db.list_by_attester(attester, start_at, max)?,
            (None, Some(subject)) => self.db.list_by_subject(subject, start_at, max)?,
            (None, None) => {
                return Err(ServiceError::InvalidPayload(
                    "attester or subject is required".to_string(),
                ))
            }
        };
        Ok(rows)
    }

    // =========================================================================
    // Identity Attestations
    // =========================================================================

    /// Issue and persist an identity attestation.
    ///
    /// Flow: verify the receiver's signature over the claim, gate email
    /// claims behind the OTP, encode and sign with the service wallet,
    /// persist. Any failure halts before signing.
    pub fn create_id_attestation(&self, request: &AttestIdRequest) -> Result<EasAttestation> {
        let id_type: IdType = request
            .id
            .id_type
            .parse()
            .map_err(ServiceError::InvalidPayload)?;
        let receiver = Address::from_str(&request.receiver)
            .map_err(|e| ServiceError::InvalidPayload(format!("invalid receiver: {e}")))?;

        let recovered = verify::recover_id_signer(
            &request.id.id_type,
            &request.id.value,
            request.id.secret.as_deref(),
            &request.id_signature,
            self.registry.chain_id(),
            &self.eas_version,
        )
        .map_err(|e| ServiceError::InvalidSignature(e.to_string()))?;
        if recovered != receiver {
            return Err(ServiceError::InvalidSignature(
                "Invalid signature".to_string(),
            ));
        }

        if id_type == IdType::Email {
            let secret = request.id.secret.as_deref().ok_or(ServiceError::OtpRejected)?;
            let identity = normalize_identity(&request.id.value);
            if !self.otp.verify(&identity, secret) {
                return Err(ServiceError::OtpRejected);
            }
        }

        let schema = self.registry.id_schema();
        let codec = SchemaCodec::parse(schema.signature)?;
        let data = codec.encode(vec![
            DynSolValue::String(request.id.id_type.clone()),
            DynSolValue::String(request.id.value.clone()),
            DynSolValue::Address(receiver),
            DynSolValue::String(request.script_uri.clone()),
        ])?;

        // Identity attestations use second-resolution timestamps; expiry 0
        // means the attestation never expires.
        let now = Utc::now().timestamp() as u64;
        let expiration_time = if request.expire_time == 0 {
            0
        } else {
            now + request.expire_time * 3600
        };

        let raw = offchain::sign_offchain_attestation(
            &self.signer,
            AttestParams {
                schema_uid: schema.uid.to_string(),
                recipient: receiver,
                time: now,
                expiration_time,
                revocable: true,
                data,
                chain_id: self.registry.chain_id(),
                version: self.eas_version.clone(),
                verifying_contract: self.registry.eas_contract(),
            },
        )?;
        self.save(raw)
    }

    /// Issue an email OTP and dispatch it through the mail API.
    pub async fn request_email_otp(&self, email: &str) -> Result<()> {
        let identity = normalize_identity(email);
        if !identity.contains('@') || identity.len() < 3 {
            return Err(ServiceError::InvalidPayload(
                "invalid email address".to_string(),
            ));
        }
        let code = self.otp.issue(&identity);
        match &self.mailer {
            Some(mailer) => {
                mailer
                    .send(
                        &identity,
                        OTP_MAIL_SUBJECT,
                        OTP_MAIL_TEMPLATE,
                        serde_json::json!({ "code": code }),
                    )
                    .await?
            }
            None => {
                tracing::debug!(email = %identity, code = %code, "Mail API not configured, OTP issued without delivery");
            }
        }
        Ok(())
    }

    /// Identity attestations of one provider type, flattened for display.
    pub fn list_id_attestations(
        &self,
        id_type: IdType,
        start_at: Option<u64>,
        max: Option<usize>,
    ) -> Result<Vec<IdAttestationView>> {
        let rows = self.db.list_id_attestations(
            self.registry.id_schema().uid,
            id_type.as_str(),
            start_at.unwrap_or(0),
            clamp_page_size(max),
        )?;
        Ok(rows
            .into_iter()
            .map(|att| IdAttestationView {
                uid: att.uid,
                attester: att.attester,
                email: att
                    .decoded
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                created_at: att.created_at,
                expiration_time: att.raw_data.message.expiration_time,
                revocable: att.raw_data.message.revocable,
                id_type,
            })
            .collect())
    }

    /// Counts of issued identity attestations per provider.
    pub fn id_status(&self) -> Result<IdStatus> {
        let counts = self.db.id_type_counts(self.registry.id_schema().uid)?;
        let count = |ty: IdType| counts.get(ty.as_str()).copied().unwrap_or(0);
        Ok(IdStatus {
            email: count(IdType::Email),
            discord: count(IdType::Discord),
            twitter: count(IdType::Twitter),
            github: count(IdType::Github),
        })
    }

    /// Distinct attesters that have issued to `recipient`.
    pub fn issuers(&self, recipient: &str) -> Result<Vec<String>> {
        Ok(self.db.distinct_attesters_for(recipient)?)
    }

    #[cfg(test)]
    pub(crate) fn db(&self) -> &AttestationDatabase {
        &self.db
    }
}

/// Clamp a requested page size to the configured ceiling.
fn clamp_page_size(max: Option<usize>) -> usize {
    max.unwrap_or(MAX_LIMIT).min(MAX_LIMIT)
}
