// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    models::{
        AttestIdRequest, AttestationSummary, EasAttestation, IdAttestationView, IdStatus, IdType,
        ListQuery, PageQuery, RequestOtpRequest, UploadAttestationRequest,
    },
    state::AppState,
};

use crate::eas::offchain::OffchainAttestation;

#[utoipa::path(
    get,
    path = "/attestations",
    params(ListQuery),
    tag = "Attestations",
    responses(
        (status = 200, body = [EasAttestation]),
        (status = 400, description = "Neither attester nor subject given"),
        (status = 404, description = "No attestations match the filters")
    )
)]
pub async fn list_attestations(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<EasAttestation>>, ApiError> {
    let rows = state.service.list(
        params.attester.as_deref(),
        params.subject.as_deref(),
        params.start_at,
        params.max,
    )?;
    if rows.is_empty() {
        return Err(ApiError::not_found("No attestations found"));
    }
    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/attestations",
    request_body = UploadAttestationRequest,
    tag = "Attestations",
    responses(
        (status = 201, body = EasAttestation),
        (status = 400, description = "Malformed payload or role mismatch"),
        (status = 409, description = "Attestation already stored")
    )
)]
pub async fn upload_attestation(
    State(state): State<AppState>,
    Json(request): Json<UploadAttestationRequest>,
) -> Result<(StatusCode, Json<EasAttestation>), ApiError> {
    let stored = state.service.upload(&request)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[utoipa::path(
    post,
    path = "/attestations/id",
    request_body = AttestIdRequest,
    tag = "Identity",
    responses(
        (status = 201, body = EasAttestation),
        (status = 400, description = "Unsupported id type or malformed request"),
        (status = 401, description = "Signature or verification code rejected")
    )
)]
pub async fn create_id_attestation(
    State(state): State<AppState>,
    Json(request): Json<AttestIdRequest>,
) -> Result<(StatusCode, Json<EasAttestation>), ApiError> {
    let stored = state.service.create_id_attestation(&request)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[utoipa::path(
    post,
    path = "/attestations/id/otp",
    request_body = RequestOtpRequest,
    tag = "Identity",
    responses(
        (status = 204, description = "Verification code issued"),
        (status = 400, description = "Invalid email address")
    )
)]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(request): Json<RequestOtpRequest>,
) -> Result<StatusCode, ApiError> {
    state.service.request_email_otp(&request.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/attestations/ids/status",
    tag = "Identity",
    responses((status = 200, body = IdStatus))
)]
pub async fn id_status(State(state): State<AppState>) -> Result<Json<IdStatus>, ApiError> {
    Ok(Json(state.service.id_status()?))
}

#[utoipa::path(
    get,
    path = "/attestations/ids/{id_type}",
    params(
        ("id_type" = String, Path, description = "Identity provider: email, discord, twitter or github"),
        PageQuery
    ),
    tag = "Identity",
    responses(
        (status = 200, body = [IdAttestationView]),
        (status = 400, description = "Unsupported id type")
    )
)]
pub async fn list_id_attestations(
    Path(id_type): Path<String>,
    Query(params): Query<PageQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<IdAttestationView>>, ApiError> {
    let id_type: IdType = id_type.parse().map_err(ApiError::bad_request)?;
    let rows = state
        .service
        .list_id_attestations(id_type, params.start_at, params.max)?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/attestations/{address}",
    params(
        ("address" = String, Path, description = "Recipient wallet address")
    ),
    tag = "Attestations",
    responses((status = 200, body = [String], description = "Distinct attester addresses"))
)]
pub async fn issuers(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.service.issuers(&address)?))
}

#[utoipa::path(
    get,
    path = "/attestations/{address}/{token_id}",
    params(
        ("address" = String, Path, description = "Attester wallet address"),
        ("token_id" = String, Path, description = "Attestation uid")
    ),
    tag = "Attestations",
    responses(
        (status = 200, body = AttestationSummary),
        (status = 404, description = "No such attestation for this attester")
    )
)]
pub async fn get_by_attester(
    Path((address, token_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<AttestationSummary>, ApiError> {
    match state.service.get(&address, &token_id)? {
        Some(att) => Ok(Json(att.into())),
        None => Err(ApiError::not_found("Attestation not found")),
    }
}

#[utoipa::path(
    get,
    path = "/attestations/{address}/{token_id}/{schema}",
    params(
        ("address" = String, Path, description = "Token contract address in the decoded payload"),
        ("token_id" = String, Path, description = "Token id in the decoded payload"),
        ("schema" = String, Path, description = "Schema uid")
    ),
    tag = "Attestations",
    responses(
        (status = 200, body = EasAttestation),
        (status = 404, description = "No attestation matches the decoded fields")
    )
)]
pub async fn get_by_decoded(
    Path((address, token_id, schema)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> Result<Json<EasAttestation>, ApiError> {
    match state.service.get_by_decoded(&schema, &address, &token_id)? {
        Some(att) => Ok(Json(att)),
        None => Err(ApiError::not_found("Attestation not found")),
    }
}

#[utoipa::path(
    get,
    path = "/attestations/{address}/{token_id}/{schema}/rawdata",
    params(
        ("address" = String, Path, description = "Attester wallet address"),
        ("token_id" = String, Path, description = "Attestation uid"),
        ("schema" = String, Path, description = "Chain id the attestation was issued for")
    ),
    tag = "Attestations",
    responses(
        (status = 200, body = OffchainAttestation, description = "Verbatim signed payload"),
        (status = 404, description = "No such attestation on this chain")
    )
)]
pub async fn get_raw_data(
    Path((address, token_id, chain)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> Result<Json<OffchainAttestation>, ApiError> {
    match state.service.get_raw_data(&address, &token_id, &chain)? {
        Some(raw) => Ok(Json(raw)),
        None => Err(ApiError::not_found("Attestation not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::eas::verify;
    use crate::models::IdPayload;
    use crate::service::AttestationService;
    use crate::storage::AttestationDatabase;
    use alloy::hex;
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;

    const SERVICE_SK: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const RECEIVER_SK: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn test_state(dir: &std::path::Path) -> AppState {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: dir.to_path_buf(),
            chain_id: 11_155_111,
            attester_sk: SERVICE_SK.to_string(),
            eas_version: "1.2.0".to_string(),
            mail_api: None,
            project_api_key: String::new(),
            secret_ttl_secs: 300,
        };
        let db = AttestationDatabase::open(&config.database_path()).unwrap();
        AppState::new(AttestationService::new(&config, db).unwrap())
    }

    fn signed_id_request(id_type: &str, value: &str) -> AttestIdRequest {
        let receiver: PrivateKeySigner = RECEIVER_SK.parse().unwrap();
        let digest = verify::id_signing_hash(id_type, value, None, 11_155_111, "1.2.0");
        let signature = receiver.sign_hash_sync(&digest).unwrap();
        AttestIdRequest {
            id: IdPayload {
                id_type: id_type.to_string(),
                value: value.to_string(),
                secret: None,
            },
            id_signature: hex::encode_prefixed(signature.as_bytes()),
            receiver: receiver.address().to_checksum(None),
            script_uri: "ipfs://script".to_string(),
            expire_time: 0,
        }
    }

    #[tokio::test]
    async fn create_then_fetch_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (status, Json(stored)) = create_id_attestation(
            State(state.clone()),
            Json(signed_id_request("discord", "alice#1234")),
        )
        .await
        .expect("identity attestation issued");
        assert_eq!(status, StatusCode::CREATED);

        let Json(summary) = get_by_attester(
            Path((stored.attester.clone(), stored.uid.clone())),
            State(state.clone()),
        )
        .await
        .expect("point lookup succeeds");
        assert_eq!(summary.uid, stored.uid);
        assert_eq!(summary.raw_data.domain.chain_id, 11_155_111);

        let Json(raw) = get_raw_data(
            Path((stored.attester.clone(), stored.uid.clone(), "11155111".into())),
            State(state.clone()),
        )
        .await
        .expect("raw payload is returned");
        assert_eq!(raw.uid, stored.uid);

        // The wrong chain yields a 404.
        let err = get_raw_data(
            Path((stored.attester, stored.uid, "137".into())),
            State(state),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_filters_and_status_counts() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (_, Json(stored)) = create_id_attestation(
            State(state.clone()),
            Json(signed_id_request("github", "alice")),
        )
        .await
        .unwrap();

        let Json(rows) = list_attestations(
            State(state.clone()),
            Query(ListQuery {
                attester: Some(stored.attester.clone()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 1);

        // Missing both filters is a client error.
        let err = list_attestations(State(state.clone()), Query(ListQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        // A filter that matches nothing is a 404, not an empty page.
        let err = list_attestations(
            State(state.clone()),
            Query(ListQuery {
                attester: Some("0x0000000000000000000000000000000000000001".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let Json(status) = id_status(State(state.clone())).await.unwrap();
        assert_eq!(status.github, 1);
        assert_eq!(status.email, 0);

        let Json(views) = list_id_attestations(
            Path("github".to_string()),
            Query(PageQuery::default()),
            State(state.clone()),
        )
        .await
        .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].email, "alice");

        let Json(who) = issuers(Path(stored.subject.clone()), State(state))
            .await
            .unwrap();
        assert_eq!(who, vec![stored.attester]);
    }

    #[tokio::test]
    async fn unsupported_id_type_is_a_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let err = list_id_attestations(
            Path("slack".to_string()),
            Query(PageQuery::default()),
            State(state.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = create_id_attestation(
            State(state),
            Json(signed_id_request("slack", "whoever")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn email_attestation_requires_the_otp() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let err = create_id_attestation(
            State(state.clone()),
            Json(signed_id_request("email", "alice@example.org")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        // Invalid email for the OTP request itself.
        let err = request_otp(
            State(state),
            Json(RequestOtpRequest {
                email: "not-an-email".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_attestation_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let err = get_by_attester(
            Path(("0x9".to_string(), "0xabc".to_string())),
            State(state.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = get_by_decoded(
            Path((
                "0x76568BEd5Acf1A5Cd888773C8cAe9ea2a9131A63".to_string(),
                "7".to_string(),
                "0x49e5d2bdbb88330018dc0b9ef5b5b6295352a927fc44ca0b45fc6a355e5688c1".to_string(),
            )),
            State(state),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
