// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    eas::offchain::{
        AttestMessage, AttestationDomain, EcdsaSignature, OffchainAttestation, TypeField,
    },
    models::{
        AttestIdRequest, AttestationSummary, EasAttestation, IdAttestationView, IdPayload,
        IdStatus, IdType, RawDataSummary, RawDomainSummary, RawMessageSummary, RequestOtpRequest,
        UploadAttestationRequest, UploadRole,
    },
    state::AppState,
};

pub mod attestations;
pub mod health;

pub fn router(state: AppState) -> Router {
    let attestation_routes = Router::new()
        .route(
            "/attestations",
            get(attestations::list_attestations).post(attestations::upload_attestation),
        )
        .route("/attestations/id", post(attestations::create_id_attestation))
        .route("/attestations/id/otp", post(attestations::request_otp))
        .route("/attestations/ids/status", get(attestations::id_status))
        .route(
            "/attestations/ids/{id_type}",
            get(attestations::list_id_attestations),
        )
        .route("/attestations/{address}", get(attestations::issuers))
        .route(
            "/attestations/{address}/{token_id}",
            get(attestations::get_by_attester),
        )
        .route(
            "/attestations/{address}/{token_id}/{schema}",
            get(attestations::get_by_decoded),
        )
        .route(
            "/attestations/{address}/{token_id}/{schema}/rawdata",
            get(attestations::get_raw_data),
        )
        .route("/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .merge(attestation_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        attestations::list_attestations,
        attestations::upload_attestation,
        attestations::create_id_attestation,
        attestations::request_otp,
        attestations::id_status,
        attestations::list_id_attestations,
        attestations::issuers,
        attestations::get_by_attester,
        attestations::get_by_decoded,
        attestations::get_raw_data,
        health::health,
        health::readiness
    ),
    components(
        schemas(
            EasAttestation,
            AttestationSummary,
            RawDataSummary,
            RawMessageSummary,
            RawDomainSummary,
            IdAttestationView,
            IdStatus,
            IdType,
            IdPayload,
            AttestIdRequest,
            RequestOtpRequest,
            UploadAttestationRequest,
            UploadRole,
            OffchainAttestation,
            AttestationDomain,
            AttestMessage,
            EcdsaSignature,
            TypeField,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Attestations", description = "Store and query signed off-chain attestations"),
        (name = "Identity", description = "Identity attestation issuance"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::service::AttestationService;
    use crate::storage::AttestationDatabase;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: dir.path().to_path_buf(),
            chain_id: 11_155_111,
            attester_sk: "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .to_string(),
            eas_version: "1.2.0".to_string(),
            mail_api: None,
            project_api_key: String::new(),
            secret_ttl_secs: 300,
        };
        let db = AttestationDatabase::open(&config.database_path()).unwrap();
        let state = AppState::new(AttestationService::new(&config, db).unwrap());
        // Ensure the router can be converted into a service without panicking.
        let _ = router(state).into_make_service();
    }
}
