// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use sln_attestation_server::{
    api::router, config::Config, service::AttestationService, state::AppState,
    storage::AttestationDatabase,
};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = std::fs::create_dir_all(&config.data_dir) {
        tracing::error!(path = %config.data_dir.display(), error = %err, "Cannot create data directory");
        std::process::exit(1);
    }

    let db = match AttestationDatabase::open(&config.database_path()) {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, "Cannot open attestation database");
            std::process::exit(1);
        }
    };

    let service = match AttestationService::new(&config, db) {
        Ok(service) => service,
        Err(err) => {
            tracing::error!(error = %err, "Cannot initialize attestation service");
            std::process::exit(1);
        }
    };
    tracing::info!(
        attester = %service.attester_address().to_checksum(None),
        chain_id = service.chain_id(),
        "Attester wallet loaded"
    );

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!(error = %err, "Invalid bind address");
            std::process::exit(1);
        }
    };

    let app = router(AppState::new(service));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "Cannot bind server address");
            std::process::exit(1);
        }
    };
    tracing::info!("Attestation server listening on http://{addr} (docs at /docs)");

    if let Err(err) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "Server failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Cannot listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
