// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! [`Config`] struct loaded from the environment at startup. The struct is
//! passed by constructor into [`crate::service::AttestationService`] so tests
//! can substitute their own values.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the attestation database | `/data` |
//! | `CHAIN_ID` | Chain whose EAS deployment schemas belong to | `11155111` |
//! | `ATTESTER_SK` | Hex private key of the service attester wallet | Required |
//! | `EAS_VERSION` | EAS off-chain domain version string | `1.2.0` |
//! | `COMMON_API` | Base URL of the outbound mail API | Unset (OTP codes traced) |
//! | `PROJECT_API_KEY` | `x-stl-key` header value for the mail API | Empty |
//! | `SECRET_TTL` | Email OTP lifetime in seconds | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

/// Hard upper bound on `max` for all list queries. Requests asking for more
/// are clamped, never rejected.
pub const MAX_LIMIT: usize = 50;

/// Default email OTP lifetime in seconds.
pub const DEFAULT_SECRET_TTL_SECS: u64 = 300;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Filename of the redb attestation database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "attestations.redb";

/// Runtime configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub host: String,
    /// Server bind port.
    pub port: u16,
    /// Directory holding the attestation database.
    pub data_dir: PathBuf,
    /// Chain id of the EAS deployment this instance serves.
    pub chain_id: u64,
    /// Hex-encoded private key of the service attester wallet.
    pub attester_sk: String,
    /// EAS off-chain typed-data domain version.
    pub eas_version: String,
    /// Base URL of the common mail API, if configured.
    pub mail_api: Option<String>,
    /// API key sent as `x-stl-key` to the mail API.
    pub project_api_key: String,
    /// Email OTP lifetime in seconds.
    pub secret_ttl_secs: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("PORT", 8080)?;
        let data_dir = env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/data"));
        let chain_id = parse_var("CHAIN_ID", 11_155_111)?;
        let attester_sk =
            env::var("ATTESTER_SK").map_err(|_| ConfigError::Missing("ATTESTER_SK"))?;
        let eas_version = env::var("EAS_VERSION").unwrap_or_else(|_| "1.2.0".to_string());
        let mail_api = env::var("COMMON_API")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string());
        let project_api_key = env::var("PROJECT_API_KEY").unwrap_or_default();
        let secret_ttl_secs = parse_var("SECRET_TTL", DEFAULT_SECRET_TTL_SECS)?;

        Ok(Self {
            host,
            port,
            data_dir,
            chain_id,
            attester_sk,
            eas_version,
            mail_api,
            project_api_key,
            secret_ttl_secs,
        })
    }

    /// Path of the redb database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(name, e.to_string())),
        Err(_) => Ok(default),
    }
}
