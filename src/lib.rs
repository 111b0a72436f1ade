// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Attestation Service - Off-chain EAS attestation marketplace backend
//!
//! This crate stores and serves signed off-chain EAS attestations and
//! issues identity attestations (email gated by a one-time code) with a
//! server-held attester wallet.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `eas` - Schema codec, EIP-712 payloads and signature recovery
//! - `service` - Attestation issuance and query orchestration
//! - `storage` - Embedded attestation store (redb)

pub mod api;
pub mod config;
pub mod eas;
pub mod error;
pub mod mailer;
pub mod models;
pub mod otp;
pub mod service;
pub mod state;
pub mod storage;
