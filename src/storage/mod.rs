// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Persistent attestation storage.
//!
//! A single redb database holds the attestation table plus the secondary
//! indexes the query surface needs. See [`database`] for the table layout.

pub mod database;

pub use database::{AttestationDatabase, AttestationDbError, DbResult};
