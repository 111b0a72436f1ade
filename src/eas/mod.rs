// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Ethereum Attestation Service (EAS) integration.
//!
//! - `schemas` - per-chain EAS deployments and known schema definitions
//! - `codec` - schema-driven ABI encoding/decoding of attestation payloads
//! - `offchain` - off-chain attestation payloads, EIP-712 hashing, signing
//! - `verify` - signature recovery for identity claims and uploads

pub mod codec;
pub mod offchain;
pub mod schemas;
pub mod verify;

pub use codec::{CodecError, SchemaCodec};
pub use offchain::{OffchainAttestation, OffchainError};
pub use schemas::{ChainSchemas, SchemaDef, SchemaRegistry};
