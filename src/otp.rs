// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Short-lived OTP secret store for email identity verification.
//!
//! Codes are six digits, derived with HMAC-SHA256 over the normalized
//! identity and a fresh nonce, and stored in memory with a TTL. A code is
//! single use: verification consumes it. Absence, expiry and mismatch all
//! fail closed; a replacement code must be requested.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

struct OtpEntry {
    code: String,
    expires_at: Instant,
}

/// In-memory store of pending email OTPs.
pub struct OtpStore {
    key: Vec<u8>,
    ttl: Duration,
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl OtpStore {
    pub fn new(key: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh code for `identity`, replacing any pending one.
    pub fn issue(&self, identity: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .expect("HMAC accepts keys of any length");
        mac.update(identity.as_bytes());
        mac.update(Uuid::new_v4().as_bytes());
        let digest = mac.finalize().into_bytes();

        let word = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        let code = format!("{:06}", word % 1_000_000);

        let mut entries = self.entries.lock().expect("OTP store lock poisoned");
        entries.insert(
            identity.to_string(),
            OtpEntry {
                code: code.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        code
    }

    /// Check a code against the pending entry for `identity`, consuming the
    /// entry on success.
    pub fn verify(&self, identity: &str, code: &str) -> bool {
        let mut entries = self.entries.lock().expect("OTP store lock poisoned");

        // Drop whatever has expired while we hold the lock anyway.
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);

        match entries.get(identity) {
            Some(entry) if entry.code == code => {
                entries.remove(identity);
                true
            }
            _ => false,
        }
    }
}

/// Canonical form of a claimed identity value: NFKC, trimmed, lowercased.
pub fn normalize_identity(raw: &str) -> String {
    raw.trim().nfkc().collect::<String>().to_lowercase()
}
