// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

use std::sync::Arc;

use crate::service::AttestationService;

/// Shared application state, cloned per request by axum.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AttestationService>,
}

impl AppState {
    pub fn new(service: AttestationService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
