// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Outbound mail via the common mail API.
//!
//! The mail service renders a template URL with the supplied parameters and
//! delivers it; authentication is a project API key in the `x-stl-key`
//! header. Delivery failures surface as errors to the caller, which treats
//! them as upstream failures (no retry here).

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MailRequest<'a> {
    email: &'a str,
    subject: &'a str,
    template_url: &'a str,
    params: serde_json::Value,
}

/// Client for the common mail API.
pub struct MailClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MailClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Send one templated mail.
    pub async fn send(
        &self,
        email: &str,
        subject: &str,
        template_url: &str,
        params: serde_json::Value,
    ) -> Result<(), MailError> {
        let body = MailRequest {
            email,
            subject,
            template_url,
            params,
        };
        self.http
            .post(format!("{}/mails", self.base_url))
            .header("x-stl-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(email, subject, "Mail dispatched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_request_serializes_camel_case() {
        let body = MailRequest {
            email: "alice@example.org",
            subject: "Your verification code",
            template_url: "https://resources.example/otp.html",
            params: serde_json::json!({"code": "123456"}),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["templateUrl"], "https://resources.example/otp.html");
        assert_eq!(json["params"]["code"], "123456");
    }
}
