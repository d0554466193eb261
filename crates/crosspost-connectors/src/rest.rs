// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST connector shared by both platforms.
//!
//! Publish requests carry an `Idempotency-Key` header so the platform can
//! coalesce duplicates. Outcome classification is deliberately
//! conservative: any failure where the request may already have reached the
//! platform (timeout after send, unparseable success body) is reported as
//! ambiguous, never as transient, so the worker verifies before retrying.

use std::time::Duration;

use async_trait::async_trait;
use crosspost_config::model::ConnectorConfig;
use crosspost_core::{CrosspostError, Platform, PlatformConnector, PublishOutcome};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct PublishResponse {
    id: String,
}

/// One platform's REST connector.
#[derive(Debug, Clone)]
pub struct RestConnector {
    platform: Platform,
    client: reqwest::Client,
    publish_url: Option<String>,
    verify_url: Option<String>,
    access_token: Option<String>,
}

impl RestConnector {
    /// Build a connector from per-platform config and a vault-sourced
    /// access token. Missing endpoint or token still permits dry-run.
    pub fn new(
        platform: Platform,
        config: &ConnectorConfig,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CrosspostError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrosspostError::Connector {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            platform,
            client,
            publish_url: config.publish_url.clone(),
            verify_url: config.verify_url.clone(),
            access_token,
        })
    }

    fn dry_run_id(&self, idempotency_key: &str) -> String {
        let short = &idempotency_key[..8.min(idempotency_key.len())];
        format!("{}_dry_{short}", self.platform)
    }
}

#[async_trait]
impl PlatformConnector for RestConnector {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn publish(
        &self,
        content: &str,
        idempotency_key: &str,
        dry_run: bool,
    ) -> PublishOutcome {
        if dry_run {
            let external_id = self.dry_run_id(idempotency_key);
            debug!(platform = %self.platform, external_id, "dry-run publish, no API call");
            return PublishOutcome::Success { external_id };
        }

        let Some(url) = &self.publish_url else {
            return PublishOutcome::Permanent {
                error: format!("{} publish endpoint is not configured", self.platform),
            };
        };
        let Some(token) = &self.access_token else {
            return PublishOutcome::Permanent {
                error: format!("no {} access token in vault", self.platform),
            };
        };

        let result = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("Idempotency-Key", idempotency_key)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            // A timeout after the request went out is indeterminate: the
            // platform may have published.
            Err(e) if e.is_timeout() => {
                warn!(platform = %self.platform, error = %e, "publish timed out");
                return PublishOutcome::Ambiguous {
                    error: format!("request timed out: {e}"),
                };
            }
            Err(e) if e.is_connect() => {
                return PublishOutcome::Transient {
                    error: format!("connection failed: {e}"),
                };
            }
            Err(e) => {
                return PublishOutcome::Ambiguous {
                    error: format!("request failed mid-flight: {e}"),
                };
            }
        };

        let status = response.status();
        debug!(platform = %self.platform, status = %status, "publish response received");

        if status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    return PublishOutcome::Ambiguous {
                        error: format!("failed to read success body: {e}"),
                    };
                }
            };
            return match serde_json::from_str::<PublishResponse>(&body) {
                Ok(parsed) => PublishOutcome::Success {
                    external_id: parsed.id,
                },
                // The platform said 2xx but we cannot extract the post id.
                Err(e) => PublishOutcome::Ambiguous {
                    error: format!("unparseable success response: {e}"),
                },
            };
        }

        let body = response.text().await.unwrap_or_default();
        let error = format!("{} API returned {status}: {body}", self.platform);
        match status.as_u16() {
            429 | 500 | 502 | 503 | 504 => PublishOutcome::Transient { error },
            408 => PublishOutcome::Ambiguous { error },
            _ => PublishOutcome::Permanent { error },
        }
    }

    async fn lookup(&self, idempotency_key: &str) -> Result<Option<String>, CrosspostError> {
        let url = self.verify_url.as_ref().ok_or_else(|| CrosspostError::Connector {
            message: format!("{} verify endpoint is not configured", self.platform),
            source: None,
        })?;
        let Some(token) = &self.access_token else {
            return Err(CrosspostError::Connector {
                message: format!("no {} access token in vault", self.platform),
                source: None,
            });
        };

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("idempotency_key", idempotency_key)])
            .send()
            .await
            .map_err(|e| CrosspostError::Connector {
                message: format!("verification lookup failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrosspostError::Connector {
                message: format!("verification lookup returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: PublishResponse =
            response.json().await.map_err(|e| CrosspostError::Connector {
                message: format!("unparseable verification response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Some(parsed.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_connector(server_url: Option<&str>, token: Option<&str>) -> RestConnector {
        let config = ConnectorConfig {
            publish_url: server_url.map(|u| format!("{u}/publish")),
            verify_url: server_url.map(|u| format!("{u}/verify")),
            client_id: Some("client-1".to_string()),
            client_secret: Some("secret-1".to_string()),
        };
        RestConnector::new(
            Platform::Linkedin,
            &config,
            token.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn dry_run_never_touches_the_network() {
        let connector = test_connector(None, None);
        let outcome = connector.publish("hello", "abcdef0123456789", true).await;
        assert_eq!(
            outcome,
            PublishOutcome::Success {
                external_id: "linkedin_dry_abcdef01".to_string()
            }
        );
    }

    #[tokio::test]
    async fn successful_publish_carries_idempotency_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/publish"))
            .and(header("Idempotency-Key", "key-123"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "li_99"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let connector = test_connector(Some(&server.uri()), Some("tok-1"));
        let outcome = connector.publish("hello world", "key-123", false).await;
        assert_eq!(
            outcome,
            PublishOutcome::Success {
                external_id: "li_99".to_string()
            }
        );
    }

    #[tokio::test]
    async fn auth_failures_are_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/publish"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let connector = test_connector(Some(&server.uri()), Some("bad-token"));
        let outcome = connector.publish("hello", "key-1", false).await;
        assert!(matches!(outcome, PublishOutcome::Permanent { .. }), "{outcome:?}");
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/publish"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let connector = test_connector(Some(&server.uri()), Some("tok-1"));
        let outcome = connector.publish("hello", "key-1", false).await;
        assert!(matches!(outcome, PublishOutcome::Transient { .. }), "{outcome:?}");
    }

    #[tokio::test]
    async fn unparseable_success_is_ambiguous() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/publish"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let connector = test_connector(Some(&server.uri()), Some("tok-1"));
        let outcome = connector.publish("hello", "key-1", false).await;
        assert!(matches!(outcome, PublishOutcome::Ambiguous { .. }), "{outcome:?}");
    }

    #[tokio::test]
    async fn missing_token_is_permanent_without_network() {
        let connector = test_connector(Some("http://127.0.0.1:1"), None);
        let outcome = connector.publish("hello", "key-1", false).await;
        assert!(matches!(outcome, PublishOutcome::Permanent { .. }), "{outcome:?}");
    }

    #[tokio::test]
    async fn lookup_resolves_found_and_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/verify"))
            .and(query_param("idempotency_key", "key-found"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "li_42"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/verify"))
            .and(query_param("idempotency_key", "key-absent"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let connector = test_connector(Some(&server.uri()), Some("tok-1"));
        assert_eq!(
            connector.lookup("key-found").await.unwrap(),
            Some("li_42".to_string())
        );
        assert_eq!(connector.lookup("key-absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn lookup_server_error_is_an_error_not_absence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let connector = test_connector(Some(&server.uri()), Some("tok-1"));
        assert!(connector.lookup("key-1").await.is_err());
    }
}
