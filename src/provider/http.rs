//! HTTP client for the hosted identity API.

use super::{AttemptOutcome, IdentityProvider, ProviderError, SessionId, SubError};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Verification channel requested for sign-up; code delivery over email.
const EMAIL_CODE_STRATEGY: &str = "email_code";

#[derive(Serialize)]
struct SignInBody<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email_address: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct PrepareVerificationBody<'a> {
    strategy: &'a str,
}

#[derive(Serialize)]
struct AttemptVerificationBody<'a> {
    code: &'a str,
}

/// Identity provider backed by the hosted HTTP API.
///
/// One instance is built at startup and shared process-wide; it is read-only
/// after construction.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    base_url: Url,
}

impl HttpIdentityProvider {
    /// Build the provider client for the given API base URL.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed or the HTTP client cannot
    /// be constructed.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;

        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(anyhow!("Error parsing URL: unsupported scheme {}", scheme)),
        }

        // Url::join drops the last path segment unless the base ends with a
        // slash; keep any path component of the configured URL intact.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| ProviderError::Transport(format!("Error building URL: {e}")))
    }

    #[instrument(skip(self, body))]
    async fn post<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<Value, ProviderError> {
        let url = self.endpoint_url(endpoint)?;

        debug!("endpoint URL: {}", endpoint);

        let response = self
            .client
            .post(url)
            .header("x-request-id", Uuid::new_v4().to_string())
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        read_json(response).await
    }
}

/// Parse a response body, mapping non-success statuses to provider errors.
async fn read_json(response: Response) -> Result<Value, ProviderError> {
    let status = response.status();

    let body: Value = response
        .json()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    if status.is_success() {
        Ok(body)
    } else {
        Err(rejection_from_body(status, &body))
    }
}

/// Build a `ProviderError` from an error response body.
///
/// The API reports structured failures as `{"errors": [{"message", "code"}]}`;
/// anything else is unstructured.
fn rejection_from_body(status: StatusCode, body: &Value) -> ProviderError {
    match body["errors"].as_array() {
        Some(errors) if !errors.is_empty() => ProviderError::Rejected(
            errors
                .iter()
                .map(|entry| SubError {
                    code: entry["code"].as_str().map(ToString::to_string),
                    message: entry["message"].as_str().unwrap_or("").to_string(),
                })
                .collect(),
        ),
        _ => ProviderError::Transport(format!("unexpected response: {status}")),
    }
}

/// Read an attempt outcome from a success body.
fn outcome_from_body(body: &Value) -> Result<AttemptOutcome, ProviderError> {
    let status = body["status"].as_str().unwrap_or_default();

    if status == "complete" {
        let session_id = body["created_session_id"].as_str().ok_or_else(|| {
            ProviderError::Transport("Error parsing response: no created_session_id".to_string())
        })?;

        Ok(AttemptOutcome::Complete {
            session_id: SessionId::new(session_id),
        })
    } else {
        Ok(AttemptOutcome::Incomplete {
            status: status.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    // The handle is usable as soon as construction succeeds; readiness only
    // gates SDK-style handles that initialize asynchronously.
    fn is_ready(&self) -> bool {
        true
    }

    async fn create_sign_in_attempt(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<AttemptOutcome, ProviderError> {
        let body = self
            .post(
                "v1/sign_ins",
                &SignInBody {
                    identifier,
                    password,
                },
            )
            .await?;

        outcome_from_body(&body)
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        self.post(
            "v1/sign_ups",
            &SignUpBody {
                email_address: email,
                password,
            },
        )
        .await?;

        Ok(())
    }

    async fn begin_email_verification(&self) -> Result<(), ProviderError> {
        self.post(
            "v1/sign_ups/prepare_verification",
            &PrepareVerificationBody {
                strategy: EMAIL_CODE_STRATEGY,
            },
        )
        .await?;

        Ok(())
    }

    async fn attempt_email_verification(
        &self,
        code: &str,
    ) -> Result<AttemptOutcome, ProviderError> {
        let body = self
            .post(
                "v1/sign_ups/attempt_verification",
                &AttemptVerificationBody { code },
            )
            .await?;

        outcome_from_body(&body)
    }

    async fn activate_session(&self, session: &SessionId) -> Result<(), ProviderError> {
        self.post(
            &format!("v1/sessions/{}/activate", session.as_str()),
            &Value::Null,
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(HttpIdentityProvider::new("ftp://identity.tld").is_err());
        assert!(HttpIdentityProvider::new("https://identity.tld").is_ok());
    }

    #[test]
    fn endpoint_urls_keep_the_base_path() {
        let provider = HttpIdentityProvider::new("https://identity.tld/api").unwrap();
        assert_eq!(
            provider.endpoint_url("v1/sign_ins").unwrap().as_str(),
            "https://identity.tld/api/v1/sign_ins"
        );

        let bare = HttpIdentityProvider::new("https://identity.tld").unwrap();
        assert_eq!(
            bare.endpoint_url("v1/sign_ins").unwrap().as_str(),
            "https://identity.tld/v1/sign_ins"
        );
    }

    #[test]
    fn constructed_client_is_ready() {
        let provider = HttpIdentityProvider::new("https://identity.tld").unwrap();
        assert!(provider.is_ready());
    }

    #[test]
    fn structured_rejection_keeps_sub_errors_in_order() {
        let body = json!({
            "errors": [
                { "message": "Identifier already exists", "code": "form_identifier_exists" },
                { "message": "second" },
            ]
        });

        let err = rejection_from_body(StatusCode::UNPROCESSABLE_ENTITY, &body);
        assert_eq!(err.first_message(), Some("Identifier already exists"));
    }

    #[test]
    fn unstructured_rejection_is_transport() {
        let body = json!({ "detail": "boom" });
        let err = rejection_from_body(StatusCode::BAD_GATEWAY, &body);
        assert_eq!(err.first_message(), None);
    }

    #[test]
    fn complete_outcome_requires_a_session_id() {
        let body = json!({ "status": "complete", "created_session_id": "sess_9" });
        assert_eq!(
            outcome_from_body(&body).unwrap(),
            AttemptOutcome::Complete {
                session_id: SessionId::new("sess_9")
            }
        );

        let missing = json!({ "status": "complete" });
        assert!(outcome_from_body(&missing).is_err());
    }

    #[test]
    fn non_complete_status_is_incomplete() {
        let body = json!({ "status": "needs_second_factor" });
        assert_eq!(
            outcome_from_body(&body).unwrap(),
            AttemptOutcome::Incomplete {
                status: "needs_second_factor".to_string()
            }
        );
    }
}
