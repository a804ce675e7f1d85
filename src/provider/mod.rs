//! Contract with the hosted identity provider.
//!
//! The provider owns credential storage, session issuance and verification
//! channels. Controllers consume it through [`IdentityProvider`] so a fake can
//! be injected in tests; the process-wide handle is constructed once at
//! startup and only read thereafter.

pub mod http;

pub use self::http::HttpIdentityProvider;

use async_trait::async_trait;
use std::fmt;

/// Opaque session handle issued by the provider.
///
/// The crate never interprets it; it is forwarded to
/// [`IdentityProvider::activate_session`] and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of a sign-in or verification attempt.
///
/// `Incomplete` means the provider wants more steps (a second factor, another
/// verification). Controllers treat it as a failure with a generic message;
/// continuing those flows is a deliberate non-goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Complete { session_id: SessionId },
    Incomplete { status: String },
}

/// One entry of a structured provider rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubError {
    pub code: Option<String>,
    pub message: String,
}

/// Failure reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider rejected the request with a structured list of sub-errors.
    Rejected(Vec<SubError>),
    /// Anything else: network failure, unexpected shape, non-JSON body.
    Transport(String),
}

impl ProviderError {
    /// First human-readable sub-error message, if the rejection carried one.
    ///
    /// Controllers surface this verbatim and fall back to one fixed string
    /// per operation otherwise.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(errors) => errors.first().map(|e| e.message.as_str()),
            Self::Transport(_) => None,
        }
    }

    /// Message to surface for this failure, with `fallback` covering the
    /// unstructured case.
    #[must_use]
    pub fn surface_message(&self, fallback: &str) -> String {
        self.first_message().unwrap_or(fallback).to_string()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(errors) => match errors.first() {
                Some(first) => write!(formatter, "Provider rejection: {}", first.message),
                None => write!(formatter, "Provider rejection"),
            },
            Self::Transport(message) => write!(formatter, "Provider transport error: {message}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Asynchronous identity provider operations consumed by the flow controllers.
///
/// `is_ready` models the provider handle's initialization race: until it
/// reports ready, submissions are silent no-ops rather than user-facing
/// errors.
#[async_trait]
pub trait IdentityProvider {
    fn is_ready(&self) -> bool;

    /// Create a sign-in attempt from credentials.
    async fn create_sign_in_attempt(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<AttemptOutcome, ProviderError>;

    /// Create a pending account server-side.
    async fn create_account(&self, email: &str, password: &str) -> Result<(), ProviderError>;

    /// Trigger delivery of a one-time code over the email channel.
    async fn begin_email_verification(&self) -> Result<(), ProviderError>;

    /// Attempt verification of the pending account with a one-time code.
    async fn attempt_email_verification(
        &self,
        code: &str,
    ) -> Result<AttemptOutcome, ProviderError>;

    /// Activate the session behind the opaque handle.
    async fn activate_session(&self, session: &SessionId) -> Result<(), ProviderError>;
}

#[async_trait]
impl<P: IdentityProvider + Sync + ?Sized> IdentityProvider for &P {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    async fn create_sign_in_attempt(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<AttemptOutcome, ProviderError> {
        (**self).create_sign_in_attempt(identifier, password).await
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        (**self).create_account(email, password).await
    }

    async fn begin_email_verification(&self) -> Result<(), ProviderError> {
        (**self).begin_email_verification().await
    }

    async fn attempt_email_verification(
        &self,
        code: &str,
    ) -> Result<AttemptOutcome, ProviderError> {
        (**self).attempt_email_verification(code).await
    }

    async fn activate_session(&self, session: &SessionId) -> Result<(), ProviderError> {
        (**self).activate_session(session).await
    }
}
