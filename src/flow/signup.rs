//! Two-phase sign-up flow controller.
//!
//! `CollectingCredentials → AwaitingCode → Verified`, strictly forward-only.
//! Once the provider accepts account creation, a pending account exists
//! server-side; going back to credential collection would desynchronize local
//! state from provider state, so no backward transition exists. The phase is
//! a tagged enum rather than boolean flags, which rules out contradictory
//! combinations like "verifying" with stale credential-phase errors still set.

use super::{
    validate::{validate_sign_up, SignUpInput},
    FieldErrors, Liveness, Navigator, CODE_DELIVERY_FAILED, CODE_REQUIRED, DEFAULT_POST_AUTH_PATH,
    SIGN_UP_FALLBACK, VERIFY_FALLBACK, VERIFY_INCOMPLETE,
};
use crate::provider::{AttemptOutcome, IdentityProvider};
use std::cell::RefCell;
use tracing::debug;

/// Position in the two-step sign-up machine. Monotonic forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignUpPhase {
    #[default]
    CollectingCredentials,
    AwaitingCode,
    Verified,
}

/// What to do when re-triggering code delivery fails.
///
/// The silent variant avoids alarming the user over a low-stakes retry;
/// surfacing is the default so failures are at least visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResendFailurePolicy {
    #[default]
    Surface,
    Silent,
}

#[derive(Debug, Default)]
struct State {
    phase: SignUpPhase,
    in_flight: bool,
    field_errors: FieldErrors,
    form_error: Option<String>,
    verification_error: Option<String>,
}

/// Flow controller for the sign-up form.
pub struct SignUpFlow<P, N> {
    provider: P,
    navigator: N,
    post_auth_path: String,
    resend_policy: ResendFailurePolicy,
    liveness: Liveness,
    state: RefCell<State>,
}

impl<P: IdentityProvider, N: Navigator> SignUpFlow<P, N> {
    #[must_use]
    pub fn new(provider: P, navigator: N) -> Self {
        Self {
            provider,
            navigator,
            post_auth_path: DEFAULT_POST_AUTH_PATH.to_string(),
            resend_policy: ResendFailurePolicy::default(),
            liveness: Liveness::live(),
            state: RefCell::new(State::default()),
        }
    }

    #[must_use]
    pub fn with_post_auth_path(mut self, path: impl Into<String>) -> Self {
        self.post_auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_resend_policy(mut self, policy: ResendFailurePolicy) -> Self {
        self.resend_policy = policy;
        self
    }

    /// Handle for teardown: revoke it and late provider resolutions are
    /// dropped instead of mutating this instance.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    #[must_use]
    pub fn phase(&self) -> SignUpPhase {
        self.state.borrow().phase
    }

    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        self.state.borrow().field_errors.clone()
    }

    #[must_use]
    pub fn form_error(&self) -> Option<String> {
        self.state.borrow().form_error.clone()
    }

    #[must_use]
    pub fn verification_error(&self) -> Option<String> {
        self.state.borrow().verification_error.clone()
    }

    /// The user edited a credential field; stale errors are cleared.
    /// Only meaningful while collecting credentials.
    pub fn edited(&self) {
        let mut state = self.state.borrow_mut();
        if state.phase == SignUpPhase::CollectingCredentials {
            state.field_errors.clear();
            state.form_error = None;
        }
    }

    /// Submit credentials and, on acceptance, request code delivery.
    ///
    /// Only valid while collecting credentials; the phase never moves
    /// backward once the provider has created the pending account. Failure of
    /// the code-delivery call is reported but does not roll back the phase,
    /// since the account already exists server-side.
    pub async fn submit(&self, input: &SignUpInput) {
        if !self.provider.is_ready() {
            debug!("provider not ready, ignoring submit");
            return;
        }

        {
            let mut state = self.state.borrow_mut();

            if state.phase != SignUpPhase::CollectingCredentials {
                debug!("account already created, ignoring submit");
                return;
            }

            if state.in_flight {
                debug!("submission already in flight, ignoring submit");
                return;
            }

            state.field_errors.clear();
            state.form_error = None;

            if let Err(errors) = validate_sign_up(input) {
                state.field_errors = errors;
                return;
            }

            state.in_flight = true;
        }

        let created = self
            .provider
            .create_account(&input.email, &input.password)
            .await;

        if !self.liveness.is_live() {
            debug!("controller torn down, dropping account creation resolution");
            return;
        }

        if let Err(err) = created {
            let mut state = self.state.borrow_mut();
            state.in_flight = false;
            state.form_error = Some(err.surface_message(SIGN_UP_FALLBACK));
            return;
        }

        // Secondary call; the phase advances regardless of its outcome.
        let delivery = self.provider.begin_email_verification().await;

        if !self.liveness.is_live() {
            debug!("controller torn down, dropping code delivery resolution");
            return;
        }

        let mut state = self.state.borrow_mut();
        state.in_flight = false;
        state.phase = SignUpPhase::AwaitingCode;

        if delivery.is_err() {
            state.verification_error = Some(CODE_DELIVERY_FAILED.to_string());
        }
    }

    /// Attempt verification with a one-time code.
    ///
    /// The code is opaque and provider-defined; the only local check is
    /// non-empty, which is rejected deterministically without a provider
    /// call. Retries are unbounded; any cap is the provider's to enforce.
    pub async fn verify(&self, code: &str) {
        if !self.provider.is_ready() {
            debug!("provider not ready, ignoring verify");
            return;
        }

        {
            let mut state = self.state.borrow_mut();

            if state.phase != SignUpPhase::AwaitingCode {
                debug!("no verification pending, ignoring verify");
                return;
            }

            if state.in_flight {
                debug!("verification already in flight, ignoring verify");
                return;
            }

            if code.trim().is_empty() {
                state.verification_error = Some(CODE_REQUIRED.to_string());
                return;
            }

            state.verification_error = None;
            state.in_flight = true;
        }

        let result = self.provider.attempt_email_verification(code).await;

        if !self.liveness.is_live() {
            debug!("controller torn down, dropping verification resolution");
            return;
        }

        match result {
            Ok(AttemptOutcome::Complete { session_id }) => {
                match self.provider.activate_session(&session_id).await {
                    Ok(()) if self.liveness.is_live() => {
                        let mut state = self.state.borrow_mut();
                        state.in_flight = false;
                        state.phase = SignUpPhase::Verified;
                        drop(state);
                        self.navigator.navigate_to(&self.post_auth_path);
                    }
                    Ok(()) => {
                        debug!("controller torn down, dropping session activation result");
                    }
                    Err(err) if self.liveness.is_live() => {
                        self.fail_verification(err.surface_message(VERIFY_FALLBACK));
                    }
                    Err(_) => {}
                }
            }
            Ok(AttemptOutcome::Incomplete { status }) => {
                debug!("verification attempt incomplete: {status}");
                self.fail_verification(VERIFY_INCOMPLETE.to_string());
            }
            Err(err) => self.fail_verification(err.surface_message(VERIFY_FALLBACK)),
        }
    }

    /// Re-trigger code delivery. Never changes the phase or the code.
    pub async fn resend_code(&self) {
        if !self.provider.is_ready() {
            debug!("provider not ready, ignoring resend");
            return;
        }

        {
            let mut state = self.state.borrow_mut();

            if state.phase != SignUpPhase::AwaitingCode {
                debug!("no verification pending, ignoring resend");
                return;
            }

            if state.in_flight {
                debug!("call already in flight, ignoring resend");
                return;
            }

            state.in_flight = true;
        }

        let delivery = self.provider.begin_email_verification().await;

        if !self.liveness.is_live() {
            debug!("controller torn down, dropping resend resolution");
            return;
        }

        let mut state = self.state.borrow_mut();
        state.in_flight = false;

        if let Err(err) = delivery {
            match self.resend_policy {
                ResendFailurePolicy::Surface => {
                    state.verification_error = Some(CODE_DELIVERY_FAILED.to_string());
                }
                ResendFailurePolicy::Silent => {
                    debug!("resend failed, swallowed by policy: {err}");
                }
            }
        }
    }

    fn fail_verification(&self, message: String) {
        let mut state = self.state.borrow_mut();
        state.in_flight = false;
        state.verification_error = Some(message);
    }
}
