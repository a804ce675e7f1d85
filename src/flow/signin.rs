//! One-shot sign-in flow controller.
//!
//! `Idle → Submitting → {Succeeded | Failed}`, back to `Idle` on the next
//! user edit. Exactly one provider call may be outstanding; a second submit
//! while one is in flight is a no-op so double-clicks cannot create duplicate
//! sessions.

use super::{
    validate::{validate_sign_in, SignInInput},
    FieldErrors, Liveness, Navigator, Submission, DEFAULT_POST_AUTH_PATH, SIGN_IN_FALLBACK,
    SIGN_IN_INCOMPLETE, VALIDATION_FAILED,
};
use crate::provider::{AttemptOutcome, IdentityProvider};
use std::cell::RefCell;
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    submission: Submission,
    field_errors: FieldErrors,
}

/// Flow controller for the sign-in form.
pub struct SignInFlow<P, N> {
    provider: P,
    navigator: N,
    post_auth_path: String,
    liveness: Liveness,
    state: RefCell<State>,
}

impl<P: IdentityProvider, N: Navigator> SignInFlow<P, N> {
    #[must_use]
    pub fn new(provider: P, navigator: N) -> Self {
        Self {
            provider,
            navigator,
            post_auth_path: DEFAULT_POST_AUTH_PATH.to_string(),
            liveness: Liveness::live(),
            state: RefCell::new(State::default()),
        }
    }

    #[must_use]
    pub fn with_post_auth_path(mut self, path: impl Into<String>) -> Self {
        self.post_auth_path = path.into();
        self
    }

    /// Handle for teardown: revoke it and late provider resolutions are
    /// dropped instead of mutating this instance.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    #[must_use]
    pub fn submission(&self) -> Submission {
        self.state.borrow().submission.clone()
    }

    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        self.state.borrow().field_errors.clone()
    }

    /// The user edited a field; a failed attempt goes back to `Idle`.
    pub fn edited(&self) {
        let mut state = self.state.borrow_mut();
        if matches!(state.submission, Submission::Failed(_)) {
            state.submission = Submission::Idle;
            state.field_errors.clear();
        }
    }

    /// Submit credentials to the provider.
    ///
    /// A not-ready provider makes this a silent no-op: the handle is still
    /// initializing and that race is not a user-facing error. Local
    /// validation failures never reach the network.
    pub async fn submit(&self, input: &SignInInput) {
        if !self.provider.is_ready() {
            debug!("provider not ready, ignoring submit");
            return;
        }

        {
            let mut state = self.state.borrow_mut();

            if state.submission == Submission::Submitting {
                debug!("submission already in flight, ignoring submit");
                return;
            }

            state.field_errors.clear();

            if let Err(errors) = validate_sign_in(input) {
                state.submission = Submission::Failed(VALIDATION_FAILED.to_string());
                state.field_errors = errors;
                return;
            }

            state.submission = Submission::Submitting;
        }

        let result = self
            .provider
            .create_sign_in_attempt(&input.identifier, &input.password)
            .await;

        if !self.liveness.is_live() {
            debug!("controller torn down, dropping sign-in resolution");
            return;
        }

        match result {
            Ok(AttemptOutcome::Complete { session_id }) => {
                match self.provider.activate_session(&session_id).await {
                    Ok(()) if self.liveness.is_live() => {
                        self.state.borrow_mut().submission = Submission::Succeeded;
                        self.navigator.navigate_to(&self.post_auth_path);
                    }
                    Ok(()) => {
                        debug!("controller torn down, dropping session activation result");
                    }
                    Err(err) if self.liveness.is_live() => {
                        self.fail(err.surface_message(SIGN_IN_FALLBACK));
                    }
                    Err(_) => {}
                }
            }
            Ok(AttemptOutcome::Incomplete { status }) => {
                debug!("sign-in attempt incomplete: {status}");
                self.fail(SIGN_IN_INCOMPLETE.to_string());
            }
            Err(err) => self.fail(err.surface_message(SIGN_IN_FALLBACK)),
        }
    }

    fn fail(&self, message: String) {
        self.state.borrow_mut().submission = Submission::Failed(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::testing::{FakeProvider, RecordingNavigator, Script};

    fn credentials() -> SignInInput {
        SignInInput {
            identifier: "a@b.com".to_string(),
            password: "Secret123".to_string(),
        }
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_provider() {
        let provider = FakeProvider::default();
        let navigator = RecordingNavigator::default();
        let flow = SignInFlow::new(&provider, &navigator);

        flow.submit(&SignInInput::default()).await;

        assert_eq!(provider.calls.lock().unwrap().sign_in_attempts, 0);
        assert_eq!(
            flow.submission(),
            Submission::Failed(VALIDATION_FAILED.to_string())
        );
        assert!(!flow.field_errors().is_empty());
        assert!(flow.field_errors().contains_key("identifier"));
    }

    #[tokio::test]
    async fn complete_attempt_activates_once_and_navigates_once() {
        let provider = FakeProvider::default();
        let navigator = RecordingNavigator::default();
        let flow = SignInFlow::new(&provider, &navigator);

        flow.submit(&credentials()).await;

        assert_eq!(flow.submission(), Submission::Succeeded);
        assert!(flow.field_errors().is_empty());

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.sign_in_attempts, 1);
        assert_eq!(calls.sessions_activated, vec!["sess_1".to_string()]);
        assert_eq!(
            *navigator.destinations.lock().unwrap(),
            vec![DEFAULT_POST_AUTH_PATH.to_string()]
        );
    }

    #[tokio::test]
    async fn incomplete_attempt_fails_without_activation() {
        let provider = FakeProvider::with(|s| s.sign_in = Script::Incomplete);
        let navigator = RecordingNavigator::default();
        let flow = SignInFlow::new(&provider, &navigator);

        flow.submit(&credentials()).await;

        assert_eq!(
            flow.submission(),
            Submission::Failed(SIGN_IN_INCOMPLETE.to_string())
        );
        assert!(provider.calls.lock().unwrap().sessions_activated.is_empty());
        assert!(navigator.destinations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn structured_rejection_surfaces_the_first_message() {
        let provider =
            FakeProvider::with(|s| s.sign_in = Script::Rejected("Identifier already exists"));
        let navigator = RecordingNavigator::default();
        let flow = SignInFlow::new(&provider, &navigator);

        flow.submit(&credentials()).await;

        assert_eq!(
            flow.submission(),
            Submission::Failed("Identifier already exists".to_string())
        );
    }

    #[tokio::test]
    async fn transport_failure_uses_the_fallback_message() {
        let provider = FakeProvider::with(|s| s.sign_in = Script::Transport);
        let navigator = RecordingNavigator::default();
        let flow = SignInFlow::new(&provider, &navigator);

        flow.submit(&credentials()).await;

        assert_eq!(
            flow.submission(),
            Submission::Failed(SIGN_IN_FALLBACK.to_string())
        );
    }

    #[tokio::test]
    async fn not_ready_provider_is_a_silent_noop() {
        let provider = FakeProvider {
            ready: false,
            ..FakeProvider::default()
        };
        let navigator = RecordingNavigator::default();
        let flow = SignInFlow::new(&provider, &navigator);

        flow.submit(&credentials()).await;

        assert_eq!(flow.submission(), Submission::Idle);
        assert_eq!(provider.calls.lock().unwrap().sign_in_attempts, 0);
    }

    #[tokio::test]
    async fn second_submit_while_pending_is_ignored() {
        let provider = FakeProvider::holding();
        let navigator = RecordingNavigator::default();
        let flow = SignInFlow::new(&provider, &navigator);
        let input = credentials();

        tokio::join!(flow.submit(&input), async {
            // First submit is parked inside the provider at this point.
            flow.submit(&input).await;
            provider.release();
        });

        assert_eq!(provider.calls.lock().unwrap().sign_in_attempts, 1);
        assert_eq!(flow.submission(), Submission::Succeeded);
        assert_eq!(navigator.destinations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn revoked_liveness_drops_the_resolution() {
        let provider = FakeProvider::holding();
        let navigator = RecordingNavigator::default();
        let flow = SignInFlow::new(&provider, &navigator);
        let input = credentials();

        tokio::join!(flow.submit(&input), async {
            flow.liveness().revoke();
            provider.release();
        });

        assert!(provider.calls.lock().unwrap().sessions_activated.is_empty());
        assert!(navigator.destinations.lock().unwrap().is_empty());
        assert_ne!(flow.submission(), Submission::Succeeded);
    }

    #[tokio::test]
    async fn edit_after_failure_returns_to_idle() {
        let provider = FakeProvider::with(|s| s.sign_in = Script::Transport);
        let navigator = RecordingNavigator::default();
        let flow = SignInFlow::new(&provider, &navigator);

        flow.submit(&credentials()).await;
        assert!(matches!(flow.submission(), Submission::Failed(_)));

        flow.edited();
        assert_eq!(flow.submission(), Submission::Idle);
        assert!(flow.field_errors().is_empty());
    }
}
