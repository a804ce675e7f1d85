//! Flow controllers and the state they share.
//!
//! A flow controller owns the submission state for one form. All provider
//! calls go through the injected [`crate::provider::IdentityProvider`] and
//! every failure is converted to an in-state message at the controller
//! boundary; nothing propagates further up.

pub mod signin;
pub mod signup;
pub mod validate;

pub use self::signin::SignInFlow;
pub use self::signup::{ResendFailurePolicy, SignUpFlow, SignUpPhase};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Field name to human-readable message, ordered for stable rendering.
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Destination after a session is activated.
pub const DEFAULT_POST_AUTH_PATH: &str = "/dashboard";

/// Form-level message when local validation fails.
pub const VALIDATION_FAILED: &str = "Please fix the highlighted fields.";

/// Fallback when the provider fails sign-in without a structured error.
pub const SIGN_IN_FALLBACK: &str = "An error occurred during sign in.";

/// Message for a sign-in attempt the provider reports as incomplete.
/// Multi-factor continuation is out of scope for these controllers.
pub const SIGN_IN_INCOMPLETE: &str = "Sign in could not be completed.";

/// Fallback when the provider fails account creation without a structured error.
pub const SIGN_UP_FALLBACK: &str = "An error occurred during sign up.";

/// Fallback when the provider fails code verification without a structured error.
pub const VERIFY_FALLBACK: &str = "An error occurred during verification.";

/// Message for a verification attempt the provider reports as incomplete.
pub const VERIFY_INCOMPLETE: &str = "Verification could not be completed.";

/// Local rejection of an empty verification code; the provider is not called.
pub const CODE_REQUIRED: &str = "Verification code is required.";

/// Reported when the code-delivery call fails after the account was created.
pub const CODE_DELIVERY_FAILED: &str =
    "We could not send the verification code. Use resend to try again.";

/// Submission state of a one-shot form, owned by exactly one controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Submission {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed(String),
}

/// Navigation collaborator, invoked exactly once after session activation.
pub trait Navigator {
    fn navigate_to(&self, path: &str);
}

/// Navigator for headless use: logs the destination instead of routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate_to(&self, path: &str) {
        info!("navigating to {path}");
    }
}

/// Liveness token tied to a controller instance.
///
/// Provider calls cannot be cancelled once issued. When the owning component
/// is torn down mid-call, the token is revoked and the eventual resolution is
/// dropped instead of mutating state of a defunct instance.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    #[must_use]
    pub fn live() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::live()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liveness_starts_live_and_revokes() {
        let liveness = Liveness::live();
        assert!(liveness.is_live());

        let handle = liveness.clone();
        handle.revoke();
        assert!(!liveness.is_live());
    }

    #[test]
    fn submission_defaults_to_idle() {
        assert_eq!(Submission::default(), Submission::Idle);
    }
}
