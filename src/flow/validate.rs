//! Declarative validation for the sign-in and sign-up forms.
//!
//! Pure and deterministic; safe to run on every keystroke or on submit.
//! Failures are field-scoped so the form can highlight exactly the offending
//! input, and nothing here performs I/O.

use super::FieldErrors;
use regex::Regex;

/// Minimum sign-up password length, enforced client-side for early feedback.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Credentials captured by the sign-in form.
#[derive(Debug, Clone, Default)]
pub struct SignInInput {
    pub identifier: String,
    pub password: String,
}

/// Credentials captured by the sign-up form.
#[derive(Debug, Clone, Default)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Validate sign-in credentials.
///
/// The identifier may be a username or an email, so only presence is checked.
///
/// # Errors
/// Returns the per-field messages for every violated rule.
pub fn validate_sign_in(input: &SignInInput) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if input.identifier.trim().is_empty() {
        errors.insert("identifier", "Identifier is required.".to_string());
    }

    if input.password.is_empty() {
        errors.insert("password", "Password is required.".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate sign-up credentials.
///
/// The confirmation mismatch is reported on the confirmation field, not as a
/// form-level error.
///
/// # Errors
/// Returns the per-field messages for every violated rule.
pub fn validate_sign_up(input: &SignUpInput) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = input.email.trim();
    if email.is_empty() {
        errors.insert("email", "Email is required.".to_string());
    } else if !valid_email(email) {
        errors.insert("email", "Email address looks invalid.".to_string());
    }

    if input.password.len() < MIN_PASSWORD_LENGTH {
        errors.insert(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters."),
        );
    }

    if input.password_confirmation != input.password {
        errors.insert(
            "password_confirmation",
            "Passwords do not match.".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
