//! Shared-secret authentication for content saves.
//!
//! Implements constant-time comparison to mitigate timing attacks.

use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Check the password supplied with a save request.
///
/// With no password configured every save is refused.
pub fn verify_password(expected: Option<&str>, provided: &str) -> Result<(), AppError> {
    let Some(expected) = expected else {
        tracing::warn!("Save attempted but no admin password is configured");
        return Err(AppError::Unauthorized("Unauthorized".to_string()));
    };

    if constant_time_compare(provided, expected) {
        Ok(())
    } else {
        tracing::warn!("Save rejected: wrong admin password");
        Err(AppError::Unauthorized("Unauthorized".to_string()))
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    // Constant-time comparison
    a_bytes.ct_eq(b_bytes).into()
}
