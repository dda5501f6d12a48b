use super::types::User;
use crate::hooks::PasswordResetHook;
use crate::members::SUBSCRIBER_ROLE;

/// Members sign in through Memberful, so subscribers may not reset a local password.
pub fn audit_password_reset(allowed: bool, user: &User) -> bool {
    if user.has_role(SUBSCRIBER_ROLE) {
        false
    } else {
        allowed
    }
}

pub struct PasswordResetGuard;

impl PasswordResetHook for PasswordResetGuard {
    fn allow_password_reset(&self, allowed: bool, user: &User) -> bool {
        let decision = audit_password_reset(allowed, user);
        if allowed && !decision {
            tracing::info!(user_id = user.id, "Denied password reset for Memberful subscriber");
        }
        decision
    }
}
