pub mod authenticator;
pub mod error;
pub mod login_server;
pub mod oauth;
pub mod password_reset;
pub mod redirect;
pub mod types;

pub use authenticator::Authenticator;
pub use error::AuthError;
pub use login_server::LoginServer;
pub use oauth::MemberfulClient;
pub use password_reset::{audit_password_reset, PasswordResetGuard};
pub use redirect::{login_redirect, safe_redirect, RedirectOverride};
pub use types::{AuthAttempt, AuthOutcome, MemberAccount, TokenResponse, User};
