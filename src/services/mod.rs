pub mod auth;
pub mod email;
pub mod password_recovery;
pub mod token;

pub use auth::AuthService;
pub use email::EmailService;
pub use password_recovery::PasswordRecoveryService;
pub use token::{TokenKind, TokenPair, TokenService};
