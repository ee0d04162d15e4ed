pub mod otp;
pub mod user;

pub use otp::OtpCode;
pub use user::{Role, User};
