pub mod otp;
pub mod user;

pub use otp::OtpRepository;
pub use user::UserRepository;
