pub mod change_password;
pub mod health;
pub mod login;
pub mod password_recovery;
pub mod refresh;
pub mod users;

pub use change_password::change_password;
pub use health::health_check;
pub use login::login;
pub use password_recovery::{forgot_password, reset_password, verify_otp};
pub use refresh::refresh;
pub use users::{list_users, me};
