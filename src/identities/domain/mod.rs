pub mod email;
pub mod otp;
pub mod profiles;
pub mod users;
pub mod verification;
