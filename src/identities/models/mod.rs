pub mod otp;
pub mod profiles;
pub mod users;
