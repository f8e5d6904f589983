mod memory;
mod otps;
mod profiles;
mod users;

pub use memory::MemoryStore;
pub use otps::{DynOtpRepo, OtpRepo};
pub use profiles::{DynProfileRepo, ProfileRepo};
pub use users::{DynUserRepo, UserPersistenceError, UserRepo};
