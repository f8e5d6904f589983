use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identities::provider::VerificationHandle;

/// A verification in flight for one caller: whose email is being verified and
/// the provider's handle for the most recently sent code.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PendingVerification {
    pub user_id: Uuid,
    pub email: String,
    pub handle: Option<VerificationHandle>,
}

/// Where an authenticated user should go next.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Landing {
    /// The user's profile still has to be completed.
    ProfileSetup,
    Home,
}
