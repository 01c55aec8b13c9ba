//! The identity collaborator. Engine operations take an explicit `UserId`;
//! frontends resolve it through this interface first, so no core code ever
//! reaches for an ambient "current user".

use crate::database::models::UserId;
use crate::error::EngineError;

pub trait Identity: Send + Sync {
    /// The authenticated user, if any.
    fn current_user_id(&self) -> Option<UserId>;
}

/// Resolves the current user or fails with `NotAuthenticated`.
pub fn require_user(identity: &dyn Identity) -> Result<UserId, EngineError> {
    identity
        .current_user_id()
        .ok_or(EngineError::NotAuthenticated)
}

/// Fixed identity, for tests and single-user embedding.
pub struct StaticIdentity(pub Option<UserId>);

impl Identity for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.0
    }
}
