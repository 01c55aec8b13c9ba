//! Error taxonomy for the engine's outward operations.

use std::fmt;

use crate::database::StoreError;

/// The record kind a [`EngineError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Profile,
    Stats,
    Quest,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Profile => "profile",
            Entity::Stats => "stats",
            Entity::Quest => "quest",
        };
        f.write_str(name)
    }
}

/// Failures surfaced by the engine. Storage errors pass through unchanged;
/// the engine never retries on behalf of the caller.
///
/// An already-completed quest is not represented here: re-completion is a
/// benign no-op reported in-band via
/// [`CompletionResult::already_completed`](crate::engine::CompletionResult).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no authenticated user")]
    NotAuthenticated,
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("no active quest templates available")]
    NoTemplatesAvailable,
    #[error(transparent)]
    Storage(#[from] StoreError),
}
