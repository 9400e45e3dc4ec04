use thiserror::Error;

/// Storage-layer errors. Expected outcomes (duplicate swipe, lost match race)
/// are encoded in operation results, not here — this enum is for cases the
/// caller must treat as a failed operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced row does not exist (match, user).
    #[error("not found")]
    NotFound,

    /// The acting user is not a participant of the match they addressed.
    #[error("caller is not a participant of this match")]
    NotParticipant,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Internal(String),
}
