use keeljoin_common::Error;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("overflow region exhausted: {requested} bytes needed, budget is {max_bytes} bytes")]
    Capacity { requested: usize, max_bytes: usize },

    #[error("slot array of {capacity} slots cannot grow further")]
    CapacityOverflow { capacity: usize },

    #[error("entry of {0} bytes does not fit the entry header fields")]
    EntryTooLarge(usize),

    #[error("key is {actual} bytes but the arena is fixed to {expected}-byte keys")]
    KeySizeMismatch { expected: usize, actual: usize },

    #[error("invalid arena handles: {0}")]
    InvalidHandles(String),

    #[error("arena layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("invalid arena configuration: {0}")]
    InvalidConfig(String),
}

impl From<ArenaError> for Error {
    fn from(err: ArenaError) -> Self {
        let msg = err.to_string();
        match err {
            ArenaError::Capacity { .. }
            | ArenaError::CapacityOverflow { .. }
            | ArenaError::EntryTooLarge(_) => Error::Capacity(msg),
            ArenaError::KeySizeMismatch { .. } => Error::InvalidArgument(msg),
            ArenaError::InvalidHandles(_) | ArenaError::LayoutMismatch(_) => {
                Error::InvalidState(msg)
            }
            ArenaError::InvalidConfig(_) => Error::Config(msg),
        }
    }
}
