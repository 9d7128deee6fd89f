use crate::deck::DeckState;

/// Result alias that carries the custom [`RecorderError`] type.
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// The deck never reported the requested mode within the retry budget.
    /// Carries the tri-state observed after the final pulse so callers can
    /// tell a wedged deck from an ambiguous one.
    #[error("deck did not reach {target} after {attempts} command pulses (observed: {observed})")]
    DeckUnresponsive {
        target: DeckState,
        attempts: u32,
        observed: DeckState,
    },
    /// Configuration file failed to parse.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
