//! Errors raised while parsing or compiling placeholder strings.

use thiserror::Error;

/// Placeholder-string errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PStringError {
    /// A `%[` choice list is never closed with `]%`.
    #[error("choice list opened at position {offset} is never closed with ]%")]
    UnclosedChoice {
        /// Byte offset of the opening `%[`.
        offset: usize,
    },

    /// The prompt has nothing to match.
    #[error("prompt cannot be empty")]
    EmptyPrompt,

    /// A response refers to a capture group the prompt does not define.
    #[error("response uses %{0}% but the prompt has no group %{0}%")]
    UnknownGroup(u8),

    /// The generated expression was rejected by the regex engine.
    #[error("prompt could not be compiled: {0}")]
    Regex(#[from] regex::Error),
}
