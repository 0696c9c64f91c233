use thiserror::Error;

/// Malformed source data. Always fatal for the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid IMDb identifier '{0}' (expected a 'tt' prefix)")]
    InvalidImdbId(String),

    #[error("unrecognized title type '{0}'")]
    UnknownTitleType(String),

    #[error("invalid rating '{0}' (expected an integer from 1 to 10)")]
    InvalidRating(String),
}
