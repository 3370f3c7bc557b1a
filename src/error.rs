use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure to load the question/answer file at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read knowledge file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("knowledge file {path:?} is not an array of {{question, answer}} records")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot build a similarity index over an empty corpus")]
    EmptyCorpus,
}

/// Any failure from the fallback generator. The dispatcher collapses all of
/// these into one user-facing message.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key configured for the generator")]
    MissingApiKey,

    #[error("generator transport error")]
    Transport(#[from] reqwest::Error),

    #[error("generator returned HTTP {status}: {snippet}")]
    HttpStatus { status: StatusCode, snippet: String },

    #[error("could not decode generator response: {0}")]
    Decode(String),

    #[error("generator response contained no choices")]
    EmptyChoices,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}
