//! Error types for Sonosphere

use crate::pool::ResourceId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SonoError {
    #[error("No playback resource available")]
    ResourceUnavailable,

    #[error("Prepare failed for {resource}: {reason}")]
    PrepareFailed { resource: ResourceId, reason: String },

    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Catalogue contains no playable sounds")]
    EmptyCatalogue,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Catalogue error: {0}")]
    Catalogue(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, SonoError>;
