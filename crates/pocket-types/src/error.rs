//! Error types for the pocket runtime.

use std::io;

/// Top-level error type shared by all pocket crates.
#[derive(Debug, thiserror::Error)]
pub enum PocketError {
    #[error("display error: {0}")]
    Display(String),

    #[error("input error: {0}")]
    Input(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("VFS error: {0}")]
    Vfs(String),

    #[error("image error: {0}")]
    Image(String),

    #[error("dialog error: {0}")]
    Dialog(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid ROM path: {0:?}")]
    InvalidRomPath(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PocketError>;
