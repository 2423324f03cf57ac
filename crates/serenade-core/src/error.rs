//! Error types for Serenade Core

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Controller error types
///
/// None of these ever reach the host UI: the controller logs them and keeps
/// the mirrored state at `Idle`.
#[derive(Error, Debug)]
pub enum Error {
    // Platform errors
    #[error("Platform API is not loaded yet")]
    PlatformNotReady,

    #[error("Failed to inject platform script: {0}")]
    ScriptInjection(String),

    // Session errors
    #[error("Mount point not found: {mount}")]
    MountPointMissing { mount: String },

    #[error("Player creation failed: {0}")]
    PlayerCreation(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Create a player creation error
    pub fn player(msg: impl Into<String>) -> Self {
        Error::PlayerCreation(msg.into())
    }

    /// Returns true if a later attempt may succeed without any config change
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::PlatformNotReady | Error::MountPointMissing { .. } | Error::PlayerCreation(_)
        )
    }

    /// Returns the error code used in log fields
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::PlatformNotReady => "PLATFORM_NOT_READY",
            Error::ScriptInjection(_) => "SCRIPT_INJECTION",
            Error::MountPointMissing { .. } => "MOUNT_MISSING",
            Error::PlayerCreation(_) => "PLAYER_CREATE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Config(_) => "CONFIG_PARSE",
        }
    }
}
