//! Error types for the emoji bot.

use std::fmt;

/// Configuration-related errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors talking to the Slack Web API.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("{method} request failed: {reason}")]
    Transport { method: String, reason: String },

    #[error("{method} returned HTTP {status}")]
    Status { method: String, status: u16 },

    #[error("{method} returned error: {error}")]
    Api { method: String, error: String },

    #[error("{method} response could not be decoded: {reason}")]
    Decode { method: String, reason: String },
}

/// Ephemeral asset storage errors.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to prepare asset directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write asset {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Asset reaper is no longer running")]
    ReaperStopped,
}

/// Image sniffing / decoding / encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode {format} image: {reason}")]
    Decode { format: String, reason: String },

    #[error("Failed to encode PNG: {0}")]
    Encode(String),
}

/// Failure reported by the emoji registry.
///
/// Known Slack error codes are mapped to dedicated variants; everything else
/// is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("name_taken")]
    NameTaken,

    #[error("{0}")]
    InvalidName(String),

    #[error("{0}")]
    InvalidImage(String),

    #[error("ratelimited")]
    RateLimited,

    #[error("{0}")]
    NotAuthorized(String),

    #[error("{0}")]
    Other(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    Http(u16),
}

impl RegistrationError {
    /// Map a Slack `error` code onto the taxonomy.
    pub fn from_code(code: &str) -> Self {
        match code {
            "name_taken" => Self::NameTaken,
            "invalid_name" | "invalid_name_required" | "invalid_name_punctuation"
            | "invalid_name_maxlength" => Self::InvalidName(code.to_string()),
            "invalid_image" | "too_many_frames" | "resized_but_still_too_large" => {
                Self::InvalidImage(code.to_string())
            }
            "ratelimited" => Self::RateLimited,
            "not_authed" | "invalid_auth" | "not_allowed_token_type" | "missing_scope"
            | "not_an_admin" | "no_permission" | "account_inactive" | "token_revoked" => {
                Self::NotAuthorized(code.to_string())
            }
            other => Self::Other(other.to_string()),
        }
    }

    /// Verbatim reason as reported by the registry (or the transport).
    pub fn code(&self) -> String {
        self.to_string()
    }
}

/// Failure of a registry implementation: either the image could not be made
/// available, or the registry rejected the request.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Publish(#[from] AssetError),

    #[error(transparent)]
    Rejected(#[from] RegistrationError),
}

/// Pipeline step a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Authorize,
    History,
    Download,
    Normalize,
    Name,
    Publish,
    Register,
    Confirm,
    Announce,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Authorize => "authorize",
            Self::History => "history",
            Self::Download => "download",
            Self::Normalize => "normalize",
            Self::Name => "name",
            Self::Publish => "publish",
            Self::Register => "register",
            Self::Confirm => "confirm",
            Self::Announce => "announce",
        };
        f.write_str(label)
    }
}

/// Reaction / notification pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("[{step}] no admin user is configured")]
    AdminNotConfigured { step: Step },

    #[error("[{step}] fetch failed: {source}")]
    FetchFailed {
        step: Step,
        #[source]
        source: SlackError,
    },

    #[error("[{step}] unsupported image format: {format}")]
    UnsupportedFormat { step: Step, format: String },

    #[error("[{step}] image processing failed: {source}")]
    EncodeDecodeFailed {
        step: Step,
        #[source]
        source: ImageError,
    },

    #[error("[{step}] invalid emoji name {name:?}")]
    InvalidName { step: Step, name: String },

    #[error("[{step}] publishing asset failed: {source}")]
    PublishFailed {
        step: Step,
        #[source]
        source: AssetError,
    },

    #[error("[{step}] registration of {name:?} failed: {reason}")]
    RegistrationFailed {
        step: Step,
        name: String,
        reason: RegistrationError,
    },

    #[error("[{step}] posting message failed: {source}")]
    NotifyFailed {
        step: Step,
        #[source]
        source: SlackError,
    },
}

impl PipelineError {
    /// Step the failure originated from.
    pub fn step(&self) -> Step {
        match self {
            Self::AdminNotConfigured { step }
            | Self::FetchFailed { step, .. }
            | Self::UnsupportedFormat { step, .. }
            | Self::EncodeDecodeFailed { step, .. }
            | Self::InvalidName { step, .. }
            | Self::PublishFailed { step, .. }
            | Self::RegistrationFailed { step, .. }
            | Self::NotifyFailed { step, .. } => *step,
        }
    }
}
