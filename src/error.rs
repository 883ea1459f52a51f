use thiserror::Error;

use crate::dao::StoreError;
use crate::effects::BuildEffectError;

/// Protocol-level error answered on the originating connection.
///
/// Every failed command maps to exactly one of these; the connection stays
/// open and the running effect is left untouched.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("preset is protected: {0}")]
    Protected(String),
    #[error("i/o failure: {0}")]
    Io(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommandError {
    /// Stable machine-readable code carried on `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::InvalidCommand(_) => "invalidCommand",
            CommandError::InvalidParam(_) => "invalidParam",
            CommandError::NotFound(_) => "notFound",
            CommandError::Conflict(_) => "conflict",
            CommandError::Protected(_) => "protected",
            CommandError::Io(_) => "io",
            CommandError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CommandError::NotFound(format!("preset `{id}`")),
            StoreError::Conflict(id) => CommandError::Conflict(format!("preset id `{id}`")),
            StoreError::Protected(id) => CommandError::Protected(id),
            StoreError::InvalidId(raw) => {
                CommandError::InvalidParam(format!("preset id `{raw}` sanitizes to nothing"))
            }
            StoreError::Io(source) => CommandError::Io(source.to_string()),
            StoreError::Serialize(source) => CommandError::Io(source.to_string()),
        }
    }
}

impl From<BuildEffectError> for CommandError {
    fn from(err: BuildEffectError) -> Self {
        match err {
            BuildEffectError::UnknownEffect(name) => {
                CommandError::NotFound(format!("effect `{name}`"))
            }
            BuildEffectError::InvalidParams(message) => CommandError::InvalidParam(message),
        }
    }
}
