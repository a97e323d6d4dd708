use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ForegroundError {
    #[error("Unsupported")]
    Unsupported,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("No display available")]
    NoDisplay,

    #[error("Not running in interactive session")]
    NotInteractiveSession,

    #[error("Platform error: {message}")]
    Platform {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Process {0} not found")]
    ProcessNotFound(u32),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Foreground tracker is already running")]
    AlreadyRunning,

    #[error("Foreground tracker is not running")]
    NotRunning,
}

impl ForegroundError {
    pub fn platform<S: Into<String>>(message: S) -> Self {
        ForegroundError::Platform {
            message: message.into(),
            source: None,
        }
    }

    pub fn platform_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        ForegroundError::Platform {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

pub type ForegroundResult<T> = Result<T, ForegroundError>;
