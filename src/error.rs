use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArSceneError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Event sink error: {0}")]
    EventSink(#[from] EventSinkError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Image encoding error: {details}")]
    ImageEncoding { details: String },

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl ArSceneError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures delivering host events
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventSinkError {
    #[error("Event channel closed")]
    ChannelClosed,
}

/// Failures reported by a classifier backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Inference failed: {details}")]
    Inference { details: String },

    #[error("Classifier returned no observations")]
    NoObservations,
}

/// Rejected host commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("plugin is not initialized properly")]
    NotInitialized,

    #[error("Method not implemented: {method}")]
    NotImplemented { method: String },

    #[error("Invalid argument '{argument}' for {method}: {details}")]
    InvalidArgument {
        method: String,
        argument: String,
        details: String,
    },

    #[error("No supported tracking configuration for {configuration}")]
    Unsupported { configuration: String },
}

pub type Result<T> = std::result::Result<T, ArSceneError>;
