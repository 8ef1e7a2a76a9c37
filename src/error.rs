use thiserror::Error;

/// Conditions that end a session
///
/// Acquisition and model failures are kept apart so the caller can decide
/// how to recover (retry or pick another camera).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The camera could not be opened or stopped delivering frames
    #[error("frame acquisition failed: {0:#}")]
    Acquisition(#[source] anyhow::Error),

    /// The segmentation model could not be loaded or its worker died
    #[error("segmentation model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// The presentation surface rejected a frame
    #[error("presentation failed: {0:#}")]
    Presentation(#[source] anyhow::Error),
}

/// Rejected background selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("background index {index} is out of range (library has {len} backgrounds)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Unparsable interactive command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("invalid argument `{argument}` for `{command}`")]
    InvalidArgument { command: String, argument: String },
}
