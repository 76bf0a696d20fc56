use grove_tree::TreeError;
use thiserror::Error;

/// Errors emitted by explorer operations.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("explorer I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("explorer state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("explorer tree is inconsistent: {0}")]
    Tree(#[from] TreeError),
    #[error("failed to load children of {path}: {message}")]
    Load { path: String, message: String },
    #[error("invalid action: {message}")]
    InvalidAction { message: String },
    #[error("unsupported open strategy `{0}`")]
    UnsupportedOpenStrategy(String),
    #[error("unknown source `{0}`")]
    UnknownSource(String),
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("version control status failed: {0}")]
    Vcs(String),
    #[error("explorer event channel closed")]
    ChannelClosed,
}

impl ExplorerError {
    pub(crate) fn invalid_action(message: impl Into<String>) -> Self {
        Self::InvalidAction {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
