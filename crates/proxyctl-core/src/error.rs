//! Error taxonomy for the management-API engine.

use thiserror::Error;

use crate::types::Revision;

/// Errors produced by packaging, discovery and deployment operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument (name, environment, revision) is missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The asset or revision does not exist on the platform.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported asset type: {0}")]
    UnsupportedAssetType(String),

    /// Name inference found zero or several candidate descriptors.
    #[error("expected exactly one bundle descriptor in {location}, found {found}")]
    AmbiguousSource { location: String, found: usize },

    /// The descriptor root element is neither `APIProxy` nor `SharedFlowBundle`.
    #[error("cannot determine asset name from descriptor {0}")]
    UnrecognizedDescriptor(String),

    #[error("the path {0} is not a directory")]
    NotADirectory(String),

    #[error("source {0} is neither a zip archive nor a directory")]
    InvalidSource(String),

    /// The server answered with a status outside the accepted set.
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("unsupported option: {0}")]
    UnsupportedOption(String),

    /// The asset was imported but the follow-up dependency install failed.
    #[error("{name} r{revision} imported, but dependency install failed: {source}")]
    DependencyInstall {
        name: String,
        revision: Revision,
        imported: serde_json::Value,
        #[source]
        source: Box<Error>,
    },

    #[error("operation cancelled")]
    Cancelled,

    /// Connection-level failure with no HTTP status.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml error: {0}")]
    Xml(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status carried by a [`Error::Transport`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
