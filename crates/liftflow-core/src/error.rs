use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid `{node}` node: {message}")]
    InvalidNode { node: String, message: String },

    #[error("unknown top-level node `{0}`")]
    UnknownNode(String),

    #[error(
        "no manifest found in {0}\nhint: create lift.kdl or point LIFT_CONFIG_PATH at one"
    )]
    NotFound(PathBuf),

    #[error(transparent)]
    Cloud(#[from] liftflow_cloud::CloudError),
}

impl ManifestError {
    pub(crate) fn invalid(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidNode {
            node: node.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;
