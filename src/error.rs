use std::path::PathBuf;

use cid::Cid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory must contain an \"{0}\" file")]
    MissingEntryPoint(String),

    #[error(
        "{file} contains absolute path references, use relative paths instead: {}",
        .matches.join(", ")
    )]
    AbsolutePathReference { file: String, matches: Vec<String> },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to generate a root CID: no files to add")]
    EmptyInput,

    /// A link points at a block the builder never produced.
    #[error("block {0} is referenced but missing from the DAG")]
    IncompleteDag(Cid),

    #[error("malformed block {cid}: {reason}")]
    MalformedBlock { cid: Cid, reason: String },

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("block store failure: {0}")]
    BlockStore(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("worker pool failure: {0}")]
    WorkerPool(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
