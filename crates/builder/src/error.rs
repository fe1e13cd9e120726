use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("malformed edge-list header in {path}")]
    InvalidHeader { path: PathBuf },

    #[error("unsupported edge-list format `{found}`, expected `el64`")]
    UnsupportedFormat { found: String },

    #[error("edge list at {path} is not marked deduplicated")]
    NotDeduped { path: PathBuf },

    #[error("vertex id {id} is out of range for a graph with {num_vertices} vertices")]
    OutOfRange { id: usize, num_vertices: usize },

    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
