use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Filter(#[from] pwned_offline::Error),

    #[error("Failed reading corpus '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File '{path}' exists. Use --force to rebuild it.")]
    FileExists { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
