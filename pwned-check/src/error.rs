#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lookup(#[from] pwned_offline::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
