use std::{io, path::PathBuf};

/// Errors produced by the facility and its buffered operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A byte stream, the gzip codec or the archive writer failed.
    ///
    /// The error reported by the failing stream is kept as is.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The zip writer rejected an entry or could not finish the archive.
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The facility options could not be read into a configuration.
    #[error("invalid facility options: {0}")]
    Options(#[from] serde_json::Error),

    /// The facility options file could not be read.
    #[error("failed to read options from {path}: {source}")]
    ReadConfig {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// A compression operation was requested before the facility was started.
    #[error("facility `{0}` has not been started")]
    NotStarted(&'static str),

    /// An entry was appended to an archive that was already finalized.
    #[error("archive has already been finalized")]
    ArchiveFinalized,

    /// The task buffering a stream went away before producing a result.
    #[error("buffering task ended without a result")]
    BufferingAborted,
}

/// A specialized [`Result`](std::result::Result) for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Wraps a non-I/O failure so it can travel as an item of a byte stream.
    pub(crate) fn into_io(self) -> io::Error {
        match self {
            Self::Io(err) => err,
            Self::Zip(zip::result::ZipError::Io(err)) => err,
            other => io::Error::other(other),
        }
    }
}
