use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("'{path}' does not exist")]
    NotFound { path: PathBuf },

    #[error("failed to resolve absolute path for '{path}': {source}")]
    Path { path: PathBuf, source: io::Error },

    #[error("'{path}' is not inside '{root}'")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("'{path}' has no usable archive name")]
    EmptyName { path: PathBuf },

    #[error("'{path}' is not valid UTF-8 and cannot be stored as an archive name")]
    NonUtf8Name { path: PathBuf },

    #[error("'{first}' and '{second}' both map to archive name '{name}'")]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("I/O error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("unknown archival format '{id}'")]
    UnknownArchival { id: String },

    #[error("unknown compression format '{id}'")]
    UnknownCompression { id: String },

    #[error("compression '{id}' is not enabled in this build")]
    CodecUnavailable { id: &'static str },

    #[error("cannot determine archive format of '{path}'")]
    UnsupportedFormat { path: PathBuf },

    #[error("zip container error on '{path}': {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("path traversal detected: entry '{entry}' resolves to '{resolved}'")]
    ZipSlip { entry: PathBuf, resolved: PathBuf },

    #[error("symlink target escapes destination: '{target}' in '{symlink}'")]
    SymlinkEscape { target: PathBuf, symlink: PathBuf },

    #[error("symlink '{path}' points outside the archived tree: '{target}'")]
    ExternalSymlink { path: PathBuf, target: PathBuf },

    #[error("refusing to overwrite existing '{path}'")]
    AlreadyExists { path: PathBuf },

    #[error("operation cancelled")]
    Cancelled,

    #[error("failed to create archive '{output}': {source}")]
    ArchiveFailed {
        output: PathBuf,
        source: Box<Error>,
    },
}

/// Coarse classification of [`Error`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Path,
    Io,
    Format,
    Security,
    Cancelled,
}

impl Error {
    /// Classify the error, looking through [`Error::ArchiveFailed`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Path { .. }
            | Self::OutsideRoot { .. }
            | Self::EmptyName { .. }
            | Self::NonUtf8Name { .. }
            | Self::DuplicateName { .. } => ErrorKind::Path,
            Self::Io { .. } | Self::Zip { .. } | Self::AlreadyExists { .. } => ErrorKind::Io,
            Self::UnknownArchival { .. }
            | Self::UnknownCompression { .. }
            | Self::CodecUnavailable { .. }
            | Self::UnsupportedFormat { .. } => ErrorKind::Format,
            Self::ZipSlip { .. } | Self::SymlinkEscape { .. } | Self::ExternalSymlink { .. } => {
                ErrorKind::Security
            }
            Self::Cancelled => ErrorKind::Cancelled,
            Self::ArchiveFailed { source, .. } => source.kind(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        match source {
            zip::result::ZipError::Io(source) => Self::io(path, source),
            source => Self::Zip {
                path: path.into(),
                source,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
