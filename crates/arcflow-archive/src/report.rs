use std::path::PathBuf;

use crate::format::FormatSelection;

/// Summary of a successful archive creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveReport {
    pub output: PathBuf,
    pub selection: FormatSelection,
    pub entry_count: usize,
    /// Uncompressed bytes of regular file content written.
    pub total_bytes: u64,
}

/// Summary of a successful extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractReport {
    pub destination: PathBuf,
    /// Formats used, whether given explicitly or detected.
    pub selection: FormatSelection,
    pub entry_count: usize,
    pub total_bytes: u64,
}
