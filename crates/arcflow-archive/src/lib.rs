//! Archive creation and extraction over pluggable containers and codecs.
//!
//! # Architecture
//!
//! - `resolve.rs` - Physical path to logical name mapping
//! - `collect.rs` - Entry collection (directory walk or explicit files)
//! - `format/` - Codec and container registry, detection
//! - `container/` - Tar and zip writers
//! - `archive.rs` - Archive pipeline
//! - `extract/` - Extraction pipeline per container
//! - `sanitize.rs` - Path containment (zip-slip prevention)

pub use archive::{archive, archive_files, archive_files_with, archive_with, make_files_map};
pub use cancel::CancelToken;
pub use collect::{collect_dir, collect_files};
pub use entry::{Entry, EntryKind};
pub use error::{Error, ErrorKind, Result};
pub use extract::{unarchive, unarchive_with};
pub use format::{Archival, Compression, FormatSelection};
pub use options::{ArchiveOptions, ExtractOptions, PermissionStrategy, ZipMethod};
pub use report::{ArchiveReport, ExtractReport};
pub use resolve::{FileMapping, archive_dir_name, resolve_files};
pub use sanitize::{sanitize_path, sanitize_symlink_target};

mod archive;
mod cancel;
mod collect;
mod container;
mod entry;
mod error;
mod extract;
pub mod format;
pub mod options;
mod report;
pub mod resolve;
mod sanitize;
