use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arcflow_archive::format::{self, ARCHIVALS, COMPRESSIONS};
use arcflow_archive::{
    ArchiveOptions, ArchiveReport, CancelToken, ExtractOptions, FormatSelection,
    PermissionStrategy, ZipMethod,
};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "arcflow",
    about = "Create and extract tar/zip archives under any supported compression",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log pipeline stages to stderr
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Archive a directory. `.` stores its contents at the archive root,
    /// anything else nests them under the directory name.
    #[command(alias = "a")]
    Archive(ArchiveArgs),
    /// Archive an explicit list of files, named relative to `--trim-dir`
    #[command(alias = "p")]
    Pack(PackArgs),
    /// Extract an archive, detecting its formats
    #[command(alias = "x")]
    Extract(ExtractArgs),
    /// List the known format identifiers
    Formats,
}

/// Format and tuning flags shared by `archive` and `pack`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Archive file to create; replaced if it exists
    #[arg(short, long)]
    pub output: PathBuf,

    /// Compression id (`gz`, `zst`, ...), or `none`. Inferred from the
    /// output name when omitted.
    #[arg(short, long, env = "ARCFLOW_COMPRESSION")]
    pub compression: Option<String>,

    /// Container id (`tar` or `zip`). Inferred from the output name when
    /// omitted.
    #[arg(short, long, env = "ARCFLOW_ARCHIVAL")]
    pub archival: Option<String>,

    /// Compression level for the outer codec
    #[arg(short, long)]
    pub level: Option<u32>,

    /// Store zip members without per-entry deflate
    #[arg(long)]
    pub stored: bool,

    /// Keep a partially written archive when creation fails
    #[arg(long)]
    pub keep_partial: bool,
}

#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Directory to archive
    pub source: PathBuf,

    #[command(flatten)]
    pub create: CreateArgs,
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Files or directories to include, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Prefix stripped from every path to form its archive name
    #[arg(short, long, default_value = ".")]
    pub trim_dir: PathBuf,

    #[command(flatten)]
    pub create: CreateArgs,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Archive to read
    pub archive: PathBuf,

    /// Destination directory, created when missing
    #[arg(default_value = ".")]
    pub destination: PathBuf,

    /// Force the compression id instead of detecting it (`none` for plain)
    #[arg(short, long, requires = "archival")]
    pub compression: Option<String>,

    /// Force the container id instead of detecting it
    #[arg(short, long)]
    pub archival: Option<String>,

    /// How stored permission bits are applied
    #[arg(long, value_enum, default_value_t = Permissions::Preserve)]
    pub permissions: Permissions,

    /// Fail instead of replacing existing files
    #[arg(long)]
    pub no_overwrite: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Permissions {
    Preserve,
    Standard,
    ReadOnly,
    Owned,
}

impl From<Permissions> for PermissionStrategy {
    fn from(value: Permissions) -> Self {
        match value {
            Permissions::Preserve => Self::Preserve,
            Permissions::Standard => Self::Standard,
            Permissions::ReadOnly => Self::ReadOnly,
            Permissions::Owned => Self::Owned,
        }
    }
}

pub fn handle_archive(args: ArchiveArgs) -> Result<()> {
    let create = &args.create;
    let selection = creation_format(&create.output, create)?;
    let report = arcflow_archive::archive_with(
        &CancelToken::new(),
        &args.source,
        &create.output,
        selection.compression,
        selection.archival,
        &archive_options(create),
    )
    .with_context(|| format!("archiving '{}'", args.source.display()))?;
    print_created(&report);
    Ok(())
}

pub fn handle_pack(args: PackArgs) -> Result<()> {
    let create = &args.create;
    let selection = creation_format(&create.output, create)?;
    let cancel = CancelToken::new();
    let entries = arcflow_archive::make_files_map(&cancel, args.files.as_slice(), &args.trim_dir)
        .context("resolving input files")?;
    let report = arcflow_archive::archive_files_with(
        &cancel,
        &entries,
        &create.output,
        selection.compression,
        selection.archival,
        &archive_options(create),
    )?;
    print_created(&report);
    Ok(())
}

pub fn handle_extract(args: ExtractArgs) -> Result<()> {
    let mut options = ExtractOptions::default()
        .permission_strategy(args.permissions.into())
        .overwrite(!args.no_overwrite);
    if let Some(archival) = &args.archival {
        let compression = args.compression.as_deref().unwrap_or("none");
        options = options.format(parse_selection(compression, archival)?);
    }

    let report = arcflow_archive::unarchive_with(
        &CancelToken::new(),
        &args.archive,
        &args.destination,
        &options,
    )
    .with_context(|| format!("extracting '{}'", args.archive.display()))?;
    println!(
        "extracted {} entries ({}, {} bytes) into {}",
        report.entry_count,
        report.selection,
        report.total_bytes,
        report.destination.display()
    );
    Ok(())
}

pub fn handle_formats() -> Result<()> {
    println!("archival:");
    for (id, _) in ARCHIVALS {
        println!("  {id}");
    }
    println!("compression:");
    for (id, codec) in COMPRESSIONS {
        let note = if codec.is_available() { "" } else { " (disabled)" };
        println!("  {id:<4} {}{note}", codec.name());
    }
    Ok(())
}

fn archive_options(args: &CreateArgs) -> ArchiveOptions {
    let mut options = ArchiveOptions::default().keep_partial(args.keep_partial);
    if args.stored {
        options = options.zip_method(ZipMethod::Stored);
    }
    if let Some(level) = args.level {
        options = options.compression_level(level);
    }
    options
}

/// Explicit ids win; missing halves come from the output file name.
fn creation_format(output: &Path, args: &CreateArgs) -> Result<FormatSelection> {
    let (ext_compression, ext_archival) = format::detect_from_extension(output);
    let archival = match args.archival.as_deref() {
        Some(id) => format::archival(id)?,
        None => ext_archival.with_context(|| {
            format!(
                "cannot infer archive format from '{}'; pass --archival",
                output.display()
            )
        })?,
    };
    let compression = match args.compression.as_deref() {
        Some(id) => parse_compression(id)?,
        None => ext_compression,
    };
    Ok(FormatSelection::new(compression, archival))
}

fn parse_selection(compression: &str, archival: &str) -> Result<FormatSelection> {
    Ok(FormatSelection::new(
        parse_compression(compression)?,
        format::archival(archival)?,
    ))
}

fn parse_compression(id: &str) -> Result<Option<arcflow_archive::Compression>> {
    match id {
        "" | "none" => Ok(None),
        id => Ok(Some(
            format::compression(id).with_context(|| format!("unknown compression format '{id}'"))?,
        )),
    }
}

fn print_created(report: &ArchiveReport) {
    println!(
        "created {} ({}, {} entries, {} bytes)",
        report.output.display(),
        report.selection,
        report.entry_count,
        report.total_bytes
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcflow_archive::{Archival, Compression};

    fn create_args(output: &str) -> CreateArgs {
        CreateArgs {
            output: output.into(),
            compression: None,
            archival: None,
            level: None,
            stored: false,
            keep_partial: false,
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn format_inferred_from_output_name() {
        let args = create_args("dist/app.tar.zst");
        let selection = creation_format(&args.output, &args).unwrap();
        assert_eq!(
            selection,
            FormatSelection::new(Some(Compression::Zstd), Archival::Tar)
        );
    }

    #[test]
    fn explicit_ids_override_name() {
        let mut args = create_args("bundle.bin");
        args.archival = Some("zip".into());
        args.compression = Some("none".into());
        let selection = creation_format(&args.output, &args).unwrap();
        assert_eq!(selection, FormatSelection::new(None, Archival::Zip));
    }

    #[test]
    fn unknown_name_needs_archival() {
        let args = create_args("bundle.bin");
        let err = creation_format(&args.output, &args).unwrap_err();
        assert!(err.to_string().contains("--archival"));
    }

    #[test]
    fn unknown_compression_is_rejected() {
        assert!(parse_compression("rar").is_err());
        assert_eq!(parse_compression("gz").unwrap(), Some(Compression::Gzip));
    }
}
