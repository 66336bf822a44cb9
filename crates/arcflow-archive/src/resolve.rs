//! Mapping between physical paths on disk and logical names inside an archive.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// A resolved `(physical, logical)` pair for explicit-file archiving.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMapping {
    pub physical: PathBuf,
    pub logical: String,
}

/// Name under which the contents of `dir` are nested in the archive.
///
/// Empty when `dir` denotes the current directory, so entries land at the
/// archive root.
pub fn archive_dir_name(dir: &Path) -> Result<String> {
    let cleaned = clean(dir);
    if cleaned == Path::new(".") {
        return Ok(String::new());
    }
    if let Some(name) = cleaned.file_name() {
        return utf8_name(name, dir);
    }
    // `..`, `/` and friends: fall back to the resolved directory name.
    let resolved = absolute(dir)?;
    match resolved.file_name() {
        Some(name) => utf8_name(name, dir),
        None => Ok(String::new()),
    }
}

/// Resolve `files` against `trim_dir`, stripping it from each logical name.
///
/// Duplicate inputs collapse to their first occurrence; order is otherwise
/// preserved.
pub fn resolve_files<P: AsRef<Path>>(files: &[P], trim_dir: &Path) -> Result<Vec<FileMapping>> {
    let root = absolute(trim_dir)?;
    let mut seen = HashSet::new();
    let mut mappings = Vec::with_capacity(files.len());

    for file in files {
        let physical = absolute(file.as_ref())?;
        if !seen.insert(physical.clone()) {
            continue;
        }
        let relative = physical
            .strip_prefix(&root)
            .map_err(|_| Error::OutsideRoot {
                path: physical.clone(),
                root: root.clone(),
            })?;
        let logical = logical_name(relative, &physical)?;
        if logical.is_empty() {
            return Err(Error::EmptyName { path: physical });
        }
        mappings.push(FileMapping { physical, logical });
    }

    Ok(mappings)
}

/// Absolute, lexically cleaned form of `path`.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .map(|abs| clean(&abs))
        .map_err(|source| Error::Path {
            path: path.to_path_buf(),
            source,
        })
}

/// Lexically normalize `path`: drop `.` segments and fold `..` into the
/// preceding component. Leading `..` of relative paths are kept; `..` at
/// the root is dropped. The empty path cleans to `.`.
pub fn clean(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Render the normal components of a relative path joined by `/`.
///
/// Names must be valid UTF-8; `physical` labels the error otherwise.
pub(crate) fn logical_name(relative: &Path, physical: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_str().ok_or_else(|| Error::NonUtf8Name {
                path: physical.to_path_buf(),
            })?);
        }
    }
    Ok(parts.join("/"))
}

fn utf8_name(name: &OsStr, path: &Path) -> Result<String> {
    name.to_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::NonUtf8Name {
            path: path.to_path_buf(),
        })
}

/// Join an archive prefix and a relative logical name.
pub(crate) fn join_logical(prefix: &str, relative: &str) -> String {
    match (prefix.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}/{relative}"),
    }
}
