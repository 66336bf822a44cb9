#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use arcflow_archive::format::COMPRESSIONS;
use arcflow_archive::{Archival, Compression, FormatSelection};

/// What a path holds, as seen by `snapshot`.
#[derive(Debug, PartialEq, Eq)]
pub enum Node {
    Dir,
    File(Vec<u8>),
    Link(String),
}

/// Flatten a directory tree into `relative/name -> Node`.
pub fn snapshot(root: &Path) -> BTreeMap<String, Node> {
    let mut nodes = BTreeMap::new();
    visit(root, root, &mut nodes);
    nodes
}

fn visit(root: &Path, dir: &Path, nodes: &mut BTreeMap<String, Node>) {
    for item in fs::read_dir(dir).unwrap() {
        let path = item.unwrap().path();
        let name = path
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        let meta = fs::symlink_metadata(&path).unwrap();
        if meta.file_type().is_symlink() {
            let target = fs::read_link(&path).unwrap();
            nodes.insert(name, Node::Link(target.to_string_lossy().into_owned()));
        } else if meta.is_dir() {
            nodes.insert(name, Node::Dir);
            visit(root, &path, nodes);
        } else {
            nodes.insert(name, Node::File(fs::read(&path).unwrap()));
        }
    }
}

/// A small tree under `parent/project` with text, binary, empty and nested
/// content.
pub fn fixture_tree(parent: &Path) -> std::path::PathBuf {
    let root = parent.join("project");
    fs::create_dir_all(root.join("src/nested")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::write(root.join("README.md"), "# project\n").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("src/nested/blob.bin"), binary_blob()).unwrap();
    fs::write(root.join("src/nested/zero.txt"), "").unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink("src/main.rs", root.join("entry.rs")).unwrap();
    root
}

fn binary_blob() -> Vec<u8> {
    (0..64 * 1024u32).map(|i| (i.wrapping_mul(31) % 251) as u8).collect()
}

/// Every (compression, archival) pair compiled into this build, plus the
/// uncompressed containers.
pub fn available_selections() -> Vec<FormatSelection> {
    let mut codecs: Vec<Option<Compression>> = vec![None];
    codecs.extend(
        COMPRESSIONS
            .iter()
            .map(|(_, codec)| *codec)
            .filter(|codec| codec.is_available())
            .map(Some),
    );

    let mut selections = Vec::new();
    for archival in [Archival::Tar, Archival::Zip] {
        for codec in &codecs {
            selections.push(FormatSelection::new(*codec, archival));
        }
    }
    selections
}
