//! Helpers for the `.idx`/`.ids` file pair backing one index.
//!
//! An index is addressed by its entry path: the shared base name without
//! either extension. Rebuilds write into the [`temp`] entry next to the
//! original and then [`move_index`] the pair over it.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::disk::constants::{IDS_EXTENSION, IDX_EXTENSION};
use crate::error::{IndexError, IndexResult};

const TEMP_SUFFIX: &str = "tmp";

/// Entry path of `path`: a trailing `.idx` or `.ids` is stripped.
pub fn entry(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(IDX_EXTENSION) | Some(IDS_EXTENSION) => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

fn with_suffix(path: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(entry(path));
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Path of the page file for the index at `path`.
pub fn idx_path(path: impl AsRef<Path>) -> PathBuf {
    with_suffix(path.as_ref(), IDX_EXTENSION)
}

/// Path of the identifier store for the index at `path`.
pub fn ids_path(path: impl AsRef<Path>) -> PathBuf {
    with_suffix(path.as_ref(), IDS_EXTENSION)
}

/// Whether both files of the pair exist.
pub fn exists(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    idx_path(path).is_file() && ids_path(path).is_file()
}

pub(crate) fn any_exists(path: &Path) -> bool {
    idx_path(path).exists() || ids_path(path).exists()
}

/// Removes whichever files of the pair exist.
pub fn clean(path: impl AsRef<Path>) -> IndexResult<()> {
    let path = path.as_ref();
    for file in [idx_path(path), ids_path(path)] {
        match fs::remove_file(&file) {
            Ok(()) => log::debug!("removed {:?}", file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Sibling entry path used while rebuilding the index at `path`.
///
/// The whole entry file name is kept, so `roads.v1` rebuilds in
/// `roads.v1.tmp` and never shares a temp entry with `roads.v2`.
pub fn temp(path: impl AsRef<Path>) -> PathBuf {
    let entry = entry(path);
    let mut name = entry
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("index"));
    name.push(".");
    name.push(TEMP_SUFFIX);
    entry.with_file_name(name)
}

/// Renames both files of the index at `src` to `dst`.
///
/// Fails with [`IndexError::AlreadyExists`] when either destination file is
/// present and `overwrite` is false.
pub fn move_index(src: impl AsRef<Path>, dst: impl AsRef<Path>, overwrite: bool) -> IndexResult<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if !exists(src) {
        return Err(IndexError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no index at {:?}", entry(src)),
        )));
    }
    if any_exists(dst) {
        if !overwrite {
            return Err(IndexError::AlreadyExists(entry(dst)));
        }
        clean(dst)?;
    }

    fs::rename(idx_path(src), idx_path(dst))?;
    fs::rename(ids_path(src), ids_path(dst))?;
    log::debug!("moved index {:?} to {:?}", entry(src), entry(dst));
    Ok(())
}
