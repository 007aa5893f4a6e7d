//! Archive files presented as directories.
//!
//! A `file://` URL of the form `<archive-path>/<entry-path>` addresses a single
//! entry inside a zip or tar archive. Listing returns only file entries with
//! `/`-separated relative paths; directory entries are implied.
//!
//! All functions here do blocking I/O. Async callers run them on the blocking pool.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use docscout_shared::{Result, ScraperError};

/// Upper bound on buffer space reserved from an entry's declared size.
const MAX_ENTRY_PREALLOC: usize = 1 << 20;

/// Supported archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
}

/// Detect the archive format from a file name.
pub fn archive_kind(path: &Path) -> Option<ArchiveKind> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if name.ends_with(".zip") {
        Some(ArchiveKind::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else if name.ends_with(".tar") {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

/// Whether `path` is an existing regular file with an archive extension.
pub fn is_archive(path: &Path) -> bool {
    archive_kind(path).is_some() && path.is_file()
}

/// Split a path that points *into* an archive into (archive file, entry path).
///
/// Walks up from `path` until an existing archive file is found. Returns `None`
/// when no ancestor is an archive or when `path` is the archive itself.
pub fn split_archive_path(path: &Path) -> Option<(PathBuf, String)> {
    let mut rest: Vec<String> = Vec::new();
    let mut current = path;

    while let Some(parent) = current.parent() {
        let name = current.file_name()?.to_string_lossy().into_owned();
        rest.push(name);
        if is_archive(parent) {
            rest.reverse();
            return Some((parent.to_path_buf(), rest.join("/")));
        }
        if parent.exists() {
            // A real directory ancestor that is not an archive ends the search.
            return None;
        }
        current = parent;
    }
    None
}

/// List file entries of an archive.
pub fn list_entries(path: &Path) -> Result<Vec<String>> {
    let kind = archive_kind(path)
        .ok_or_else(|| ScraperError::archive(path, "unsupported archive type"))?;

    let mut entries = match kind {
        ArchiveKind::Zip => list_zip(path)?,
        ArchiveKind::Tar => list_tar(path, open(path)?)?,
        ArchiveKind::TarGz => list_tar(path, GzDecoder::new(open(path)?))?,
    };
    entries.sort();
    entries.dedup();
    Ok(entries)
}

/// Read one entry's bytes. `Ok(None)` when the entry does not exist.
pub fn read_entry(path: &Path, entry: &str) -> Result<Option<Vec<u8>>> {
    let kind = archive_kind(path)
        .ok_or_else(|| ScraperError::archive(path, "unsupported archive type"))?;
    let wanted = normalize_entry_name(entry);

    match kind {
        ArchiveKind::Zip => read_zip_entry(path, &wanted),
        ArchiveKind::Tar => read_tar_entry(path, open(path)?, &wanted),
        ArchiveKind::TarGz => read_tar_entry(path, GzDecoder::new(open(path)?), &wanted),
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ScraperError::io(path, e))
}

/// Strip `./` and leading slashes; reject traversal components.
fn normalize_entry_name(name: &str) -> String {
    Path::new(name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_safe_entry(name: &Path) -> bool {
    name.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

// ---------------------------------------------------------------------------
// Zip
// ---------------------------------------------------------------------------

fn open_zip(path: &Path) -> Result<zip::ZipArchive<BufReader<File>>> {
    zip::ZipArchive::new(open(path)?)
        .map_err(|e| ScraperError::archive(path, format!("invalid zip: {e}")))
}

fn list_zip(path: &Path) -> Result<Vec<String>> {
    let mut archive = open_zip(path)?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let file = archive
            .by_index(i)
            .map_err(|e| ScraperError::archive(path, format!("entry {i}: {e}")))?;
        if file.is_dir() {
            continue;
        }
        if let Some(name) = file.enclosed_name() {
            entries.push(normalize_entry_name(&name.to_string_lossy()));
        }
    }
    Ok(entries)
}

fn read_zip_entry(path: &Path, wanted: &str) -> Result<Option<Vec<u8>>> {
    let mut archive = open_zip(path)?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ScraperError::archive(path, format!("entry {i}: {e}")))?;
        if file.is_dir() {
            continue;
        }
        let matches = file
            .enclosed_name()
            .is_some_and(|name| normalize_entry_name(&name.to_string_lossy()) == wanted);
        if matches {
            let mut buf = Vec::with_capacity(entry_capacity(file.size()));
            file.read_to_end(&mut buf)
                .map_err(|e| ScraperError::archive(path, format!("{wanted}: {e}")))?;
            return Ok(Some(buf));
        }
    }
    Ok(None)
}

/// Initial buffer size for an entry whose header claims `declared` bytes.
fn entry_capacity(declared: u64) -> usize {
    usize::try_from(declared)
        .unwrap_or(usize::MAX)
        .min(MAX_ENTRY_PREALLOC)
}

// ---------------------------------------------------------------------------
// Tar
// ---------------------------------------------------------------------------

fn list_tar<R: Read>(path: &Path, reader: R) -> Result<Vec<String>> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = Vec::new();

    let iter = archive
        .entries()
        .map_err(|e| ScraperError::archive(path, format!("invalid tar: {e}")))?;
    for entry in iter {
        let entry = entry.map_err(|e| ScraperError::archive(path, e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| ScraperError::archive(path, e.to_string()))?;
        if is_safe_entry(&name) {
            entries.push(normalize_entry_name(&name.to_string_lossy()));
        }
    }
    Ok(entries)
}

fn read_tar_entry<R: Read>(path: &Path, reader: R, wanted: &str) -> Result<Option<Vec<u8>>> {
    let mut archive = tar::Archive::new(reader);

    let iter = archive
        .entries()
        .map_err(|e| ScraperError::archive(path, format!("invalid tar: {e}")))?;
    for entry in iter {
        let mut entry = entry.map_err(|e| ScraperError::archive(path, e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| ScraperError::archive(path, e.to_string()))?
            .to_string_lossy()
            .into_owned();
        if normalize_entry_name(&name) == wanted {
            let mut buf = Vec::new();
            entry
                .read_to_end(&mut buf)
                .map_err(|e| ScraperError::archive(path, format!("{wanted}: {e}")))?;
            return Ok(Some(buf));
        }
    }
    Ok(None)
}
