//! Deterministic input archive construction
//!
//! Packs declared input paths into a gzipped tarball whose bytes depend
//! only on the input contents: entries are sorted by name, timestamps are
//! zeroed, and modes are fixed. Building the same inputs twice yields
//! byte-identical archives.
//!
//! The archive is staged in a temp file next to its destination and only
//! becomes visible when [`StagedArchive::persist`] is called, so a failure
//! elsewhere in synthesis leaves the destination untouched.

use std::io::BufWriter;
use std::path::{Component, Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;

use crate::emit::staging_dir;
use crate::error::{Error, Result};

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// One entry slated for the archive
struct ArchiveEntry {
    /// Absolute path on disk
    absolute: PathBuf,
    /// Slash-joined name inside the archive
    name: String,
    /// Whether this entry is a directory
    is_dir: bool,
}

/// A finished archive waiting at its staging path
#[derive(Debug)]
pub struct StagedArchive {
    temp: NamedTempFile,
    destination: PathBuf,
}

impl StagedArchive {
    /// Where the archive will land once persisted
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Move the staged archive to its destination.
    pub fn persist(self) -> Result<PathBuf> {
        self.temp
            .persist(&self.destination)
            .map_err(|e| Error::Io(e.error))?;
        Ok(self.destination)
    }
}

/// Build the input archive into a staging file.
///
/// Input paths are resolved against `root`; directories are walked
/// recursively. Duplicate names collapse to a single entry.
pub fn build_archive(root: &Path, inputs: &[PathBuf], destination: &Path) -> Result<StagedArchive> {
    let entries = collect_entries(root, inputs)?;
    tracing::debug!(entries = entries.len(), "archiving project inputs");

    let staged = NamedTempFile::new_in(staging_dir(destination))?;
    let writer = BufWriter::new(staged.as_file().try_clone()?);
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in &entries {
        let mut header = tar::Header::new_gnu();
        header.set_mtime(0);
        if entry.is_dir {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(DIR_MODE);
            header.set_size(0);
            builder.append_data(&mut header, &entry.name, std::io::empty())?;
        } else {
            let file = std::fs::File::open(&entry.absolute)?;
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(FILE_MODE);
            header.set_size(file.metadata()?.len());
            builder.append_data(&mut header, &entry.name, file)?;
        }
    }

    let encoder = builder.into_inner()?;
    let writer = encoder.finish()?;
    writer.into_inner().map_err(|e| e.into_error())?;

    Ok(StagedArchive {
        temp: staged,
        destination: destination.to_path_buf(),
    })
}

fn collect_entries(root: &Path, inputs: &[PathBuf]) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for input in inputs {
        let absolute = root.join(input);
        if !absolute.exists() {
            return Err(Error::not_found(absolute));
        }
        push_entry(root, &absolute, &mut entries)?;
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries.dedup_by(|a, b| a.name == b.name);
    Ok(entries)
}

fn push_entry(root: &Path, absolute: &Path, entries: &mut Vec<ArchiveEntry>) -> Result<()> {
    let escape = || {
        Error::validation(format!(
            "input path {} escapes the project root",
            absolute.display()
        ))
    };
    let relative = absolute.strip_prefix(root).map_err(|_| escape())?;
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(escape());
    }

    let is_dir = absolute.is_dir();
    entries.push(ArchiveEntry {
        absolute: absolute.to_path_buf(),
        name: entry_name(relative),
        is_dir,
    });
    if is_dir {
        for child in std::fs::read_dir(absolute)? {
            push_entry(root, &child?.path(), entries)?;
        }
    }
    Ok(())
}

/// Slash-joined archive name, regardless of platform separators
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
