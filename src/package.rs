//! Zip packaging of a build output directory.

use crate::error::{ReleaseError, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Entry names written into an archive, in write order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub archive: PathBuf,
    pub entries: Vec<String>,
}

/// Bundles a directory tree into a single zip archive
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageAssembler;

impl PackageAssembler {
    pub fn new() -> Self {
        PackageAssembler
    }

    /// Writes every regular file under `source_dir` into `archive_path`.
    ///
    /// Entry names are paths relative to `source_dir` with `/` separators.
    /// Files are visited in file-name order so the entry list is the same for
    /// the same tree. An existing archive is replaced.
    pub fn assemble(&self, source_dir: &Path, archive_path: &Path) -> Result<PackageManifest> {
        if !source_dir.is_dir() {
            return Err(ReleaseError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not an accessible directory", source_dir.display()),
            )));
        }

        if let Some(parent) = archive_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let archive_abs = fs::canonicalize(archive_path.parent().unwrap_or(Path::new(".")))
            .ok()
            .and_then(|dir| archive_path.file_name().map(|name| dir.join(name)));

        let file = File::create(archive_path)?;
        let mut writer = ZipWriter::new(BufWriter::new(file));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        let mut entries = Vec::new();
        for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            // The archive may be written inside the tree it packages.
            if let Some(archive_abs) = &archive_abs {
                if fs::canonicalize(entry.path()).ok().as_ref() == Some(archive_abs) {
                    continue;
                }
            }

            let relative = entry.path().strip_prefix(source_dir).map_err(|e| {
                ReleaseError::Io(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
            })?;
            let name = entry_name(relative);

            writer.start_file(name.clone(), options)?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, &mut writer)?;
            entries.push(name);
        }

        let mut inner = writer.finish()?;
        io::Write::flush(&mut inner)?;

        log::info!(
            "packaged {} file(s) from {} into {}",
            entries.len(),
            source_dir.display(),
            archive_path.display()
        );

        Ok(PackageManifest {
            archive: archive_path.to_path_buf(),
            entries,
        })
    }
}

/// Archive entry name for a relative path, always `/`-separated.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
