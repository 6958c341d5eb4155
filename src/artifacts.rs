//! Collection of build outputs into the release artifacts directory.
//!
//! File names are matched against a pattern with at least one capture group.
//! The first capture group that matched (non-empty) marks the part of the name
//! that is replaced by the release version, so with `-(Signed)\.apk$` the file
//! `app-Signed.apk` becomes `app-1.2.3.apk`.

use crate::error::{ReleaseError, Result};
use crate::version::ReleaseVersion;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What to do when a scan matches no file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyScanPolicy {
    /// Abort the release with `PatternMatchFailure`
    #[default]
    Fail,
    /// Warn and continue with no artifacts
    Skip,
}

/// A build output file selected for release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// Where the build tool left the file
    pub source: PathBuf,
    /// The captured text that identified the file (e.g. `Signed`)
    pub kind: String,
    /// File name inside the artifacts directory
    pub destination_name: String,
}

/// Scans an output directory for files matching an artifact pattern
#[derive(Debug, Clone)]
pub struct ArtifactCollector {
    pattern: Regex,
    recursive: bool,
}

impl ArtifactCollector {
    /// Compiles `pattern`.
    ///
    /// # Returns
    /// * `Err(Config)` - If the pattern is invalid or has no capture group
    pub fn new(pattern: &str, recursive: bool) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|e| {
            ReleaseError::config(format!("invalid artifact pattern '{}': {}", pattern, e))
        })?;

        if compiled.captures_len() < 2 {
            return Err(ReleaseError::config(format!(
                "artifact pattern '{}' needs a capture group marking the text to replace",
                pattern
            )));
        }

        Ok(ArtifactCollector {
            pattern: compiled,
            recursive,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Matches a single file name.
    ///
    /// # Returns
    /// * `Ok(None)` - The name does not match
    /// * `Ok(Some((kind, destination_name)))` - The name matches
    /// * `Err(AmbiguousPattern)` - The pattern matches more than once in the name
    pub fn match_name(&self, file_name: &str, version: &ReleaseVersion) -> Result<Option<(String, String)>> {
        let mut matches = self.pattern.captures_iter(file_name);
        let captures = match matches.next() {
            Some(captures) => captures,
            None => return Ok(None),
        };

        if matches.next().is_some() {
            return Err(ReleaseError::AmbiguousPattern(format!(
                "'{}' matches '{}' more than once",
                self.pattern.as_str(),
                file_name
            )));
        }

        // Alternations leave the other groups unset: first non-empty group wins.
        let group = captures
            .iter()
            .skip(1)
            .flatten()
            .find(|m| !m.as_str().is_empty());

        let group = match group {
            Some(group) => group,
            None => {
                return Err(ReleaseError::AmbiguousPattern(format!(
                    "'{}' matched '{}' without capturing any text",
                    self.pattern.as_str(),
                    file_name
                )))
            }
        };

        let destination = format!(
            "{}{}{}",
            &file_name[..group.start()],
            version,
            &file_name[group.end()..]
        );
        Ok(Some((group.as_str().to_string(), destination)))
    }

    /// Scans `output_dir` and returns the matching files, sorted by path.
    pub fn collect(&self, output_dir: &Path, version: &ReleaseVersion) -> Result<ArtifactSet> {
        let depth = if self.recursive { usize::MAX } else { 1 };
        let mut entries = Vec::new();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();

        for entry in WalkDir::new(output_dir)
            .min_depth(1)
            .max_depth(depth)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if let Some((kind, destination_name)) = self.match_name(&file_name, version)? {
                // A recursive scan can find the same name in two subdirectories.
                if let Some(first) = claimed.get(&destination_name) {
                    return Err(ReleaseError::AmbiguousPattern(format!(
                        "{} and {} would both be collected as '{}'",
                        first.display(),
                        entry.path().display(),
                        destination_name
                    )));
                }
                claimed.insert(destination_name.clone(), entry.path().to_path_buf());
                log::debug!(
                    "artifact {} -> {}",
                    entry.path().display(),
                    destination_name
                );
                entries.push(ArtifactEntry {
                    source: entry.path().to_path_buf(),
                    kind,
                    destination_name,
                });
            }
        }

        Ok(ArtifactSet {
            entries,
            scanned: output_dir.to_path_buf(),
            pattern: self.pattern.as_str().to_string(),
        })
    }
}

/// Artifacts found by one scan
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    entries: Vec<ArtifactEntry>,
    scanned: PathBuf,
    pattern: String,
}

impl ArtifactSet {
    pub fn entries(&self) -> &[ArtifactEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies the empty-scan policy.
    ///
    /// # Returns
    /// * `Err(PatternMatchFailure)` - Nothing matched and the policy is `Fail`
    pub fn check(&self, policy: EmptyScanPolicy) -> Result<()> {
        if self.entries.is_empty() && policy == EmptyScanPolicy::Fail {
            return Err(ReleaseError::PatternMatchFailure(format!(
                "no file in {} matches '{}'",
                self.scanned.display(),
                self.pattern
            )));
        }
        Ok(())
    }

    /// Moves every artifact into `artifacts_dir` under its destination name.
    ///
    /// Creates the directory if absent and replaces existing files.
    pub fn move_all(self, artifacts_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(artifacts_dir)?;

        let mut moved = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            let destination = artifacts_dir.join(&entry.destination_name);
            move_file(&entry.source, &destination)?;
            log::info!(
                "moved {} to {}",
                entry.source.display(),
                destination.display()
            );
            moved.push(destination);
        }
        Ok(moved)
    }
}

/// Renames a file, falling back to copy and remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_file(to)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
