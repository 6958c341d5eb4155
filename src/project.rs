//! Version stamping of `.csproj` project files.
//!
//! Only the text between `<Field>` and `</Field>` changes; every other byte of
//! the file, including line endings and indentation, is written back as read.

use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Default project file extension
pub const DEFAULT_PROJECT_EXTENSION: &str = "csproj";

/// Rewrites version-like elements of a project definition file in place.
#[derive(Debug, Clone)]
pub struct ProjectVersionWriter {
    extension: String,
}

impl Default for ProjectVersionWriter {
    fn default() -> Self {
        ProjectVersionWriter::new(DEFAULT_PROJECT_EXTENSION)
    }
}

impl ProjectVersionWriter {
    pub fn new(extension: impl Into<String>) -> Self {
        ProjectVersionWriter {
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Finds the project file directly under `project_dir`.
    ///
    /// When several files match, the first by file name wins.
    pub fn locate(&self, project_dir: &Path) -> Result<PathBuf> {
        let entries = fs::read_dir(project_dir).map_err(|e| {
            ReleaseError::ProjectFileNotFound(format!("{}: {}", project_dir.display(), e))
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let matches = path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()))
                    .unwrap_or(false);
            if matches {
                candidates.push(path);
            }
        }

        candidates.sort();
        candidates.into_iter().next().ok_or_else(|| {
            ReleaseError::ProjectFileNotFound(format!(
                "no *.{} file in {}",
                self.extension,
                project_dir.display()
            ))
        })
    }

    /// Sets every `<field_name>` element of the project file to `version`.
    ///
    /// Re-running with the same value leaves the file untouched.
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - The project file that was stamped
    /// * `Err(ProjectFileNotFound)` - No project file under `project_dir`
    /// * `Err(FieldNotFound)` - The file has no `<field_name>` element
    pub fn write_version(&self, project_dir: &Path, version: &str, field_name: &str) -> Result<PathBuf> {
        let path = self.locate(project_dir)?;
        let content = fs::read_to_string(&path)?;

        let updated = replace_field(&content, field_name, version)?.ok_or_else(|| {
            ReleaseError::FieldNotFound {
                field: field_name.to_string(),
                file: path.display().to_string(),
            }
        })?;

        if updated != content {
            fs::write(&path, updated)?;
            log::info!("set {} = {} in {}", field_name, version, path.display());
        } else {
            log::debug!("{} already {} in {}", field_name, version, path.display());
        }

        Ok(path)
    }
}

/// Replaces the text of every `<field>...</field>` element.
///
/// Returns `None` when the element does not occur.
pub fn replace_field(content: &str, field: &str, value: &str) -> Result<Option<String>> {
    let field = regex::escape(field);
    let pattern = Regex::new(&format!(r"(<{field}(?:\s[^>]*)?>)([^<]*)(</{field}\s*>)"))?;

    if !pattern.is_match(content) {
        return Ok(None);
    }

    let escaped = escape_xml(value);
    let replaced = pattern.replace_all(content, |caps: &regex::Captures<'_>| {
        format!("{}{}{}", &caps[1], escaped, &caps[3])
    });
    Ok(Some(replaced.into_owned()))
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
