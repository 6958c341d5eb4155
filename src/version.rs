use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use regex::Regex;
use std::fmt;

/// Default pattern for extracting the version label from a branch name.
///
/// Matches the first dotted numeric run, so `1.4`, `release/1.4` and
/// `v1.4-hotfix` all yield `1.4`.
pub const DEFAULT_LABEL_PATTERN: &str = r"(\d+(?:\.\d+)*)";

/// Release version `{label}.{commit_index}`.
///
/// The label comes from the branch name, the index is the number of commits
/// reachable from HEAD, so sequential commits on one branch produce strictly
/// increasing versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    label: String,
    commit_index: usize,
}

impl ReleaseVersion {
    /// Creates a version from a branch label and commit index.
    ///
    /// # Returns
    /// * `Err(VersionUnavailable)` - If the label is empty or contains whitespace
    pub fn new(label: impl Into<String>, commit_index: usize) -> Result<Self> {
        let label = label.into();
        if label.is_empty() || label.chars().any(char::is_whitespace) {
            return Err(ReleaseError::version(format!(
                "invalid version label '{}'",
                label
            )));
        }
        Ok(ReleaseVersion {
            label,
            commit_index,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn commit_index(&self) -> usize {
        self.commit_index
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.label, self.commit_index)
    }
}

/// Extracts the version label from a branch name.
///
/// Uses capture group 1 when the pattern has one, the whole match otherwise.
pub fn label_from_branch(branch: &str, pattern: &Regex) -> Option<String> {
    let captures = pattern.captures(branch)?;
    captures
        .get(1)
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().to_string())
        .filter(|label| !label.is_empty())
}

/// Derives the release version from repository state.
pub struct VersionResolver<'a, R: Repository> {
    repo: &'a R,
    label_pattern: Regex,
}

impl<'a, R: Repository> VersionResolver<'a, R> {
    /// Creates a resolver using [DEFAULT_LABEL_PATTERN].
    pub fn new(repo: &'a R) -> Result<Self> {
        Self::with_pattern(repo, DEFAULT_LABEL_PATTERN)
    }

    /// Creates a resolver with a custom branch label pattern.
    pub fn with_pattern(repo: &'a R, pattern: &str) -> Result<Self> {
        let label_pattern = Regex::new(pattern).map_err(|e| {
            ReleaseError::config(format!("invalid version label pattern '{}': {}", pattern, e))
        })?;
        Ok(VersionResolver {
            repo,
            label_pattern,
        })
    }

    /// Resolves the release version for the current HEAD.
    ///
    /// # Returns
    /// * `Ok(ReleaseVersion)` - `{label}.{commit_count}`
    /// * `Err(VersionUnavailable)` - Detached HEAD, a branch without a label,
    ///   or a failed commit count
    pub fn resolve(&self) -> Result<ReleaseVersion> {
        let branch = self.repo.current_branch()?.ok_or_else(|| {
            ReleaseError::version("HEAD is detached; cannot derive a label from the branch name")
        })?;

        let label = label_from_branch(&branch, &self.label_pattern).ok_or_else(|| {
            ReleaseError::version(format!(
                "branch '{}' does not match label pattern '{}'",
                branch,
                self.label_pattern.as_str()
            ))
        })?;

        let commit_index = self.repo.head_commit_count().map_err(|e| {
            ReleaseError::version(format!("cannot count commits on '{}': {}", branch, e))
        })?;

        let version = ReleaseVersion::new(label, commit_index)?;
        log::info!("resolved version {} from branch '{}'", version, branch);
        Ok(version)
    }
}
