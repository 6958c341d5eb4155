//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the repository
//! operations a release needs, allowing for a real implementation backed by
//! libgit2 and a mock implementation for pipeline tests.
//!
//! # Overview
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: An in-memory implementation for testing
//!
//! Components such as [crate::version::VersionResolver] and
//! [crate::publish::ReleasePublisher] depend on the [Repository] trait rather
//! than on a concrete implementation.
//!
//! ```rust
//! # use roadnik_release::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> roadnik_release::Result<()> {
//! let branch = repo.current_branch()?;
//! let count = repo.head_commit_count()?;
//! println!("{:?} has {} commits", branch, count);
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use git2::Oid;
use std::fmt;

/// Committer and tagger identity used for release commits and tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Identity {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Result of merging a release branch back into trunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Trunk already contains every commit of the source branch
    UpToDate,
    /// Trunk was moved forward to the source branch head
    FastForward(Oid),
    /// A merge commit was created on trunk
    Merged(Oid),
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeOutcome::UpToDate => write!(f, "already up to date"),
            MergeOutcome::FastForward(oid) => write!(f, "fast-forwarded to {}", short(oid)),
            MergeOutcome::Merged(oid) => write!(f, "merge commit {}", short(oid)),
        }
    }
}

fn short(oid: &Oid) -> String {
    let full = oid.to_string();
    full[..7.min(full.len())].to_string()
}

/// Repository operations required by the release pipeline
///
/// ## Error Handling
///
/// Implementations map libgit2 failures to the matching
/// [crate::error::ReleaseError] variant: an existing tag becomes
/// `TagAlreadyExists`, a refused push becomes `PushRejected` and a conflicted
/// merge becomes `MergeConflict`.
pub trait Repository {
    /// Name of the branch HEAD points to, or `None` when HEAD is detached
    fn current_branch(&self) -> Result<Option<String>>;

    /// Number of commits reachable from HEAD (including HEAD itself)
    fn head_commit_count(&self) -> Result<usize>;

    /// Object ID of the commit HEAD points to
    fn head_oid(&self) -> Result<Oid>;

    /// Find a tag by name and return the commit it points to
    ///
    /// Handles both lightweight and annotated tags.
    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>>;

    /// Create an annotated tag at HEAD
    ///
    /// # Returns
    /// * `Ok(Oid)` - Object ID of the tag object
    /// * `Err(TagAlreadyExists)` - If a tag with this name already exists
    fn create_annotated_tag(&self, name: &str, message: &str, tagger: &Identity) -> Result<Oid>;

    /// Push refspecs (`src:dst`) to the named remote
    fn push(&self, remote: &str, refspecs: &[String]) -> Result<()>;

    /// Stash working tree and index changes
    ///
    /// Returns `false` when there was nothing to stash.
    fn stash(&mut self, stasher: &Identity) -> Result<bool>;

    /// Check out a local branch and point HEAD at it
    fn checkout_branch(&self, branch: &str) -> Result<()>;

    /// Merge `source` into the currently checked out branch
    fn merge_into_head(&self, source: &str, committer: &Identity) -> Result<MergeOutcome>;

    /// Identity configured in the repository (`user.name` / `user.email`)
    fn default_identity(&self) -> Result<Identity>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        let identity = Identity::new("casualshammy", "ci@roadnik.app");
        assert_eq!(identity.to_string(), "casualshammy <ci@roadnik.app>");
    }

    #[test]
    fn test_merge_outcome_display_shortens_oid() {
        let oid = Oid::from_str("0123456789abcdef0123456789abcdef01234567").unwrap();
        assert_eq!(
            MergeOutcome::FastForward(oid).to_string(),
            "fast-forwarded to 0123456"
        );
        assert_eq!(MergeOutcome::UpToDate.to_string(), "already up to date");
    }
}
