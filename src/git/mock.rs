use crate::error::{ReleaseError, Result};
use crate::git::{Identity, MergeOutcome, Repository};
use git2::Oid;
use std::cell::RefCell;
use std::collections::HashMap;

/// Mock repository for testing without actual git operations
///
/// Records every mutating call so tests can assert on what a pipeline did.
pub struct MockRepository {
    branch: Option<String>,
    commit_count: usize,
    head: Oid,
    identity: Option<Identity>,
    dirty: bool,
    reject_pushes: bool,
    conflict_on_merge: bool,
    tags: RefCell<HashMap<String, Oid>>,
    pushed: RefCell<Vec<(String, String)>>,
    checkouts: RefCell<Vec<String>>,
    merges: RefCell<Vec<(String, String)>>,
    stashes: usize,
}

impl MockRepository {
    /// Create a mock repository on `branch` with `commit_count` commits
    pub fn new(branch: impl Into<String>, commit_count: usize) -> Self {
        MockRepository {
            branch: Some(branch.into()),
            commit_count,
            head: Oid::from_bytes(&[7; 20]).unwrap_or_else(|_| Oid::zero()),
            identity: Some(Identity::new("Mock User", "mock@example.com")),
            dirty: true,
            reject_pushes: false,
            conflict_on_merge: false,
            tags: RefCell::new(HashMap::new()),
            pushed: RefCell::new(Vec::new()),
            checkouts: RefCell::new(Vec::new()),
            merges: RefCell::new(Vec::new()),
            stashes: 0,
        }
    }

    /// Create a mock repository whose HEAD is detached
    pub fn detached(commit_count: usize) -> Self {
        let mut repo = MockRepository::new("", commit_count);
        repo.branch = None;
        repo
    }

    /// Add a tag pointing to an OID
    pub fn add_tag(&mut self, name: impl Into<String>, oid: Oid) {
        self.tags.get_mut().insert(name.into(), oid);
    }

    /// Make every push fail as if the remote refused it
    pub fn reject_pushes(mut self) -> Self {
        self.reject_pushes = true;
        self
    }

    /// Make every merge fail with a conflict
    pub fn conflict_on_merge(mut self) -> Self {
        self.conflict_on_merge = true;
        self
    }

    /// Remove the configured identity
    pub fn without_identity(mut self) -> Self {
        self.identity = None;
        self
    }

    /// `(remote, refspec)` pairs pushed so far
    pub fn pushed(&self) -> Vec<(String, String)> {
        self.pushed.borrow().clone()
    }

    /// Branches checked out so far, in order
    pub fn checkouts(&self) -> Vec<String> {
        self.checkouts.borrow().clone()
    }

    /// `(target, source)` pairs merged so far
    pub fn merges(&self) -> Vec<(String, String)> {
        self.merges.borrow().clone()
    }

    /// Names of all tags
    pub fn tag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tags.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of successful stash operations
    pub fn stash_count(&self) -> usize {
        self.stashes
    }
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.branch.clone())
    }

    fn head_commit_count(&self) -> Result<usize> {
        Ok(self.commit_count)
    }

    fn head_oid(&self) -> Result<Oid> {
        Ok(self.head)
    }

    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>> {
        Ok(self.tags.borrow().get(tag_name).copied())
    }

    fn create_annotated_tag(&self, name: &str, _message: &str, _tagger: &Identity) -> Result<Oid> {
        let mut tags = self.tags.borrow_mut();
        if tags.contains_key(name) {
            return Err(ReleaseError::TagAlreadyExists(name.to_string()));
        }
        tags.insert(name.to_string(), self.head);
        Ok(self.head)
    }

    fn push(&self, remote: &str, refspecs: &[String]) -> Result<()> {
        if self.reject_pushes {
            return Err(ReleaseError::PushRejected(format!(
                "'{}' refused {}",
                remote,
                refspecs.join(", ")
            )));
        }
        let mut pushed = self.pushed.borrow_mut();
        for spec in refspecs {
            pushed.push((remote.to_string(), spec.clone()));
        }
        Ok(())
    }

    fn stash(&mut self, _stasher: &Identity) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.dirty = false;
        self.stashes += 1;
        Ok(true)
    }

    fn checkout_branch(&self, branch: &str) -> Result<()> {
        self.checkouts.borrow_mut().push(branch.to_string());
        Ok(())
    }

    fn merge_into_head(&self, source: &str, _committer: &Identity) -> Result<MergeOutcome> {
        let target = self
            .checkouts
            .borrow()
            .last()
            .cloned()
            .or_else(|| self.branch.clone())
            .unwrap_or_default();

        if self.conflict_on_merge {
            return Err(ReleaseError::MergeConflict(format!(
                "merging '{}' into '{}'",
                source, target
            )));
        }

        self.merges.borrow_mut().push((target, source.to_string()));
        Ok(MergeOutcome::Merged(Oid::from_bytes(&[9; 20])?))
    }

    fn default_identity(&self) -> Result<Identity> {
        self.identity
            .clone()
            .ok_or_else(|| ReleaseError::missing("no committer identity configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::new("Test", "test@example.com")
    }

    #[test]
    fn test_mock_repository_basic() {
        let repo = MockRepository::new("1.2", 42);
        assert_eq!(repo.current_branch().unwrap(), Some("1.2".to_string()));
        assert_eq!(repo.head_commit_count().unwrap(), 42);
    }

    #[test]
    fn test_mock_repository_detached() {
        let repo = MockRepository::detached(3);
        assert_eq!(repo.current_branch().unwrap(), None);
    }

    #[test]
    fn test_mock_repository_tags() {
        let mut repo = MockRepository::new("1.2", 1);
        let oid = Oid::from_bytes(&[2; 20]).unwrap();

        repo.add_tag("1.1.5", oid);

        assert_eq!(repo.find_tag_oid("1.1.5").unwrap(), Some(oid));
        assert_eq!(repo.find_tag_oid("1.2.1").unwrap(), None);
    }

    #[test]
    fn test_mock_repository_duplicate_tag() {
        let repo = MockRepository::new("1.2", 1);
        repo.create_annotated_tag("1.2.1", "Release", &identity())
            .unwrap();
        let err = repo
            .create_annotated_tag("1.2.1", "Release", &identity())
            .unwrap_err();
        assert!(matches!(err, ReleaseError::TagAlreadyExists(_)));
    }

    #[test]
    fn test_mock_repository_stash_once() {
        let mut repo = MockRepository::new("1.2", 1);
        assert!(repo.stash(&identity()).unwrap());
        assert!(!repo.stash(&identity()).unwrap());
        assert_eq!(repo.stash_count(), 1);
    }

    #[test]
    fn test_mock_repository_records_merge_target() {
        let repo = MockRepository::new("1.2", 1);
        repo.checkout_branch("main").unwrap();
        repo.merge_into_head("1.2", &identity()).unwrap();
        assert_eq!(
            repo.merges(),
            vec![("main".to_string(), "1.2".to_string())]
        );
    }
}
