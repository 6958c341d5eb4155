//! Git side of a release: tag, push and merge back into trunk.

use crate::error::{ReleaseError, Result};
use crate::git::{Identity, MergeOutcome, Repository};
use crate::version::ReleaseVersion;

/// Publishes a release through a [Repository].
pub struct ReleasePublisher<'a, R: Repository> {
    repo: &'a mut R,
}

impl<'a, R: Repository> ReleasePublisher<'a, R> {
    pub fn new(repo: &'a mut R) -> Self {
        ReleasePublisher { repo }
    }

    /// Tags HEAD with the release version and optionally pushes the tag.
    ///
    /// # Returns
    /// * `Ok(String)` - The tag name
    /// * `Err(TagAlreadyExists)` - If the tag exists locally
    /// * `Err(PushRejected)` - If the remote refused the tag
    pub fn publish(
        &self,
        version: &ReleaseVersion,
        remote: &str,
        identity: &Identity,
        push_tag: bool,
    ) -> Result<String> {
        let tag = version.to_string();
        let head = self.repo.head_oid()?;

        if let Some(existing) = self.repo.find_tag_oid(&tag)? {
            let location = if existing == head {
                "HEAD".to_string()
            } else {
                existing.to_string()
            };
            return Err(ReleaseError::TagAlreadyExists(format!(
                "{} (points at {})",
                tag, location
            )));
        }

        let message = format!("Release {}", version);
        self.repo.create_annotated_tag(&tag, &message, identity)?;
        log::info!("created tag {} at {}", tag, head);

        if push_tag {
            let refspec = format!("refs/tags/{0}:refs/tags/{0}", tag);
            self.repo.push(remote, &[refspec])?;
            log::info!("pushed tag {} to {}", tag, remote);
        }

        Ok(tag)
    }

    /// Stashes local changes, typically the stamped project files.
    ///
    /// Returns `false` when the working tree was clean.
    pub fn stash(&mut self, identity: &Identity) -> Result<bool> {
        let stashed = self.repo.stash(identity)?;
        if stashed {
            log::info!("stashed local changes");
        }
        Ok(stashed)
    }

    /// Merges `source` into `trunk`.
    ///
    /// Checks out `trunk`, merges, pushes trunk to `remote` when `push` is set
    /// and finally checks `source` out again when `return_to_source` is set.
    /// A conflicted merge is left in place for manual resolution.
    pub fn merge_back(
        &self,
        trunk: &str,
        source: &str,
        remote: &str,
        push: bool,
        identity: &Identity,
        return_to_source: bool,
    ) -> Result<MergeOutcome> {
        self.repo.checkout_branch(trunk)?;
        let outcome = self.repo.merge_into_head(source, identity)?;
        log::info!("merged '{}' into '{}': {}", source, trunk, outcome);

        if push {
            let refspec = format!("refs/heads/{0}:refs/heads/{0}", trunk);
            self.repo.push(remote, &[refspec])?;
            log::info!("pushed '{}' to {}", trunk, remote);
        }

        if return_to_source {
            self.repo.checkout_branch(source)?;
        }

        Ok(outcome)
    }
}
