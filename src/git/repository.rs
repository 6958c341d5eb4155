use crate::error::{ReleaseError, Result};
use crate::git::{Identity, MergeOutcome};
use git2::build::CheckoutBuilder;
use git2::{BranchType, ErrorCode, Oid, Repository as Git2Repo, Signature, StashFlags};
use std::cell::RefCell;
use std::path::Path;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path.as_ref()).map_err(|e| {
            ReleaseError::repository(format!(
                "Not in a git repository ({}): {}",
                path.as_ref().display(),
                e.message()
            ))
        })?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn signature(identity: &Identity) -> Result<Signature<'static>> {
        Ok(Signature::now(&identity.name, &identity.email)?)
    }

    fn conflicted_paths(index: &git2::Index) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
            if let Some(entry) = entry {
                paths.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}

/// Credentials callback shared by push operations.
///
/// Tries SSH keys from ~/.ssh, then the SSH agent, then the configured
/// credential helper, then default credentials.
fn remote_callbacks<'a>(config: Option<git2::Config>) -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        if allowed_types.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
            if let Some(config) = config.as_ref() {
                if let Ok(cred) = git2::Cred::credential_helper(config, url, username_from_url) {
                    return Ok(cred);
                }
            }
        }

        git2::Cred::default()
    });
    callbacks
}

impl super::Repository for Git2Repository {
    fn current_branch(&self) -> Result<Option<String>> {
        if self.repo.head_detached()? {
            return Ok(None);
        }

        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                return Err(ReleaseError::version("HEAD points to an unborn branch"))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(head.shorthand().map(|s| s.to_string()))
    }

    fn head_commit_count(&self) -> Result<usize> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;

        let mut count = 0;
        for oid in revwalk {
            oid?;
            count += 1;
        }
        Ok(count)
    }

    fn head_oid(&self) -> Result<Oid> {
        let head = self.repo.head()?;
        let oid = head
            .target()
            .ok_or_else(|| ReleaseError::repository("HEAD has no target"))?;
        Ok(oid)
    }

    fn find_tag_oid(&self, tag_name: &str) -> Result<Option<Oid>> {
        let reference_name = format!("refs/tags/{}", tag_name);

        match self.repo.find_reference(&reference_name) {
            Ok(reference) => {
                let oid = reference.peel(git2::ObjectType::Commit)?.id();
                Ok(Some(oid))
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create_annotated_tag(&self, name: &str, message: &str, tagger: &Identity) -> Result<Oid> {
        let head = self.repo.head()?.peel_to_commit()?;
        let signature = Self::signature(tagger)?;

        match self
            .repo
            .tag(name, head.as_object(), &signature, message, false)
        {
            Ok(oid) => Ok(oid),
            Err(e) if e.code() == ErrorCode::Exists => {
                Err(ReleaseError::TagAlreadyExists(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn push(&self, remote_name: &str, refspecs: &[String]) -> Result<()> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|_| {
            ReleaseError::PushRejected(format!("No remote named '{}' found", remote_name))
        })?;

        let rejected: RefCell<Vec<String>> = RefCell::new(Vec::new());

        let mut callbacks = remote_callbacks(self.repo.config().ok());
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                rejected
                    .borrow_mut()
                    .push(format!("{} ({})", refname, status));
            }
            Ok(())
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let specs: Vec<&str> = refspecs.iter().map(|s| s.as_str()).collect();
        log::debug!("pushing {:?} to '{}'", specs, remote_name);

        if let Err(e) = remote.push(&specs, Some(&mut push_options)) {
            let reason = if e.class() == git2::ErrorClass::Net {
                format!("network error pushing to '{}': {}", remote_name, e.message())
            } else {
                format!("push to '{}' failed: {}", remote_name, e.message())
            };
            return Err(ReleaseError::PushRejected(reason));
        }

        drop(push_options);
        let rejected = rejected.into_inner();
        if !rejected.is_empty() {
            return Err(ReleaseError::PushRejected(format!(
                "'{}' refused {}",
                remote_name,
                rejected.join(", ")
            )));
        }

        Ok(())
    }

    fn stash(&mut self, stasher: &Identity) -> Result<bool> {
        let signature = Self::signature(stasher)?;

        match self.repo.stash_save(
            &signature,
            "roadnik-release: version stamp",
            Some(StashFlags::DEFAULT),
        ) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn checkout_branch(&self, branch: &str) -> Result<()> {
        let refname = format!("refs/heads/{}", branch);
        let target = self.repo.revparse_single(&refname).map_err(|e| {
            ReleaseError::repository(format!("Cannot find branch '{}': {}", branch, e.message()))
        })?;

        self.repo
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
            .map_err(|e| {
                ReleaseError::repository(format!(
                    "Cannot check out '{}': {}",
                    branch,
                    e.message()
                ))
            })?;
        self.repo.set_head(&refname)?;
        Ok(())
    }

    fn merge_into_head(&self, source: &str, committer: &Identity) -> Result<MergeOutcome> {
        let source_branch = self
            .repo
            .find_branch(source, BranchType::Local)
            .map_err(|e| {
                ReleaseError::repository(format!(
                    "Cannot find branch '{}': {}",
                    source,
                    e.message()
                ))
            })?;
        let annotated = self
            .repo
            .reference_to_annotated_commit(source_branch.get())?;

        let (analysis, _) = self.repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::UpToDate);
        }

        if analysis.is_fast_forward() {
            let target = annotated.id();
            let commit = self.repo.find_commit(target)?;

            // Working tree first, so a refused checkout leaves trunk where it was.
            self.repo
                .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))
                .map_err(|e| match e.code() {
                    ErrorCode::Conflict => ReleaseError::MergeConflict(format!(
                        "local changes would be overwritten by fast-forward to '{}': {}",
                        source,
                        e.message()
                    )),
                    _ => e.into(),
                })?;

            let mut head = self.repo.head()?;
            head.set_target(target, &format!("fast-forward to {}", source))?;
            return Ok(MergeOutcome::FastForward(target));
        }

        self.repo
            .merge(&[&annotated], None, Some(CheckoutBuilder::new().safe()))?;

        let mut index = self.repo.index()?;
        if index.has_conflicts() {
            let paths = Self::conflicted_paths(&index)?;
            return Err(ReleaseError::MergeConflict(format!(
                "merging '{}' left conflicts in: {}",
                source,
                paths.join(", ")
            )));
        }

        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;
        let head_commit = self.repo.head()?.peel_to_commit()?;
        let source_commit = self.repo.find_commit(annotated.id())?;
        let target_name = self
            .repo
            .head()?
            .shorthand()
            .unwrap_or("HEAD")
            .to_string();

        let signature = Self::signature(committer)?;
        let message = format!("Merge branch '{}' into {}", source, target_name);
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&head_commit, &source_commit],
        )?;
        self.repo.cleanup_state()?;

        Ok(MergeOutcome::Merged(oid))
    }

    fn default_identity(&self) -> Result<Identity> {
        let signature = self.repo.signature().map_err(|e| {
            ReleaseError::missing(format!(
                "no committer identity configured (user.name/user.email): {}",
                e.message()
            ))
        })?;

        Ok(Identity::new(
            signature.name().unwrap_or_default(),
            signature.email().unwrap_or_default(),
        ))
    }
}
