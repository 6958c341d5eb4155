// tests/common/mod.rs
#![allow(dead_code)]

use git2::{Oid, Repository, RepositoryInitOptions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Repository with `main` as initial branch and a configured identity
pub fn init_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir.path(), &opts).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
    }
    (dir, repo)
}

/// Writes `name` in the working tree and commits it on HEAD
pub fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    let path = workdir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = repo.signature().unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap()
}

/// Creates `name` at HEAD and switches to it
pub fn create_branch(repo: &Repository, name: &str) {
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch(name, &head, false).unwrap();
    switch_branch(repo, name);
}

/// Points HEAD at an existing branch and updates the working tree
pub fn switch_branch(repo: &Repository, name: &str) {
    let refname = format!("refs/heads/{}", name);
    let target = repo.revparse_single(&refname).unwrap();
    repo.checkout_tree(&target, Some(git2::build::CheckoutBuilder::new().force()))
        .unwrap();
    repo.set_head(&refname).unwrap();
}

/// Bare repository registered as `origin`
pub fn add_bare_remote(repo: &Repository) -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let bare = Repository::init_bare(dir.path()).unwrap();
    repo.remote("origin", dir.path().to_str().unwrap()).unwrap();
    (dir, bare)
}

pub const CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <ApplicationDisplayVersion>1.0</ApplicationDisplayVersion>
    <ApplicationVersion>1</ApplicationVersion>
    <Version>1.0.0</Version>
  </PropertyGroup>
</Project>
"#;
