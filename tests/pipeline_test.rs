// tests/pipeline_test.rs
mod common;

use common::{add_bare_remote, commit_file, create_branch, init_repo, CSPROJ};
use roadnik_release::config::Config;
use roadnik_release::env::Environment;
use roadnik_release::exec::{RecordingRunner, ResolvedCommand};
use roadnik_release::git::{Git2Repository, MockRepository, Repository};
use roadnik_release::pipeline::{
    client_plan, image_plan, server_plan, Orchestrator, PlanOptions, Stage,
};
use roadnik_release::ReleaseError;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Simulates what npm and dotnet leave on disk
fn fake_tools(cmd: &ResolvedCommand) -> std::io::Result<()> {
    let first = cmd.args.first().map(String::as_str);
    match (cmd.program.as_str(), first) {
        (program, Some("run")) if program.starts_with("npm") => {
            let dist = cmd.cwd.clone().unwrap_or_default().join("dist").join("room");
            fs::create_dir_all(&dist)?;
            fs::write(dist.join("index.html"), "<html/>")
        }
        ("dotnet", Some("publish")) | ("dotnet", Some("build")) => {
            let position = cmd.args.iter().position(|a| a == "-o").unwrap_or(0);
            let output = PathBuf::from(&cmd.args[position + 1]);
            fs::create_dir_all(&output)?;
            if first == Some("publish") {
                fs::write(output.join("com.roadnik.app-Signed.apk"), "apk")?;
                fs::write(output.join("com.roadnik.app-Signed.aab"), "aab")?;
                fs::write(output.join("com.roadnik.app.apk"), "unsigned")?;
            } else {
                fs::write(output.join("Roadnik"), "server")?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn write_project(root: &Path, dir: &str) {
    fs::create_dir_all(root.join(dir)).unwrap();
    fs::write(root.join(dir).join(format!("{}.csproj", dir)), CSPROJ).unwrap();
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_client_release_end_to_end() {
    let root = TempDir::new().unwrap();
    write_project(root.path(), "Roadnik.MAUI");

    let mut repo = MockRepository::new("1.2", 345);
    let mut runner = RecordingRunner::new().with_effect(fake_tools);
    let env = Environment::from_pairs([("ANDROID_SIGNING_KEY_PASSWORD", "s3cret")]);
    let plan = client_plan(&Config::default(), root.path(), &PlanOptions::default());

    let report = Orchestrator::new(&mut repo, &mut runner, &env)
        .run(&plan)
        .unwrap();

    assert_eq!(report.version.to_string(), "1.2.345");
    assert_eq!(
        file_names(&root.path().join("artifacts")),
        vec![
            "com.roadnik.app-1.2.345.aab".to_string(),
            "com.roadnik.app-1.2.345.apk".to_string(),
        ]
    );
    assert!(root.path().join("output/com.roadnik.app.apk").exists());

    let csproj = fs::read_to_string(root.path().join("Roadnik.MAUI/Roadnik.MAUI.csproj")).unwrap();
    assert!(csproj.contains("<ApplicationDisplayVersion>1.2.345</ApplicationDisplayVersion>"));
    assert!(csproj.contains("<ApplicationVersion>345</ApplicationVersion>"));

    assert!(root
        .path()
        .join("Roadnik.MAUI/Resources/Raw/webApp/index.html")
        .is_file());

    let lines = runner.command_lines();
    assert!(lines.iter().all(|l| !l.contains("s3cret")), "{:?}", lines);
    let publish = runner
        .commands()
        .iter()
        .find(|c| c.args.first().map(String::as_str) == Some("publish"))
        .unwrap();
    assert!(publish
        .args
        .contains(&"-p:AndroidSigningKeyPass=s3cret".to_string()));

    assert_eq!(report.tag.as_deref(), Some("1.2.345"));
    assert_eq!(repo.tag_names(), vec!["1.2.345".to_string()]);
    assert_eq!(repo.stash_count(), 1);
    assert_eq!(repo.merges(), vec![("main".to_string(), "1.2".to_string())]);
    assert_eq!(repo.checkouts().last().map(String::as_str), Some("1.2"));
}

#[test]
fn test_missing_signing_password_stops_before_side_effects() {
    let root = TempDir::new().unwrap();
    write_project(root.path(), "Roadnik.MAUI");

    let mut repo = MockRepository::new("1.2", 345);
    let mut runner = RecordingRunner::new().with_effect(fake_tools);
    let env = Environment::from_pairs([("ANDROID_SIGNING_KEY_PASSWORD", "")]);
    let plan = client_plan(&Config::default(), root.path(), &PlanOptions::default());

    let failure = Orchestrator::new(&mut repo, &mut runner, &env)
        .run(&plan)
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Init);
    assert!(matches!(failure.error, ReleaseError::MissingConfiguration(_)));
    assert!(runner.commands().is_empty());
    assert!(repo.tag_names().is_empty());
    assert!(!root.path().join("artifacts").exists());
    assert_eq!(
        fs::read_to_string(root.path().join("Roadnik.MAUI/Roadnik.MAUI.csproj")).unwrap(),
        CSPROJ
    );
}

#[test]
fn test_unsupported_framework_fails_preflight() {
    let root = TempDir::new().unwrap();
    let mut repo = MockRepository::new("1.2", 1);
    let mut runner = RecordingRunner::new();
    let env = Environment::from_pairs([("ANDROID_SIGNING_KEY_PASSWORD", "pw")]);
    let options = PlanOptions {
        selector: Some("net9.0-windows10.0.19041.0".to_string()),
        ..PlanOptions::default()
    };
    let plan = client_plan(&Config::default(), root.path(), &options);

    let failure = Orchestrator::new(&mut repo, &mut runner, &env)
        .run(&plan)
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Init);
    assert!(failure.error.to_string().contains("net9.0-windows10.0.19041.0"));
    assert!(runner.commands().is_empty());
}

#[test]
fn test_no_signed_output_fails_collection() {
    let root = TempDir::new().unwrap();
    write_project(root.path(), "Roadnik.MAUI");

    let mut repo = MockRepository::new("1.2", 2);
    // Nothing is produced by the fake publisher
    let mut runner = RecordingRunner::new().with_effect(|cmd: &ResolvedCommand| {
        if cmd.args.first().map(String::as_str) == Some("run") {
            let dist = cmd.cwd.clone().unwrap_or_default().join("dist/room");
            fs::create_dir_all(dist)?;
        }
        if cmd.args.first().map(String::as_str) == Some("publish") {
            let position = cmd.args.iter().position(|a| a == "-o").unwrap_or(0);
            fs::create_dir_all(&cmd.args[position + 1])?;
        }
        Ok(())
    });
    let env = Environment::from_pairs([("ANDROID_SIGNING_KEY_PASSWORD", "pw")]);
    let plan = client_plan(&Config::default(), root.path(), &PlanOptions::default());

    let failure = Orchestrator::new(&mut repo, &mut runner, &env)
        .run(&plan)
        .unwrap_err();

    assert_eq!(failure.stage, Stage::ArtifactsCollected);
    assert_eq!(failure.completed, Some(Stage::ExternalBuildComplete));
    assert!(matches!(failure.error, ReleaseError::PatternMatchFailure(_)));
    assert!(repo.tag_names().is_empty());
}

#[test]
fn test_server_package_contents() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("_settings.json"), "{}").unwrap();

    let mut repo = MockRepository::new("1.2", 9);
    let mut runner = RecordingRunner::new().with_effect(fake_tools);
    let env = Environment::default();
    let plan = server_plan(&Config::default(), root.path(), &PlanOptions::default());

    let report = Orchestrator::new(&mut repo, &mut runner, &env)
        .run(&plan)
        .unwrap();

    let archive_path = root.path().join("server-win-x64.zip");
    let manifest = report.package.unwrap();
    assert_eq!(manifest.archive, archive_path);

    let mut archive = zip::ZipArchive::new(fs::File::open(&archive_path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "_settings.json".to_string(),
            "bin/Roadnik".to_string(),
            "www/index.html".to_string(),
        ]
    );

    let mut settings = String::new();
    archive
        .by_name("_settings.json")
        .unwrap()
        .read_to_string(&mut settings)
        .unwrap();
    assert_eq!(settings, "{}");

    // Copied, not moved
    assert!(root.path().join("_settings.json").exists());
    // Server releases are not tagged by default
    assert!(report.tag.is_none());
    assert!(repo.tag_names().is_empty());
}

#[test]
fn test_image_release_failure_propagates_tool_code() {
    let root = TempDir::new().unwrap();
    write_project(root.path(), "Roadnik");

    let mut repo = MockRepository::new("1.2", 5);
    let mut runner = RecordingRunner::new().failing("docker", 125);
    let env = Environment::from_pairs([
        ("DOCKER_REPO", "casualshammy/roadnik"),
        ("DOCKER_LOGIN", "casualshammy"),
        ("DOCKER_PASSWORD", "hunter2"),
    ]);
    let plan = image_plan(&Config::default(), root.path(), &PlanOptions::default());

    let failure = Orchestrator::new(&mut repo, &mut runner, &env)
        .run(&plan)
        .unwrap_err();

    assert_eq!(failure.stage, Stage::ExternalBuildComplete);
    assert_eq!(failure.completed, Some(Stage::ProjectVersioned));
    assert_eq!(failure.exit_code(), 125);
    assert_eq!(
        runner.command_lines(),
        vec!["docker login -u casualshammy --password-stdin".to_string()]
    );
    assert_eq!(runner.commands()[0].stdin.as_deref(), Some("hunter2"));
    assert!(repo.tag_names().is_empty());
}

#[test]
fn test_image_release_against_real_repository() {
    let (dir, raw) = init_repo();
    commit_file(&raw, "Roadnik/Roadnik.csproj", CSPROJ, "project");
    create_branch(&raw, "1.2");
    commit_file(&raw, "README.md", "roadnik", "docs");
    let (_remote_dir, bare) = add_bare_remote(&raw);

    let mut repo = Git2Repository::from_git2(raw);
    let mut runner = RecordingRunner::new();
    let env = Environment::from_pairs([
        ("DOCKER_REPO", "casualshammy/roadnik"),
        ("DOCKER_LOGIN", "casualshammy"),
        ("DOCKER_PASSWORD", "hunter2"),
    ]);
    let plan = image_plan(&Config::default(), dir.path(), &PlanOptions::default());

    let report = Orchestrator::new(&mut repo, &mut runner, &env)
        .run(&plan)
        .unwrap();

    assert_eq!(report.version.to_string(), "1.2.2");
    assert_eq!(
        runner.command_lines()[1],
        "docker buildx build --platform linux/amd64,linux/arm64 -f Roadnik/Dockerfile \
         -t casualshammy/roadnik:1.2.2 -t casualshammy/roadnik:latest --push ."
    );

    assert!(bare.find_reference("refs/tags/1.2.2").is_ok());
    let release_head = repo.head_oid().unwrap();
    assert_eq!(
        bare.find_reference("refs/heads/main").unwrap().target(),
        Some(release_head)
    );
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("1.2"));

    // The stamped project file was stashed before switching branches.
    let csproj = fs::read_to_string(dir.path().join("Roadnik/Roadnik.csproj")).unwrap();
    assert_eq!(csproj, CSPROJ);
}
