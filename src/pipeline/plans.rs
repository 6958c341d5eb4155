//! Release profiles.
//!
//! Each function turns the configuration into a [PipelinePlan] with absolute
//! paths under the project root. Nothing here touches the filesystem.

use super::{BuildStep, CollectPlan, PackagePlan, PipelinePlan, PublishPlan};
use crate::config::{Config, WebAppConfig};
use crate::exec::{Arg, ExternalCommand};
use crate::git::Identity;
use crate::target::{BuildTarget, TargetKind};
use std::path::{Path, PathBuf};

const NPM: &str = if cfg!(windows) { "npm.cmd" } else { "npm" };

/// Command-line overrides applied on top of the configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Framework (client) or runtime (server); the profile default when unset
    pub selector: Option<String>,
    pub push_tag: Option<bool>,
    pub merge_back: Option<bool>,
}

/// Signed mobile packages for one target framework.
pub fn client_plan(config: &Config, root: &Path, options: &PlanOptions) -> PipelinePlan {
    let client = &config.client;
    let framework = options
        .selector
        .clone()
        .unwrap_or_else(|| client.default_framework.clone());
    let target = BuildTarget::new(framework.as_str(), TargetKind::MobilePackage);
    let output = root.join(&config.paths.output_dir);
    let artifacts = root.join(&config.paths.artifacts_dir);
    let password = format!("{{env:{}}}", client.signing_password_env);

    let mut steps = vec![
        BuildStep::CreateDir(artifacts.clone()),
        BuildStep::RemoveDir(output.clone()),
    ];
    steps.extend(web_bundle(&client.web, root, root.join(&client.web.target)));

    if let Some(workload) = &client.workload {
        steps.push(BuildStep::run(
            ExternalCommand::new("dotnet")
                .args(["workload", "install", workload.as_str()])
                .current_dir(root),
        ));
    }

    steps.push(BuildStep::run(
        ExternalCommand::new("dotnet")
            .args(["publish".to_string(), path_arg(&client.project_dir)])
            .args(["-c", client.configuration.as_str()])
            .arg(Arg::secret(format!("-p:AndroidSigningKeyPass={}", password)))
            .arg(Arg::secret(format!("-p:AndroidSigningStorePass={}", password)))
            .args(["-f".to_string(), framework.clone()])
            .args(["-o".to_string(), path_arg(&output)])
            .current_dir(root),
    ));

    let pattern = target
        .artifact_pattern(&client.artifact_patterns)
        .map(str::to_string);

    PipelinePlan {
        required_env: vec![client.signing_password_env.clone()],
        label_pattern: config.repository.version_label_pattern.clone(),
        project_dir: root.join(&client.project_dir),
        project_extension: config.repository.project_extension.clone(),
        version_fields: client.version_fields.clone(),
        steps,
        collect: Some(CollectPlan {
            output_dir: output,
            pattern,
            recursive: client.recursive_scan,
            artifacts_dir: artifacts,
            policy: client.on_empty_scan,
        }),
        package: None,
        publish: client.publish.then(|| publish_plan(config, options)),
        target,
    }
}

/// Self-contained server build with the web front-end, zipped.
pub fn server_plan(config: &Config, root: &Path, options: &PlanOptions) -> PipelinePlan {
    let server = &config.server;
    let platform = options
        .selector
        .clone()
        .unwrap_or_else(|| server.default_platform.clone());
    let output = root.join(&config.paths.output_dir);

    let mut steps = vec![
        BuildStep::RemoveDir(output.clone()),
        BuildStep::run(
            ExternalCommand::new("dotnet")
                .args(["build".to_string(), path_arg(&server.project_dir)])
                .args(["-c", server.configuration.as_str()])
                .args(["-r", platform.as_str(), "--self-contained"])
                .args(["-o".to_string(), path_arg(&output.join("bin"))])
                .current_dir(root),
        ),
    ];
    steps.extend(web_bundle(&server.web, root, output.join(&server.web.target)));

    if let Some(settings) = &server.settings_file {
        let name = settings.file_name().map(PathBuf::from).unwrap_or_else(|| settings.clone());
        steps.push(BuildStep::CopyFile {
            from: root.join(settings),
            to: output.join(name),
        });
    }

    let archive = root.join(server.archive_name.replace("{platform}", &platform));

    PipelinePlan {
        target: BuildTarget::new(platform, TargetKind::ServerPackage),
        required_env: Vec::new(),
        label_pattern: config.repository.version_label_pattern.clone(),
        project_dir: root.join(&server.project_dir),
        project_extension: config.repository.project_extension.clone(),
        version_fields: server.version_fields.clone(),
        steps,
        collect: None,
        package: Some(PackagePlan {
            source: output,
            archive: path_arg(&archive),
        }),
        publish: server.publish.then(|| publish_plan(config, options)),
    }
}

/// Multi-architecture container image pushed to a registry.
pub fn image_plan(config: &Config, root: &Path, options: &PlanOptions) -> PipelinePlan {
    let image = &config.image;
    let repo = format!("{{env:{}}}", image.repo_env);

    let login = ExternalCommand::new("docker")
        .args(["login".to_string(), "-u".to_string(), format!("{{env:{}}}", image.login_env)])
        .arg(Arg::text("--password-stdin"))
        .stdin(Arg::secret(format!("{{env:{}}}", image.password_env)))
        .current_dir(root);

    let mut build = ExternalCommand::new("docker")
        .args(["buildx", "build", "--platform"])
        .args([image.platforms.join(",")])
        .args(["-f".to_string(), path_arg(&image.dockerfile)])
        .args(["-t".to_string(), format!("{}:{{version}}", repo)]);
    for tag in &image.extra_tags {
        build = build.args(["-t".to_string(), format!("{}:{}", repo, tag)]);
    }
    let build = build
        .args(["--push".to_string(), path_arg(&image.context)])
        .current_dir(root);

    PipelinePlan {
        target: BuildTarget::new("", TargetKind::ContainerImage),
        required_env: vec![
            image.repo_env.clone(),
            image.login_env.clone(),
            image.password_env.clone(),
        ],
        label_pattern: config.repository.version_label_pattern.clone(),
        project_dir: root.join(&image.project_dir),
        project_extension: config.repository.project_extension.clone(),
        version_fields: image.version_fields.clone(),
        steps: vec![BuildStep::run(login), BuildStep::run(build)],
        collect: None,
        package: None,
        publish: image.publish.then(|| publish_plan(config, options)),
    }
}

/// `npm install`, `npm run <script>`, then replace `target` with `dist/<subdir>`.
fn web_bundle(web: &WebAppConfig, root: &Path, target: PathBuf) -> Vec<BuildStep> {
    let source = root.join(&web.source);
    vec![
        BuildStep::run(ExternalCommand::new(NPM).args(["install"]).current_dir(&source)),
        BuildStep::run(
            ExternalCommand::new(NPM)
                .args(["run", web.script.as_str()])
                .current_dir(&source),
        ),
        BuildStep::RemoveDir(target.clone()),
        BuildStep::CopyDir {
            from: source.join("dist").join(&web.dist_subdir),
            to: target,
        },
    ]
}

fn publish_plan(config: &Config, options: &PlanOptions) -> PublishPlan {
    let repository = &config.repository;
    PublishPlan {
        remote: repository.remote.clone(),
        trunk: repository.trunk.clone(),
        identity: repository.identity.as_ref().map(Identity::from),
        push: options.push_tag.unwrap_or(repository.push_tag),
        merge_back: options.merge_back.unwrap_or(repository.merge_back),
        stash: repository.stash_before_merge,
        return_to_branch: repository.return_to_branch,
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_lines(plan: &PipelinePlan) -> Vec<String> {
        plan.steps
            .iter()
            .filter(|step| matches!(step, BuildStep::Run(_)))
            .map(|step| step.to_string())
            .collect()
    }

    #[test]
    fn test_client_plan_defaults() {
        let plan = client_plan(&Config::default(), Path::new("/repo"), &PlanOptions::default());

        assert_eq!(plan.target.selector(), "net9.0-android");
        assert_eq!(plan.required_env, vec!["ANDROID_SIGNING_KEY_PASSWORD".to_string()]);
        assert_eq!(plan.project_dir, PathBuf::from("/repo/Roadnik.MAUI"));
        assert!(plan.collect.as_ref().unwrap().pattern.is_some());
        assert!(plan.publish.is_some());

        let lines = run_lines(&plan);
        assert_eq!(
            lines.last().unwrap(),
            "dotnet publish Roadnik.MAUI -c Release *** *** -f net9.0-android -o /repo/output"
        );
        assert!(lines.contains(&"dotnet workload install maui".to_string()));
    }

    #[test]
    fn test_client_plan_unknown_framework_has_no_pattern() {
        let options = PlanOptions {
            selector: Some("net9.0-ios".to_string()),
            ..PlanOptions::default()
        };
        let plan = client_plan(&Config::default(), Path::new("/repo"), &options);
        assert_eq!(plan.collect.unwrap().pattern, None);
    }

    #[test]
    fn test_server_plan_packages_without_publishing() {
        let options = PlanOptions {
            selector: Some("linux-x64".to_string()),
            ..PlanOptions::default()
        };
        let plan = server_plan(&Config::default(), Path::new("/repo"), &options);

        assert!(plan.publish.is_none());
        assert!(plan.required_env.is_empty());
        assert_eq!(
            plan.package.as_ref().unwrap().archive,
            "/repo/server-linux-x64.zip"
        );
        assert!(run_lines(&plan).contains(
            &"dotnet build Roadnik -c release -r linux-x64 --self-contained -o /repo/output/bin"
                .to_string()
        ));
        assert!(plan.steps.contains(&BuildStep::CopyFile {
            from: PathBuf::from("/repo/_settings.json"),
            to: PathBuf::from("/repo/output/_settings.json"),
        }));
    }

    #[test]
    fn test_image_plan_commands() {
        let plan = image_plan(&Config::default(), Path::new("/repo"), &PlanOptions::default());
        assert_eq!(
            run_lines(&plan),
            vec![
                "docker login -u {env:DOCKER_LOGIN} --password-stdin".to_string(),
                "docker buildx build --platform linux/amd64,linux/arm64 -f Roadnik/Dockerfile -t {env:DOCKER_REPO}:{version} -t {env:DOCKER_REPO}:latest --push .".to_string(),
            ]
        );
        assert_eq!(plan.required_env.len(), 3);
    }

    #[test]
    fn test_overrides_disable_push_and_merge() {
        let options = PlanOptions {
            push_tag: Some(false),
            merge_back: Some(false),
            ..PlanOptions::default()
        };
        let publish = image_plan(&Config::default(), Path::new("/repo"), &options)
            .publish
            .unwrap();
        assert!(!publish.push);
        assert!(!publish.merge_back);
        assert_eq!(publish.trunk, "main");
    }
}
