//! Release pipeline
//!
//! A [PipelinePlan] describes one release as data: which environment values
//! it needs, which project fields to stamp, which build steps to run, where
//! to collect artifacts, what to package and how to publish. The
//! [Orchestrator] walks the plan through a fixed sequence of [Stage]s and
//! stops at the first failure, reporting the failed stage together with the
//! last one that completed. Nothing is rolled back.
//!
//! Profile presets live in [plans].

pub mod plans;
pub mod steps;

pub use plans::{client_plan, image_plan, server_plan, PlanOptions};
pub use steps::BuildStep;

use crate::artifacts::{ArtifactCollector, EmptyScanPolicy};
use crate::boundary::BoundaryWarning;
use crate::config::VersionField;
use crate::env::{Credentials, Environment};
use crate::error::{ReleaseError, Result};
use crate::exec::CommandRunner;
use crate::git::{Identity, MergeOutcome, Repository};
use crate::package::{PackageAssembler, PackageManifest};
use crate::project::ProjectVersionWriter;
use crate::publish::ReleasePublisher;
use crate::target::BuildTarget;
use crate::template::{self, RenderContext};
use crate::ui;
use crate::version::{ReleaseVersion, VersionResolver};
use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    VersionResolved,
    ProjectVersioned,
    ExternalBuildComplete,
    ArtifactsCollected,
    Packaged,
    Published,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Init => write!(f, "Pre-flight"),
            Stage::VersionResolved => write!(f, "Version"),
            Stage::ProjectVersioned => write!(f, "Project Version"),
            Stage::ExternalBuildComplete => write!(f, "Build"),
            Stage::ArtifactsCollected => write!(f, "Artifacts"),
            Stage::Packaged => write!(f, "Package"),
            Stage::Published => write!(f, "Publish"),
            Stage::Done => write!(f, "Done"),
        }
    }
}

/// Artifact collection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectPlan {
    pub output_dir: PathBuf,
    /// `None` when the target has no known artifact format; fails pre-flight
    pub pattern: Option<String>,
    pub recursive: bool,
    pub artifacts_dir: PathBuf,
    pub policy: EmptyScanPolicy,
}

/// Zip packaging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePlan {
    pub source: PathBuf,
    /// Archive path; version placeholders are expanded at run time
    pub archive: String,
}

/// Git publication settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    pub remote: String,
    pub trunk: String,
    /// Falls back to the repository identity when unset
    pub identity: Option<Identity>,
    /// Push the tag and, after merging back, trunk
    pub push: bool,
    pub merge_back: bool,
    pub stash: bool,
    pub return_to_branch: bool,
}

/// A complete release description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    pub target: BuildTarget,
    pub required_env: Vec<String>,
    pub label_pattern: String,
    pub project_dir: PathBuf,
    pub project_extension: String,
    pub version_fields: Vec<VersionField>,
    pub steps: Vec<BuildStep>,
    pub collect: Option<CollectPlan>,
    pub package: Option<PackagePlan>,
    pub publish: Option<PublishPlan>,
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub target: BuildTarget,
    pub version: ReleaseVersion,
    pub dry_run: bool,
    pub stamped: Vec<PathBuf>,
    pub commands_run: usize,
    pub artifacts: Vec<PathBuf>,
    pub package: Option<PackageManifest>,
    pub tag: Option<String>,
    pub merge: Option<MergeOutcome>,
    pub warnings: Vec<BoundaryWarning>,
}

impl PipelineReport {
    fn new(target: BuildTarget, version: ReleaseVersion, dry_run: bool) -> Self {
        PipelineReport {
            target,
            version,
            dry_run,
            stamped: Vec::new(),
            commands_run: 0,
            artifacts: Vec::new(),
            package: None,
            tag: None,
            merge: None,
            warnings: Vec::new(),
        }
    }
}

/// A run aborted at `stage`
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    /// Last stage that finished, `None` when pre-flight failed
    pub completed: Option<Stage>,
    pub error: ReleaseError,
}

impl StageFailure {
    fn at(stage: Stage, completed: Option<Stage>) -> impl FnOnce(ReleaseError) -> StageFailure {
        move |error| StageFailure {
            stage,
            completed,
            error,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.completed {
            Some(completed) => write!(
                f,
                "{} stage failed after {}: {}",
                self.stage, completed, self.error
            ),
            None => write!(f, "{} stage failed: {}", self.stage, self.error),
        }
    }
}

impl std::error::Error for StageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Everything pre-flight resolves before the first side effect
struct Prepared {
    credentials: Credentials,
    collector: Option<ArtifactCollector>,
    identity: Option<Identity>,
}

/// Runs a [PipelinePlan] against a repository and a command runner.
pub struct Orchestrator<'a, R: Repository, C: CommandRunner> {
    repo: &'a mut R,
    runner: &'a mut C,
    env: &'a Environment,
    dry_run: bool,
    progress: bool,
}

impl<'a, R: Repository, C: CommandRunner> Orchestrator<'a, R, C> {
    pub fn new(repo: &'a mut R, runner: &'a mut C, env: &'a Environment) -> Self {
        Orchestrator {
            repo,
            runner,
            env,
            dry_run: false,
            progress: false,
        }
    }

    /// Resolve the version and stop before any side effect
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Print a banner to stdout as each stage starts
    pub fn show_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Runs every stage of `plan` in order.
    ///
    /// # Returns
    /// * `Ok(PipelineReport)` - The run reached `Done` (or stopped after the
    ///   version in dry-run mode)
    /// * `Err(StageFailure)` - The first failure, with the stage it occurred in
    pub fn run(&mut self, plan: &PipelinePlan) -> std::result::Result<PipelineReport, StageFailure> {
        self.banner(Stage::Init);
        let prepared = self
            .preflight(plan)
            .map_err(StageFailure::at(Stage::Init, None))?;

        self.banner(Stage::VersionResolved);
        let version = VersionResolver::with_pattern(&*self.repo, &plan.label_pattern)
            .and_then(|resolver| resolver.resolve())
            .map_err(StageFailure::at(Stage::VersionResolved, Some(Stage::Init)))?;

        let mut report = PipelineReport::new(plan.target.clone(), version.clone(), self.dry_run);
        if self.dry_run {
            log::info!("dry run: stopping after version {}", version);
            return Ok(report);
        }

        let ctx = RenderContext::new(&version, &prepared.credentials);
        // Optional stages that a plan skips are never reported as completed.
        let mut completed = Stage::VersionResolved;

        self.banner(Stage::ProjectVersioned);
        report.stamped = stamp_project(plan, &ctx)
            .map_err(StageFailure::at(Stage::ProjectVersioned, Some(completed)))?;
        completed = Stage::ProjectVersioned;

        self.banner(Stage::ExternalBuildComplete);
        for step in &plan.steps {
            step.execute(&mut *self.runner, &ctx)
                .map_err(StageFailure::at(Stage::ExternalBuildComplete, Some(completed)))?;
            if matches!(step, BuildStep::Run(_)) {
                report.commands_run += 1;
            }
        }
        completed = Stage::ExternalBuildComplete;

        if let (Some(collect), Some(collector)) = (&plan.collect, &prepared.collector) {
            self.banner(Stage::ArtifactsCollected);
            report.artifacts = collect_artifacts(collect, collector, &version, &mut report.warnings)
                .map_err(StageFailure::at(Stage::ArtifactsCollected, Some(completed)))?;
            completed = Stage::ArtifactsCollected;
        }

        if let Some(package) = &plan.package {
            self.banner(Stage::Packaged);
            let manifest = template::render(&package.archive, &ctx)
                .and_then(|archive| PackageAssembler::new().assemble(&package.source, Path::new(&archive)))
                .map_err(StageFailure::at(Stage::Packaged, Some(completed)))?;
            report.package = Some(manifest);
            completed = Stage::Packaged;
        }

        if let (Some(publish), Some(identity)) = (&plan.publish, &prepared.identity) {
            self.banner(Stage::Published);
            self.publish(publish, identity, &version, &mut report)
                .map_err(StageFailure::at(Stage::Published, Some(completed)))?;
        }

        self.banner(Stage::Done);
        Ok(report)
    }

    /// Resolves credentials, the artifact pattern and the committer identity.
    fn preflight(&self, plan: &PipelinePlan) -> Result<Prepared> {
        let credentials = self.env.require(&plan.required_env)?;

        let collector = match &plan.collect {
            Some(collect) => {
                let pattern = collect.pattern.as_deref().ok_or_else(|| {
                    ReleaseError::config(format!(
                        "no artifact format known for '{}'",
                        plan.target.selector()
                    ))
                })?;
                Some(ArtifactCollector::new(pattern, collect.recursive)?)
            }
            None => None,
        };

        let identity = match &plan.publish {
            Some(publish) => Some(match &publish.identity {
                Some(identity) => identity.clone(),
                None => self.repo.default_identity()?,
            }),
            None => None,
        };

        log::debug!("pre-flight ok: {:?}", credentials);
        Ok(Prepared {
            credentials,
            collector,
            identity,
        })
    }

    fn publish(
        &mut self,
        publish: &PublishPlan,
        identity: &Identity,
        version: &ReleaseVersion,
        report: &mut PipelineReport,
    ) -> Result<()> {
        // Captured before merge back moves HEAD to trunk.
        let branch = self.repo.current_branch()?;
        let mut publisher = ReleasePublisher::new(&mut *self.repo);

        let tag = publisher.publish(version, &publish.remote, identity, publish.push)?;
        if !publish.push {
            report.warnings.push(BoundaryWarning::TagNotPushed {
                tag: tag.clone(),
                remote: publish.remote.clone(),
            });
        }
        report.tag = Some(tag);

        if !publish.merge_back {
            return Ok(());
        }

        let branch = branch.ok_or_else(|| {
            ReleaseError::repository("HEAD is detached; nothing to merge back")
        })?;

        if publish.stash && !publisher.stash(identity)? {
            report.warnings.push(BoundaryWarning::NothingToStash);
        }

        let outcome = publisher.merge_back(
            &publish.trunk,
            &branch,
            &publish.remote,
            publish.push,
            identity,
            publish.return_to_branch,
        )?;
        if outcome == MergeOutcome::UpToDate {
            report.warnings.push(BoundaryWarning::TrunkAlreadyUpToDate {
                trunk: publish.trunk.clone(),
                source: branch,
            });
        }
        report.merge = Some(outcome);
        Ok(())
    }

    fn banner(&self, stage: Stage) {
        if self.progress && !(self.dry_run && stage > Stage::VersionResolved) {
            ui::display_stage(stage);
        }
    }
}

fn stamp_project(plan: &PipelinePlan, ctx: &RenderContext<'_>) -> Result<Vec<PathBuf>> {
    let writer = ProjectVersionWriter::new(plan.project_extension.as_str());
    let mut stamped: Vec<PathBuf> = Vec::new();

    for field in &plan.version_fields {
        let value = template::render(&field.value, ctx)?;
        let path = writer.write_version(&plan.project_dir, &value, &field.name)?;
        if !stamped.contains(&path) {
            stamped.push(path);
        }
    }
    Ok(stamped)
}

fn collect_artifacts(
    collect: &CollectPlan,
    collector: &ArtifactCollector,
    version: &ReleaseVersion,
    warnings: &mut Vec<BoundaryWarning>,
) -> Result<Vec<PathBuf>> {
    let set = collector.collect(&collect.output_dir, version)?;
    set.check(collect.policy)?;

    if set.is_empty() {
        warnings.push(BoundaryWarning::NoArtifactsMatched {
            dir: collect.output_dir.clone(),
            pattern: collector.pattern().to_string(),
        });
        return Ok(Vec::new());
    }
    set.move_all(&collect.artifacts_dir)
}
