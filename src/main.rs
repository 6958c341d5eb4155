use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use roadnik_release::config::{self, Config};
use roadnik_release::env::Environment;
use roadnik_release::exec::SystemRunner;
use roadnik_release::git::Git2Repository;
use roadnik_release::pipeline::{self, Orchestrator, PipelinePlan, PlanOptions};
use roadnik_release::ui;

#[derive(clap::Parser)]
#[command(
    name = "roadnik-release",
    version,
    about = "Build, package and publish Roadnik releases"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, default_value = ".", help = "Repository root to release from")]
    root: PathBuf,

    #[arg(long, help = "Resolve the version and print the plan without making changes")]
    dry_run: bool,

    #[arg(long, help = "Create the release tag locally only")]
    no_push_tag: bool,

    #[arg(long, help = "Do not merge the release branch back into trunk")]
    no_merge_back: bool,

    #[command(subcommand)]
    profile: Profile,
}

#[derive(Subcommand)]
enum Profile {
    /// Signed mobile packages
    Client {
        #[arg(long, help = "Target framework (default from config: net9.0-android)")]
        framework: Option<String>,
    },
    /// Self-contained server zip
    Server {
        #[arg(long, help = "Target runtime (default from config: win-x64)")]
        platform: Option<String>,
    },
    /// Multi-architecture container image
    Image,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("cannot access {}", args.root.display()))?;
    let config = config::load_config(args.config.as_deref(), &root)?;
    let plan = build_plan(&args, &config, &root);

    let env = Environment::from_process();
    let mut repo = Git2Repository::open(&root)?;
    let mut runner = SystemRunner::new();

    ui::display_status(&format!("Releasing {}", plan.target));

    let result = Orchestrator::new(&mut repo, &mut runner, &env)
        .dry_run(args.dry_run)
        .show_progress(!args.dry_run)
        .run(&plan);

    let report = match result {
        Ok(report) => report,
        Err(failure) => {
            ui::display_failure(&failure);
            return Ok(exit_code(failure.exit_code()));
        }
    };

    if report.dry_run {
        ui::display_plan(&plan, &report.version);
        return Ok(ExitCode::SUCCESS);
    }

    ui::display_report(&report);
    if let (Some(tag), Some(publish)) = (&report.tag, &plan.publish) {
        if !publish.push {
            ui::display_manual_push_instruction(tag, &publish.remote);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn build_plan(args: &Args, config: &Config, root: &Path) -> PipelinePlan {
    let mut options = PlanOptions {
        selector: None,
        push_tag: args.no_push_tag.then_some(false),
        merge_back: args.no_merge_back.then_some(false),
    };

    match &args.profile {
        Profile::Client { framework } => {
            options.selector = framework.clone();
            pipeline::client_plan(config, root, &options)
        }
        Profile::Server { platform } => {
            options.selector = platform.clone();
            pipeline::server_plan(config, root, &options)
        }
        Profile::Image => pipeline::image_plan(config, root, &options),
    }
}

/// Process exit codes are a byte wide; tool codes outside 1..=255 become 1.
fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) if code != 0 => ExitCode::from(code),
        _ => ExitCode::FAILURE,
    }
}

