//! Quill command-line front end.
//!
//! Resolves a request to a skill package, asks whatever the project config
//! leaves open, and prints the loaded context.
//!
//! Usage:
//!   quill activate scaffold a new project --project ./app
//!   quill activate write tests --answer language=rust --no-input --format json
//!   quill list
//!   quill check --project ./app

#![deny(unsafe_code)]

mod prompt;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quill_settings::QuillSettings;
use quill_skills::engine::{Activation, ActivationEngine};
use quill_skills::SkillRegistry;
use tracing::debug;

use crate::prompt::PresetAnswers;

/// Exit code when a question is outstanding and prompting is disabled.
const EXIT_PENDING: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "quill", about = "Resolve a request to a skill package and load its context")]
struct Cli {
    /// Settings file (defaults to ~/.quill/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one activation session
    Activate(ActivateArgs),
    /// List registered packages
    List {
        /// Project root (defaults to the working directory)
        #[arg(long)]
        project: Option<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Scan packages and report every load error
    Check {
        /// Project root (defaults to the working directory)
        #[arg(long)]
        project: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct ActivateArgs {
    /// The request, in the user's words
    #[arg(required = true, num_args = 1..)]
    utterance: Vec<String>,

    /// Project root (defaults to the working directory)
    #[arg(long)]
    project: Option<PathBuf>,

    /// Pre-supplied answer as `axis=value` (or `package=name`); repeatable
    #[arg(long = "answer", value_parser = prompt::parse_answer)]
    answers: Vec<(String, String)>,

    /// Never prompt; exit with code 2 if a question is left
    #[arg(long)]
    no_input: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Context)]
    format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// `<skills>` context block
    Context,
    /// Full activation result as JSON
    Json,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings = match &cli.settings {
        Some(path) => {
            quill_settings::init_settings(quill_settings::load_settings_from_path(path)?);
            quill_settings::get_settings()
        }
        None => quill_settings::get_settings(),
    };

    let level = if cli.verbose { "debug" } else { settings.logging.level.as_str() };
    quill_core::logging::init_subscriber(level, settings.logging.json);

    match cli.command {
        Command::Activate(args) => activate(args, &settings),
        Command::List { project, json } => list(project, json, &settings),
        Command::Check { project } => check(project, &settings),
    }
}

fn project_root(project: Option<PathBuf>) -> Result<PathBuf> {
    match project {
        Some(dir) => {
            anyhow::ensure!(dir.is_dir(), "project root {} is not a directory", dir.display());
            Ok(dir)
        }
        None => std::env::current_dir().context("failed to read working directory"),
    }
}

fn activate(args: ActivateArgs, settings: &QuillSettings) -> Result<ExitCode> {
    let root = project_root(args.project)?;
    let engine = ActivationEngine::from_settings(&root, settings);
    debug!(project = %root.display(), packages = engine.registry().len(), "engine ready");
    let utterance = args.utterance.join(" ");
    let mut preset = PresetAnswers::new(args.answers);

    let mut activation = engine.activate(&utterance)?;
    loop {
        let pending = match activation {
            Activation::Loaded(ref bundle) => {
                match args.format {
                    Format::Context => println!("{}", bundle.render()),
                    Format::Json => println!("{}", serde_json::to_string_pretty(&activation)?),
                }
                return Ok(ExitCode::SUCCESS);
            }
            Activation::Pending(ref pending) => pending,
        };

        let answer = match preset.take(&pending.question) {
            Some(answer) => answer,
            None if args.no_input => {
                match args.format {
                    Format::Context => eprint!("{}", prompt::format_question(&pending.question)),
                    Format::Json => println!("{}", serde_json::to_string_pretty(&activation)?),
                }
                return Ok(ExitCode::from(EXIT_PENDING));
            }
            None => match prompt::ask(&pending.question)? {
                Some(answer) => answer,
                None => {
                    let _ = engine.cancel(&pending.session);
                    anyhow::bail!("no answer given; session cancelled");
                }
            },
        };
        let session = pending.session.clone();
        activation = engine.resume(&session, &answer)?;
    }
}

fn list(project: Option<PathBuf>, json: bool, settings: &QuillSettings) -> Result<ExitCode> {
    let registry = load_registry(project, settings)?;
    let infos = registry.list(None);

    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(ExitCode::SUCCESS);
    }
    if infos.is_empty() {
        println!("no packages found");
        return Ok(ExitCode::SUCCESS);
    }
    for info in &infos {
        let axes: Vec<String> = info
            .axes
            .iter()
            .map(|a| format!("{}({})", a.name, a.values.join("|")))
            .collect();
        println!(
            "{:<24} {:<8} {}",
            info.name,
            info.source.to_string(),
            if axes.is_empty() { "-".to_string() } else { axes.join(" ") }
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn check(project: Option<PathBuf>, settings: &QuillSettings) -> Result<ExitCode> {
    let registry = load_registry(project, settings)?;
    let errors = registry.errors();

    for err in errors {
        let severity = if err.recoverable { "warning" } else { "error" };
        println!("{severity}: {}: {}", err.path, err.message);
    }
    println!("{} packages loaded, {} problems", registry.len(), errors.len());

    Ok(if errors.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn load_registry(project: Option<PathBuf>, settings: &QuillSettings) -> Result<SkillRegistry> {
    let root = project_root(project)?;
    Ok(SkillRegistry::load(Some(root.as_path()), &settings.skills))
}
