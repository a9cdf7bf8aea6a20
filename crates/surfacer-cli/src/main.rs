//! Command-line front end for surfacer.
//!
//! Works on a captured UI hierarchy (the JSON an accessibility dump
//! produces) through the in-memory snapshot driver, so searches and alert
//! rules can be tried out without a device.
//!
//! # Usage
//!
//! ```bash
//! # Part of the table not covered by the navigation bar and keyboard
//! surfacer area screen.json list --nav-bar --keyboard
//!
//! # Custom obstruction: a toolbar pinned to the bottom
//! surfacer area screen.json list --obstruct type:Toolbar:bottom
//!
//! # Scroll a row into view, with smaller swipes
//! surfacer reveal screen.json list row-42 --nav-bar --max-swipe-y 0.5
//!
//! # Classify the alert on screen, then answer it
//! surfacer classify-alert prompt.json
//! surfacer -f json classify-alert prompt.json --respond deny
//! ```
//!
//! Exit codes: `0` on success, `1` when a search or alert lookup fails, `2`
//! for unreadable input.

mod args;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use surfacer_core::alert::{AlertError, AlertHandler, ButtonRole, ClassifiedAlert};
use surfacer_core::config::SurfacerConfig;
use surfacer_core::driver::{Element, Selector};
use surfacer_core::geometry::Rect;
use surfacer_core::obstruction::{reduce_all, DriverLookup};
use surfacer_core::scroll::{reveal, RevealReport};
use surfacer_core::snapshot::{Gesture, SnapshotDriver};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use args::{ObstructionArgs, RoleArg, TuningArgs};

/// Scroll search and alert classification over a captured UI hierarchy.
#[derive(Parser)]
#[command(name = "surfacer")]
#[command(about = "Find scrollable areas, reveal elements and classify alerts in a UI hierarchy dump")]
#[command(version)]
struct Cli {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Config file to use instead of ~/.surfacer/config.json
    #[arg(short, long, env = "SURFACER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print the part of a container left uncovered by obstructions
    Area {
        /// Hierarchy dump (JSON)
        tree: PathBuf,
        /// The scroll container, e.g. `list` or `type:Table`
        container: Selector,
        #[command(flatten)]
        obstructions: ObstructionArgs,
    },

    /// Scroll a target element into the uncovered part of a container
    Reveal {
        /// Hierarchy dump (JSON)
        tree: PathBuf,
        /// The scroll container
        container: Selector,
        /// The element to bring into view, e.g. `row-42` or `label:Privacy`
        target: Selector,
        #[command(flatten)]
        obstructions: ObstructionArgs,
        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Classify the alert on screen and optionally answer it
    ClassifyAlert {
        /// Hierarchy dump (JSON)
        tree: PathBuf,
        /// Tap the button with this role
        #[arg(short, long)]
        respond: Option<RoleArg>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[derive(Debug)]
enum CliError {
    /// Unreadable tree or config file.
    Input(String),
    /// The search or alert lookup itself failed.
    Failed(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Failed(_) => ExitCode::from(1),
            CliError::Input(_) => ExitCode::from(2),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Input(msg) => write!(f, "Invalid input: {}", msg),
            CliError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = load_config(cli.config.as_deref())?;
    debug!(?config, "config loaded");

    match &cli.command {
        Command::Area { tree, container, obstructions } => {
            area(&cli, &config, tree, container, obstructions).await
        }
        Command::Reveal { tree, container, target, obstructions, tuning } => {
            tuning.apply(&mut config);
            reveal_target(&cli, &config, tree, container, target, obstructions).await
        }
        Command::ClassifyAlert { tree, respond } => {
            classify_alert(&cli, tree, respond.map(ButtonRole::from)).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SurfacerConfig, CliError> {
    match path {
        Some(path) => SurfacerConfig::load_from(path)
            .map_err(|e| CliError::Input(format!("config {}: {}", path.display(), e))),
        None => Ok(SurfacerConfig::load()),
    }
}

fn load_tree(path: &Path) -> Result<Arc<SnapshotDriver>, CliError> {
    SnapshotDriver::from_file(path)
        .map(Arc::new)
        .map_err(|e| CliError::Input(format!("{}: {}", path.display(), e)))
}

fn format_rect(r: &Rect) -> String {
    format!("{} {} {} {}", r.min_x, r.min_y, r.max_x, r.max_y)
}

async fn area(
    cli: &Cli,
    config: &SurfacerConfig,
    tree: &Path,
    container: &Selector,
    args: &ObstructionArgs,
) -> Result<(), CliError> {
    let driver = load_tree(tree)?;
    let frame = Element::new(driver.clone(), container.clone())
        .frame()
        .await
        .map_err(|e| CliError::Failed(e.to_string()))?
        .ok_or_else(|| CliError::Failed(format!("Scroll container not found: {}", container)))?;

    let lookup = DriverLookup::new(driver, args.context(&config.app));
    let area = reduce_all(frame, &args.obstructions(), &lookup)
        .await
        .map_err(|e| CliError::Failed(e.to_string()))?;

    if cli.format == OutputFormat::Json {
        let output = serde_json::json!({
            "container": frame,
            "area": area,
            "degenerate": area.is_degenerate(),
        });
        println!("{:#}", output);
    } else {
        println!("{}", format_rect(&area));
        if !cli.quiet {
            eprintln!(
                "{}x{} of {}x{}{}",
                area.width(),
                area.height(),
                frame.width(),
                frame.height(),
                if area.is_degenerate() { " (nothing left to scroll)" } else { "" }
            );
        }
    }
    Ok(())
}

async fn reveal_target(
    cli: &Cli,
    config: &SurfacerConfig,
    tree: &Path,
    container: &Selector,
    target: &Selector,
    args: &ObstructionArgs,
) -> Result<(), CliError> {
    let driver = load_tree(tree)?;
    let lookup = DriverLookup::new(driver.clone(), args.context(&config.app));
    let result = reveal(
        &Element::new(driver.clone(), container.clone()),
        &Element::new(driver.clone(), target.clone()),
        &args.obstructions(),
        &lookup,
        &config.reveal_options(),
    )
    .await;
    let gestures = driver.gestures().await;

    match result {
        Ok(report) => {
            print_report(cli, target, &report, &gestures);
            Ok(())
        }
        Err(e) => {
            if cli.format == OutputFormat::Json {
                let output = serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    "gestures": gestures,
                });
                println!("{:#}", output);
            } else if !cli.quiet {
                print_gestures(&gestures);
            }
            Err(CliError::Failed(e.to_string()))
        }
    }
}

fn print_report(cli: &Cli, target: &Selector, report: &RevealReport, gestures: &[Gesture]) {
    if cli.format == OutputFormat::Json {
        let output = serde_json::json!({
            "success": true,
            "report": report,
            "gestures": gestures,
        });
        println!("{:#}", output);
        return;
    }
    println!("Revealed {} after {} swipe(s)", target, report.swipes);
    if !cli.quiet {
        print_gestures(gestures);
        eprintln!(
            "center ({}, {}) in {}",
            report.target_center.x,
            report.target_center.y,
            format_rect(&report.scrollable_area)
        );
    }
}

fn print_gestures(gestures: &[Gesture]) {
    for (i, gesture) in gestures.iter().enumerate() {
        if let Gesture::Swipe { start, end, scrolled, .. } = gesture {
            eprintln!(
                "swipe {}: ({:.1}, {:.1}) -> ({:.1}, {:.1}), content moved ({:.1}, {:.1})",
                i + 1,
                start.x,
                start.y,
                end.x,
                end.y,
                scrolled.dx,
                scrolled.dy
            );
        }
    }
}

async fn classify_alert(cli: &Cli, tree: &Path, respond: Option<ButtonRole>) -> Result<(), CliError> {
    let driver = load_tree(tree)?;
    let handler = AlertHandler::new(driver);

    let alert = match respond {
        Some(role) => handler.respond(role).await,
        None => handler
            .current()
            .await
            .and_then(|alert| alert.ok_or(AlertError::NoAlert)),
    }
    .map_err(|e| CliError::Failed(e.to_string()))?;

    let tapped = respond
        .and_then(|role| alert.button(role))
        .map(|b| b.label.clone());

    if cli.format == OutputFormat::Json {
        let output = serde_json::json!({
            "alert": alert,
            "tapped": tapped,
        });
        println!("{:#}", output);
    } else {
        print_alert(&alert);
        if let Some(label) = tapped {
            println!("Tapped: {}", label);
        }
    }
    Ok(())
}

fn print_alert(alert: &ClassifiedAlert) {
    println!("Kind: {}", alert.kind);
    if let Some(title) = &alert.title {
        println!("Title: {}", title);
    }
    for button in &alert.buttons {
        let role = button
            .role
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  [{}] {}", role, button.label);
    }
}
