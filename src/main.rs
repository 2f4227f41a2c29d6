//! portal-sim - replay gesture scripts through the portal activation engine
//!
//! Prints every committed state change with its timestamp, then a summary.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portal_activation::{Commit, GestureScript, Millis, PortalConfig, PortalState, Simulation};

/// Replay a gesture script and print the resulting portal states
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gesture script (YAML, or JSON with a .json extension)
    script: PathBuf,

    /// Engine configuration file; replaces the script's own config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop the replay at this time in milliseconds
    #[arg(long)]
    until: Option<Millis>,

    /// Print commits as JSON lines
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    let script = GestureScript::load(&args.script)
        .await
        .with_context(|| format!("Failed to load script {}", args.script.display()))?;

    let config = match &args.config {
        Some(path) => PortalConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => script.config.clone().unwrap_or_default(),
    };
    info!(
        "Replaying {} ({} events, {} mode)",
        args.script.display(),
        script.events.len(),
        config.activation_mode
    );

    let sim = script.replay(config, args.until);

    if args.json {
        print_json(&sim)?;
    } else {
        print_report(&args, script.events.len(), &sim);
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

fn print_json(sim: &Simulation) -> Result<()> {
    for commit in sim.commits() {
        println!("{}", serde_json::to_string(commit)?);
    }

    let summary = serde_json::json!({
        "summary": {
            "end_ms": sim.now(),
            "commits": sim.commits().len(),
            "haptic_pulses": sim.haptics().iter().map(|(at, _)| at).collect::<Vec<_>>(),
            "final_state": sim.state(),
        }
    });
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn print_report(args: &Args, events: usize, sim: &Simulation) {
    println!(
        "\n{} {}",
        "=== Portal replay:".bold().cyan(),
        args.script.display().to_string().bold().cyan()
    );
    println!(
        "  {} mode, {} events\n",
        sim.engine().mode().to_string().yellow(),
        events.to_string().green()
    );

    for commit in sim.commits() {
        print_commit(commit, sim);
    }
    if sim.commits().is_empty() {
        println!("  {}", "(no state changes)".dimmed());
    }

    println!("\n{}", "Summary:".bold());
    println!("  Replayed to: {}ms", sim.now().to_string().green());
    println!("  Commits:     {}", sim.commits().len().to_string().green());
    println!("  Haptics:     {}", sim.haptics().len().to_string().green());
    println!("  Final:       {}", describe(&sim.state()));
    if sim.engine().is_destroyed() {
        println!("  {}", "Engine destroyed during replay".yellow());
    }
}

fn print_commit(commit: &Commit, sim: &Simulation) {
    let pulsed = sim.haptics().iter().any(|(at, _)| *at == commit.at_ms);
    println!(
        "  {:>7}ms  {}  visibility {:.2}  progress {:.2}{}",
        commit.at_ms,
        describe(&commit.state),
        commit.state.visibility,
        commit.state.activation_progress,
        if pulsed { "  (haptic)".magenta().to_string() } else { String::new() }
    );
}

fn describe(state: &PortalState) -> ColoredString {
    match (state.is_active, state.is_fully_activated) {
        (false, _) => format!("{:<13}", "idle").dimmed(),
        (true, true) => format!("{:<13}", "active").green().bold(),
        (true, false) => format!("{:<13}", "transitioning").yellow(),
    }
}
