//! Runs the simulator once and prints its events until it stops.
//!
//! ```text
//! cargo run --example monitor -- --project-root /opt/sls --mission-time t-60 --verbose
//! RUST_LOG=debug cargo run --example monitor -- --executable /bin/sh --arg ./fake_sim.sh --json
//! ```
//!
//! Ctrl-C (or SIGTERM) stops the run gracefully.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use simvisor::{
    Config, LogPattern, MissionState, MissionTime, Monitor, RunParameters, Subscribe,
};

#[derive(Parser, Debug)]
#[command(name = "monitor", about = "Supervise a simulation run and stream its telemetry")]
struct Cli {
    /// Simulator executable.
    #[arg(long, env = "SIMVISOR_EXECUTABLE", default_value = "./bin/space_launch_sim")]
    executable: PathBuf,

    /// Extra argument passed before the run flags (repeatable).
    #[arg(long = "arg")]
    args: Vec<String>,

    /// Working directory of the simulator.
    #[arg(long, env = "SIMVISOR_PROJECT_ROOT", default_value = ".")]
    project_root: PathBuf,

    /// Log directory, relative to the project root unless absolute.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Glob for timestamped log files (e.g. `space_launch_*.log`) instead of the fixed name.
    #[arg(long)]
    glob: Option<String>,

    /// `auto` or `t-<seconds>`.
    #[arg(short, long, default_value = "auto")]
    mission_time: MissionTime,

    /// Ask the simulator for verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    #[arg(long, default_value_t = 5)]
    grace_secs: u64,

    /// Also print raw log lines.
    #[arg(long)]
    raw: bool,

    /// Print every event as one JSON object per line on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!(label = e.as_label(), "{}", e.as_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), simvisor::RuntimeError> {
    let cfg = Config {
        executable: cli.executable,
        base_args: cli.args,
        project_root: cli.project_root,
        log_dir: cli.log_dir,
        log_pattern: match cli.glob {
            Some(glob) => LogPattern::Glob(glob),
            None => LogPattern::default(),
        },
        poll_interval: Duration::from_millis(cli.poll_ms),
        grace: Duration::from_secs(cli.grace_secs),
        ..Config::default()
    };

    let state = Arc::new(MissionState::new());
    let mut subs: Vec<Arc<dyn Subscribe>> = vec![state.clone()];
    if !cli.json {
        let writer = simvisor::LogWriter::new();
        subs.push(Arc::new(if cli.raw { writer.with_raw_lines() } else { writer }));
    }

    let monitor = Monitor::builder(cfg).with_subscribers(subs).build()?;
    let signals = monitor.stop_on_shutdown_signal();
    let mut feed = monitor.subscribe();

    let run = monitor
        .start_run(RunParameters {
            mission_time: cli.mission_time,
            verbose: cli.verbose,
        })
        .await?;
    info!(run, "monitoring");

    while let Some(ev) = feed.recv().await {
        if cli.json {
            match serde_json::to_string(ev.as_ref()) {
                Ok(line) => println!("{line}"),
                Err(e) => error!(error = %e, "event not serializable"),
            }
        }
        if ev.is_supervisor_stopped() && ev.run == Some(run) {
            break;
        }
    }
    if feed.dropped() > 0 {
        info!(dropped = feed.dropped(), "feed lagged during the run");
    }

    monitor.shutdown().await;
    signals.abort();
    let snap = state.snapshot().await;
    info!(
        phase = %snap.phase,
        altitude = ?snap.altitude,
        velocity = ?snap.velocity,
        fuel = ?snap.fuel_remaining,
        lines = snap.lines,
        regressions = snap.regressions,
        "final state"
    );
    Ok(())
}
