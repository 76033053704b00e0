use anyhow::{Context, Result};
use clap::Parser;
use mitosis_core::init_logging;
use mitosis_lib::app::{ShutdownManager, Simulation};
use mitosis_lib::model::config::SimConfig;
use mitosis_lib::model::summary::LmStudioSummarizer;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path; written with defaults when missing
    #[arg(short, long, default_value = "mitosis.toml")]
    config: PathBuf,

    /// Initial food units (overrides the config)
    #[arg(short, long)]
    food: Option<u64>,

    /// Initial asexual cells (overrides the config)
    #[arg(long)]
    asexual: Option<usize>,

    /// Initial sexual cells (overrides the config)
    #[arg(long)]
    sexual: Option<usize>,

    /// Speed preset: fast, normal or slow
    #[arg(short, long)]
    speed: Option<String>,

    /// Seconds to run before killing the population
    #[arg(short, long, default_value_t = 30)]
    duration: u64,

    /// Seconds between status lines
    #[arg(long, default_value_t = 5)]
    report_every: u64,

    /// Print a digest of the last N runs at exit
    #[arg(long)]
    summary: Option<usize>,

    /// Ask the configured LM Studio server for the digest
    #[arg(long)]
    llm: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("info");
    let args = Args::parse();

    let mut config = SimConfig::load_or_init(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(n) = args.asexual {
        config.population.initial_asexual = n;
    }
    if let Some(n) = args.sexual {
        config.population.initial_sexual = n;
    }
    config.validate()?;

    let mut simulation = Simulation::new(config.clone());
    if args.llm {
        simulation =
            simulation.with_summarizer(Box::new(LmStudioSummarizer::new(&config.summary)));
    }

    let shutdown = ShutdownManager::new();
    shutdown.install_ctrl_c_handler();

    simulation.start(args.food);
    if let Some(label) = &args.speed {
        let speed = simulation.set_speed(label)?;
        tracing::info!(?speed, "Speed set");
    }

    let deadline = tokio::time::sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);
    let mut report = tokio::time::interval(Duration::from_secs(args.report_every.max(1)));

    loop {
        tokio::select! {
            _ = &mut deadline => {
                tracing::info!("Run duration reached");
                break;
            }
            _ = shutdown.requested() => break,
            _ = report.tick() => {
                let status = simulation.status();
                tracing::info!(
                    tick = status.tick,
                    alive = status.alive_count,
                    food = status.available_food,
                    divisions = status.divisions,
                    reproductions = status.reproductions,
                    "Status"
                );
                if status.alive_count == 0 {
                    tracing::info!("Population extinct");
                    break;
                }
            }
        }
    }

    shutdown.cleanup(&mut simulation).await;

    if let Some(last_n) = args.summary {
        let report = simulation.summary(last_n).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let code = shutdown.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
