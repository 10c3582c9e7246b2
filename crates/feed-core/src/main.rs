//! Feed Simulation Runner
//!
//! Builds a random social network, populates it and runs one or more
//! trials, writing opinion snapshots and a run summary as JSON.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feed_core::output::SnapshotWriter;
use feed_core::setup::{random_connected, setup_rng, spawn_population};
use feed_core::{default_config_toml, RankingPolicy, SimConfig, Simulation};
use feed_events::RunSummary;

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "feed_sim")]
#[command(about = "Opinion dynamics under an engagement-maximizing feed")]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks per trial
    #[arg(long)]
    ticks: Option<u64>,

    /// Number of people on the network
    #[arg(long)]
    population: Option<usize>,

    /// Target mean degree of the social graph
    #[arg(long)]
    avg_degree: Option<f64>,

    /// Feed ranking policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Repeated trials on the same network
    #[arg(long)]
    trials: Option<u32>,

    /// Directory for snapshots and the run summary
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Interval between opinion snapshots (in ticks)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Print the default configuration file and exit
    #[arg(long)]
    print_default_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Engagement,
    FilterBubble,
}

impl From<PolicyArg> for RankingPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Engagement => RankingPolicy::Engagement,
            PolicyArg::FilterBubble => RankingPolicy::FilterBubble,
        }
    }
}

impl Args {
    fn load_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => SimConfig::default(),
        };

        let sim = &mut config.simulation;
        if let Some(seed) = self.seed {
            sim.seed = seed;
        }
        if let Some(ticks) = self.ticks {
            sim.ticks = ticks;
        }
        if let Some(population) = self.population {
            sim.population = population;
        }
        if let Some(avg_degree) = self.avg_degree {
            sim.avg_degree = avg_degree;
        }
        if let Some(trials) = self.trials {
            sim.trials = trials;
        }
        if let Some(interval) = self.snapshot_interval {
            sim.snapshot_interval = interval;
        }
        if let Some(policy) = self.policy {
            config.feed.policy = policy.into();
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", default_config_toml());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = args.load_config()?;
    let sim_config = &config.simulation;
    info!(
        seed = sim_config.seed,
        population = sim_config.population,
        ticks = sim_config.ticks,
        trials = sim_config.trials,
        policy = config.feed.policy.as_str(),
        "starting feed simulation"
    );

    let mut rng = setup_rng(sim_config.seed);
    let graph = random_connected(sim_config.population, sim_config.avg_degree, &mut rng);
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "social graph ready"
    );
    let people = spawn_population(sim_config.population, &mut rng, &config.agents)?;

    let mut simulation = Simulation::new(graph, &config)?;
    simulation.populate(people)?;

    let mut writer = SnapshotWriter::new(&args.output, sim_config.snapshot_interval);
    let mut summary = RunSummary::new(
        sim_config.seed,
        sim_config.population,
        sim_config.ticks,
        config.feed.policy.as_str(),
    );

    for trial in 0..sim_config.trials {
        if trial > 0 {
            simulation.reset();
        }
        info!(trial, "trial started");

        for _ in 0..sim_config.ticks {
            let tick = simulation.current_tick();
            if writer.should_snapshot(tick) {
                let snapshot = simulation.snapshot(writer.next_sequence());
                writer
                    .write_snapshot(trial, &snapshot)
                    .context("writing snapshot")?;
                info!(
                    trial,
                    tick,
                    mean = snapshot.mean_opinion,
                    polarization = snapshot.polarization,
                    online = snapshot.online_count,
                    "snapshot"
                );
            }
            simulation.step()?;
        }

        let last = simulation.snapshot(writer.next_sequence());
        writer.write_snapshot(trial, &last).context("writing snapshot")?;
        summary.record_trial(trial, &last);
        info!(
            trial,
            mean = last.mean_opinion,
            polarization = last.polarization,
            "trial complete"
        );
    }

    let path = writer.write_summary(&summary).context("writing summary")?;
    info!(
        path = %path.display(),
        snapshots = writer.snapshot_count(),
        "run complete"
    );
    Ok(())
}
