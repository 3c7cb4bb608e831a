use std::path::PathBuf;
use std::ptr::NonNull;

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use bufstore_config::BufferStoreConfig;
use bufstore_core::{ArenaLayout, BufferStore, ForeignDisposal};
use bufstore_telemetry::{PoolLogger, PoolMetrics};

use crate::error::CliError;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file; defaults to `config/bufstore.yaml` plus environment.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the configured pool and print its arena layout
    Layout,
    /// Run a seeded acquire/lock/release workload against the pool
    Exercise(ExerciseArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExerciseArgs {
    /// Number of acquire or release steps
    #[arg(long, default_value_t = 10_000)]
    pub cycles: usize,
    /// Seed for the workload generator
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Probability that an acquired buffer gets its lock bit set
    #[arg(long, default_value_t = 0.1)]
    pub lock_ratio: f64,
}

#[derive(Debug, Serialize)]
struct LayoutReport {
    #[serde(flatten)]
    layout: ArenaLayout,
    base: String,
    header_len: usize,
    available: usize,
}

pub fn run_command(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => BufferStoreConfig::load_from_path(path)?,
        None => BufferStoreConfig::load()?,
    };
    PoolLogger::init(&config.telemetry.log_level);

    let mut store = config.pool.build_store()?;

    match cli.command {
        Commands::Layout => {
            let report = LayoutReport {
                layout: *store.layout(),
                base: format!("{:p}", store.base()),
                header_len: store.header_len(),
                available: store.available_count(),
            };
            print!("{}", serde_yaml::to_string(&report)?);
        }
        Commands::Exercise(args) => {
            run_workload(&mut store, &args)?;

            let stats = store.stats();
            PoolLogger::log_snapshot("exercise", &stats);
            print!("{}", serde_yaml::to_string(&stats)?);

            if config.telemetry.metrics {
                let metrics = PoolMetrics::new()?;
                metrics.observe(&stats);
                print!("{}", metrics.gather_metrics()?);
            }
        }
    }
    Ok(())
}

/// Random mix of acquires and releases. Locked buffers are first released
/// normally (which leaves them outstanding) and then unlocked, the way a
/// driver hands back a buffer after transmit completion. Every buffer is
/// returned before this function finishes.
pub fn run_workload<D: ForeignDisposal>(
    store: &mut BufferStore<D>,
    args: &ExerciseArgs,
) -> Result<(), CliError> {
    if !(0.0..=1.0).contains(&args.lock_ratio) {
        return Err(CliError::Argument(format!(
            "lock ratio {} must be between 0.0 and 1.0",
            args.lock_ratio
        )));
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut held: Vec<NonNull<u8>> = Vec::with_capacity(store.capacity());

    for _ in 0..args.cycles {
        let acquire = held.is_empty() || (store.available_count() > 0 && rng.random_bool(0.5));
        if acquire {
            let buf = store.acquire()?;
            if rng.random_bool(args.lock_ratio) {
                store.lock_control().lock_addr(buf.as_ptr());
            }
            held.push(buf);
        } else {
            let buf = held.swap_remove(rng.random_range(0..held.len()));
            give_back(store, buf);
        }
    }

    for buf in held.drain(..) {
        give_back(store, buf);
    }

    info!(
        cycles = args.cycles,
        seed = args.seed,
        available = store.available_count(),
        "Workload finished"
    );
    Ok(())
}

fn give_back<D: ForeignDisposal>(store: &mut BufferStore<D>, buf: NonNull<u8>) {
    if store.is_locked(buf.as_ptr()) {
        store.release(buf);
        store.unlock_and_release(buf);
    } else {
        store.release(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cycles: usize, seed: u64, lock_ratio: f64) -> ExerciseArgs {
        ExerciseArgs {
            cycles,
            seed,
            lock_ratio,
        }
    }

    #[test]
    fn workload_returns_every_buffer() {
        let mut store = BufferStore::new(16, 256).unwrap();
        run_workload(&mut store, &args(5_000, 7, 0.25)).unwrap();

        let stats = store.stats();
        assert_eq!(stats.available, 16);
        assert_eq!(stats.locked, 0);
        assert_eq!(stats.exhaustion_failures, 0);
        assert_eq!(
            stats.acquisitions,
            stats.releases + stats.unlock_releases
        );
        assert_eq!(stats.locked_release_skips, stats.unlock_releases);
    }

    #[test]
    fn workload_is_deterministic_per_seed() {
        let run = |seed| {
            let mut store = BufferStore::new(8, 64).unwrap();
            run_workload(&mut store, &args(1_000, seed, 0.5)).unwrap();
            store.stats()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn rejects_invalid_lock_ratio() {
        let mut store = BufferStore::new(1, 64).unwrap();
        assert!(matches!(
            run_workload(&mut store, &args(10, 0, 1.5)),
            Err(CliError::Argument(_))
        ));
    }

    #[test]
    fn cli_parses_exercise_arguments() {
        let cli = Cli::try_parse_from([
            "bufstore",
            "--config",
            "pool.yaml",
            "exercise",
            "--cycles",
            "10",
            "--seed",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("pool.yaml")));
        match cli.command {
            Commands::Exercise(args) => {
                assert_eq!(args.cycles, 10);
                assert_eq!(args.seed, 3);
                assert_eq!(args.lock_ratio, 0.1);
            }
            Commands::Layout => panic!("expected exercise"),
        }
    }
}
