//! Forwarder backoff inspector.
//!
//! ```text
//! forwarder-backoff [--config backoff.toml] policy
//!     → print the validated policy and its jitter windows
//!
//! forwarder-backoff [--config backoff.toml] simulate --endpoints a,b --workers 4
//!     → run forwarding workers against flaky simulated endpoints
//!     → print per-endpoint state at the end
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use forwarder_backoff::config::{load_config, ForwarderConfig};
use forwarder_backoff::observability::logging;
use forwarder_backoff::{dispatch, BackoffPolicy, DispatchError, EndpointTracker};

#[derive(Parser)]
#[command(name = "forwarder-backoff")]
#[command(about = "Inspect and exercise forwarder endpoint backoff", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the validated backoff policy
    Policy,
    /// Run workers against simulated endpoints
    Simulate {
        /// Comma-separated endpoint names
        #[arg(long, value_delimiter = ',', default_value = "intake,logs,traces")]
        endpoints: Vec<String>,

        #[arg(long, default_value_t = 4)]
        workers: usize,

        #[arg(long, default_value_t = 20)]
        rounds: u32,

        /// Probability that a single send fails (0.0 - 1.0)
        #[arg(long, default_value_t = 0.5)]
        failure_rate: f64,

        /// Pause between rounds in milliseconds
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,

        #[arg(long, default_value_t = 10)]
        seed: u64,
    },
}

#[derive(Default)]
struct Outcomes {
    sent: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ForwarderConfig::default(),
    };
    logging::init_logging(&config.observability)?;

    let policy = BackoffPolicy::from_config(&config.backoff);

    match cli.command {
        Commands::Policy => {
            let report = json!({
                "policy": policy,
                "schedule": policy.schedule(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Simulate {
            endpoints,
            workers,
            rounds,
            failure_rate,
            tick_ms,
            seed,
        } => {
            let failure_rate = if failure_rate.is_finite() {
                failure_rate.clamp(0.0, 1.0)
            } else {
                0.0
            };
            tracing::info!(
                endpoints = ?endpoints,
                workers,
                rounds,
                failure_rate,
                "Starting simulation"
            );

            let tracker = Arc::new(EndpointTracker::with_rng(
                policy,
                StdRng::seed_from_u64(seed),
            ));
            let outcomes = Arc::new(Outcomes::default());

            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let tracker = Arc::clone(&tracker);
                let outcomes = Arc::clone(&outcomes);
                let endpoints = endpoints.clone();
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(worker as u64 + 1));

                handles.push(tokio::spawn(async move {
                    for _ in 0..rounds {
                        for endpoint in &endpoints {
                            let fail = rng.gen_bool(failure_rate);
                            let result = dispatch(&*tracker, endpoint, || async move {
                                tokio::time::sleep(Duration::from_millis(1)).await;
                                if fail {
                                    Err("simulated send failure")
                                } else {
                                    Ok(())
                                }
                            })
                            .await;

                            let counter = match result {
                                Ok(()) => &outcomes.sent,
                                Err(DispatchError::Send(_)) => &outcomes.failed,
                                Err(DispatchError::Blocked { .. }) => &outcomes.skipped,
                            };
                            counter.fetch_add(1, Ordering::Relaxed);
                        }
                        tokio::time::sleep(Duration::from_millis(tick_ms)).await;
                    }
                }));
            }

            for handle in handles {
                handle.await?;
            }

            let statuses: BTreeMap<String, _> = tracker
                .endpoints()
                .into_iter()
                .filter_map(|name| tracker.status(&name).map(|status| (name, status)))
                .collect();
            let report = json!({
                "sent": outcomes.sent.load(Ordering::Relaxed),
                "failed": outcomes.failed.load(Ordering::Relaxed),
                "skipped": outcomes.skipped.load(Ordering::Relaxed),
                "endpoints": statuses,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
