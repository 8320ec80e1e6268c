//! VitalGuard
//!
//! Command-line driver for the ICU monitoring core.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vitalguard::config::{self, Settings};
use vitalguard::core::ambient::Ambient;
use vitalguard::core::model::load_model;
use vitalguard::ward::{IcuWard, CRISIS_PATIENTS};

#[derive(Parser)]
#[command(name = "vitalguard", version, about = "ICU vital-sign monitoring and triage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
    /// Override the configured RNG seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll one patient and print each prediction.
    MonitorVitals {
        patient_id: String,
        #[arg(long)]
        ticks: Option<u32>,
    },
    /// Poll the whole ward with a pool of workers.
    MonitorWard {
        #[arg(long)]
        ticks: Option<u32>,
        /// Trigger the crisis drill before the first poll.
        #[arg(long)]
        crisis: bool,
        #[arg(long)]
        worker_count: Option<usize>,
    },
    /// Run all five vital pipelines for one patient.
    Analyze { patient_id: String },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_ward(settings: &Settings, seed: Option<u64>) -> IcuWard {
    let ambient = match seed.or(settings.monitor.seed) {
        Some(seed) => Ambient::seeded(seed),
        None => Ambient::system(),
    };
    let model = load_model(settings.model.path.as_deref().map(Path::new));
    IcuWard::demo(model, ambient).with_poll_interval(settings.monitor.poll_interval_secs)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

async fn monitor_patient(ward: Arc<IcuWard>, patient_id: String, ticks: u32, poll: Duration) -> Result<()> {
    let mut interval = tokio::time::interval(poll);
    for _ in 0..ticks {
        interval.tick().await;
        let result = ward
            .predict(&patient_id)
            .with_context(|| format!("Prediction failed for {patient_id}"))?;
        print_json(&result)?;
    }
    print_json(&ward.forecast(&patient_id)?)?;
    Ok(())
}

async fn monitor_ward(ward: Arc<IcuWard>, ticks: u32, worker_count: usize, poll: Duration) -> Result<()> {
    let patients: Vec<String> = ward.patients().into_iter().map(|p| p.id).collect();
    let (tx, rx) = mpsc::channel::<String>(patients.len().max(1));
    let rx = Arc::new(Mutex::new(rx));

    let workers: Vec<_> = (0..worker_count.max(1))
        .map(|worker| {
            let rx = Arc::clone(&rx);
            let ward = Arc::clone(&ward);
            tokio::spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(patient_id) = next else { break };
                    match ward.predict(&patient_id) {
                        Ok(result) => info!(
                            worker,
                            patient_id = %patient_id,
                            risk_score = result.risk_score,
                            alerts = result.alerts.len(),
                            "Poll complete"
                        ),
                        Err(e) => error!(worker, "Poll failed: {}", e),
                    }
                }
            })
        })
        .collect();

    let mut interval = tokio::time::interval(poll);
    for _ in 0..ticks {
        interval.tick().await;
        for id in &patients {
            tx.send(id.clone()).await.context("Worker pool closed")?;
        }
    }
    drop(tx);

    for worker in workers {
        worker.await.context("Worker panicked")?;
    }

    print_json(&ward.census())?;
    print_json(&ward.summary())?;
    print_json(&ward.active_alerts())?;
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let settings = config::load_config().context("Failed to load configuration")?;
    init_tracing(cli.json_logs || settings.logging.json);

    info!(version = vitalguard::VERSION, "VitalGuard starting");
    let ward = Arc::new(build_ward(&settings, cli.seed));
    let poll = Duration::from_secs_f64(settings.monitor.poll_interval_secs.max(0.01));

    let run = async {
        match cli.command {
            Commands::MonitorVitals { patient_id, ticks } => {
                monitor_patient(ward.clone(), patient_id, ticks.unwrap_or(settings.monitor.ticks), poll).await
            }
            Commands::MonitorWard { ticks, crisis, worker_count } => {
                if crisis {
                    let affected = ward.trigger_crisis(&CRISIS_PATIENTS);
                    warn!(count = affected.len(), "Crisis drill active");
                }
                monitor_ward(
                    ward.clone(),
                    ticks.unwrap_or(settings.monitor.ticks),
                    worker_count.unwrap_or(settings.monitor.worker_count),
                    poll,
                )
                .await
            }
            Commands::Analyze { patient_id } => {
                let report = ward
                    .analyze(&patient_id)
                    .with_context(|| format!("Analysis failed for {patient_id}"))?;
                print_json(&report)
            }
        }
    };

    tokio::select! {
        result = run => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down");
            Ok(())
        }
    }
}
