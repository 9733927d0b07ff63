use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use netverdict::config::{AppConfig, LoggingConfig};
use netverdict::features::RawInput;

#[derive(Parser)]
#[command(
    name = "netverdict",
    about = "Classifies network connection records as normal or anomalous",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long, env = "NETVERDICT_BIND")]
        bind: Option<String>,
    },

    /// Classify one connection record
    Predict {
        /// Field value as name=value; repeat for each field
        #[arg(long = "field", short = 'f', value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,

        /// Do not record the result in the detection history
        #[arg(long)]
        no_save: bool,

        /// Identity recorded with the detection
        #[arg(long)]
        user: Option<String>,
    },

    /// Show the feature layout, vocabularies and loaded model
    Schema {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Detection counts by label and by user
    Stats {
        /// Only count this user's detections
        #[arg(long)]
        user: Option<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// List recent detections
    History {
        /// Number of detections to show
        #[arg(long, default_value = "20")]
        limit: usize,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {:?}", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in {:?}", s));
    }
    Ok((name.to_string(), value.to_string()))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // stdout carries command output
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::resolve(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            config.log_summary();
            tracing::info!(bind = %config.server.bind, "Starting netverdict server");
            netverdict::serve(&config).await?;
        }
        Commands::Predict {
            fields,
            json,
            no_save,
            user,
        } => {
            let detector = netverdict::load_detector(&config)?;
            let input: RawInput = fields.into_iter().collect();
            let result = detector.predict(&input)?;

            let mut detection_id = None;
            if !no_save {
                let user = user.unwrap_or_else(|| config.server.default_user.clone());
                let saved = netverdict::open_detection_log(&config)
                    .and_then(|log| log.record(&result, &user));
                match saved {
                    Ok(id) => detection_id = Some(id),
                    Err(e) => tracing::warn!(error = %e, "Failed to persist detection"),
                }
            }

            if json {
                let output = json!({
                    "prediction": result.label,
                    "confidence": result.confidence,
                    "predicted_class_id": result.predicted_class_id,
                    "probabilities": result.probabilities,
                    "persisted": detection_id.is_some(),
                    "detection_id": detection_id,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("\n=== netverdict ===");
                println!("Prediction: {}", result.label);
                println!("Confidence: {:.2}%", result.confidence * 100.0);
                println!("Class id:   {}", result.predicted_class_id);
                if let Some(id) = detection_id {
                    println!("Saved as:   {}", id);
                }
                println!("==================\n");
            }
        }
        Commands::Schema { json } => {
            let detector = netverdict::load_detector(&config)?;
            let summary = detector.describe();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "\nModel: {} ({} classes, {} labels)",
                    summary.model, summary.classes, summary.label_strategy
                );
                if let Some(labels) = &summary.labels {
                    println!("Labels: {}", labels.join(", "));
                }
                println!();
                println!("{:<4} | {:<22} | Kind", "Pos", "Feature");
                println!("{:-<4}-|-{:-<22}-|-{:-<11}", "", "", "");
                for spec in &summary.features {
                    println!("{:<4} | {:<22} | {:?}", spec.position, spec.name, spec.kind);
                }
                println!();
                println!("protocol_type: {}", summary.vocabularies.protocol_type.join(", "));
                println!("flag:          {}", summary.vocabularies.flag.join(", "));
                println!("service:       {} values", summary.vocabularies.service.len());
                println!();
            }
        }
        Commands::Stats { user, json } => {
            let log = netverdict::open_detection_log(&config)?;
            let stats = log.stats(user.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("\n=== Detection statistics ===");
                println!("Total: {}", stats.total);
                for (label, count) in &stats.by_prediction {
                    println!("{:<10} {}", label, count);
                }
                if !stats.by_user.is_empty() {
                    println!();
                    println!("{:<20} | {:<6} | Share", "User", "Count");
                    println!("{:-<20}-|-{:-<6}-|-{:-<7}", "", "", "");
                    for u in &stats.by_user {
                        println!("{:<20} | {:<6} | {:.2}%", u.user_id, u.count, u.percentage);
                    }
                }
                println!();
            }
        }
        Commands::History { limit, json } => {
            let log = netverdict::open_detection_log(&config)?;
            let records = log.list_recent(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No detections recorded.");
            } else {
                println!("{:<25} | {:<10} | {:<10} | User", "Time", "Prediction", "Confidence");
                println!("{:-<25}-|-{:-<10}-|-{:-<10}-|-{:-<12}", "", "", "", "");
                for r in records {
                    println!(
                        "{:<25} | {:<10} | {:<10} | {}",
                        r.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                        r.prediction,
                        format!("{:.2}%", r.confidence * 100.0),
                        r.user_id
                    );
                }
            }
        }
    }

    Ok(())
}
