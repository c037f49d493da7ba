use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lv_config::LoadedConfig;
use lv_gateway::HttpGateway;
use lv_runtime::{run_channel_feed, spawn_engine, EngineHandle, EngineSettings, ViewSnapshot};
use lv_schemas::{CreateMode, SummaryCreate, TransactionCreate};
use tracing::{info, warn};

mod render;

#[derive(Parser)]
#[command(name = "lv")]
#[command(about = "Live view client for transactions and summaries", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (later files override earlier ones)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective config hash and canonical JSON
    ConfigHash,

    /// Fetch both collections once and print them
    List {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Create a transaction
    CreateTx {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        amount: f64,

        /// Transaction type, e.g. pago
        #[arg(long = "type")]
        tx_type: String,

        /// Use the synchronous endpoint (no channel echo)
        #[arg(long, default_value_t = false)]
        sync: bool,

        /// Reuse a key from an earlier attempt instead of generating one
        #[arg(long)]
        idempotency_key: Option<String>,
    },

    /// Queue a summary job
    CreateSummary {
        #[arg(long)]
        source: String,

        #[arg(long)]
        text: String,

        #[arg(long)]
        idempotency_key: Option<String>,
    },

    /// Follow the push channel and print the view after every change
    Watch {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present; a missing file is not an error.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let loaded = load_config(&cli.config_paths)?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    match cli.cmd {
        Commands::ConfigHash => {
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::List { json } => {
            let engine = start_engine(&loaded)?;
            engine.refresh().await.context("initial fetch failed")?;
            print_view(&engine.snapshot(), json)?;
        }

        Commands::CreateTx {
            user_id,
            amount,
            tx_type,
            sync,
            idempotency_key,
        } => {
            let engine = start_engine(&loaded)?;
            let mode = if sync {
                CreateMode::Sync
            } else {
                CreateMode::Async
            };
            let payload = TransactionCreate {
                user_id,
                amount,
                tx_type,
            };
            let tx = match idempotency_key {
                Some(key) => {
                    engine
                        .create_transaction_with_key(mode, &payload, &key)
                        .await
                }
                None => engine.create_transaction(mode, &payload).await,
            }
            .context("create transaction failed")?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }

        Commands::CreateSummary {
            source,
            text,
            idempotency_key,
        } => {
            let engine = start_engine(&loaded)?;
            let payload = SummaryCreate { source, text };
            let summary = match idempotency_key {
                Some(key) => engine.create_summary_with_key(&payload, &key).await,
                None => engine.create_summary(&payload).await,
            }
            .context("create summary failed")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Watch { json } => {
            let engine = start_engine(&loaded)?;
            let url = loaded.config.channel_url()?;
            watch(engine, url, json).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    lv_config::load_layered_yaml(&path_refs)?.with_process_env()
}

fn start_engine(loaded: &LoadedConfig) -> Result<EngineHandle> {
    let cfg = &loaded.config;
    let gateway = HttpGateway::with_timeout(cfg.api.base_url.clone(), cfg.request_timeout())
        .context("http client build failed")?;
    let (engine, _task) = spawn_engine(
        Arc::new(gateway),
        EngineSettings {
            queue_capacity: cfg.engine.queue_capacity,
        },
    );
    Ok(engine)
}

async fn watch(engine: EngineHandle, url: String, json: bool) -> Result<()> {
    if let Err(err) = engine.refresh().await {
        // The channel can still fill the view; resyncs recover the rest.
        warn!(%err, "initial fetch failed; starting from an empty view");
    }
    let mut updates = engine.subscribe();
    print_view(&updates.borrow_and_update(), json)?;

    let feed_engine = engine.clone();
    let mut feed = tokio::spawn(async move { run_channel_feed(&url, &feed_engine).await });

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                print_view(&view, json)?;
            }
            ended = &mut feed => {
                let forwarded = ended.context("channel feed task panicked")??;
                info!(forwarded, "channel closed; exiting");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn print_view(view: &ViewSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(view)?);
    } else {
        print!("{}", render::view_text(view));
    }
    Ok(())
}
