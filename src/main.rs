mod api;
mod server;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use engagement_metrics::diagnostics::{diagnose_upstream, env_report};
use engagement_metrics::handle::parse_handle_list;
use engagement_metrics::telemetry::init_tracing;
use engagement_metrics::{
    format_float, format_number, format_percent, Aggregator, AppConfig, CompareEntry,
    CompareOptions, CompareStatus, ContentSource, FileStore, HttpContentSource, MetricsStore,
    Synchronizer,
};

#[derive(Parser)]
#[command(name = "engagement-metrics", about = "Engagement metrics for X accounts")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch an account and recompute its post analysis.
    Sync(SyncArgs),
    /// Compare stored accounts side by side.
    Compare(CompareArgs),
    Serve(ServeArgs),
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Inspect the upstream provider and configuration without writing anything.
    #[command(subcommand)]
    Diagnose(DiagnoseCommand),
}

#[derive(Args, Debug, Clone)]
struct SyncArgs {
    handle: String,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct CompareArgs {
    #[arg(required = true)]
    handles: Vec<String>,
    /// Recent posts per account (10-500).
    #[arg(long)]
    posts: Option<u32>,
    /// Synchronize accounts that are not stored yet.
    #[arg(long)]
    autofill: bool,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8787)]
    port: u16,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default configuration.
    Init {
        #[arg(long, default_value = "config/metrics.toml")]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum DiagnoseCommand {
    /// Run the profile and timeline lookups for a handle.
    Upstream { handle: String },
    /// Show effective settings and which environment keys are set.
    Env,
}

struct Services {
    synchronizer: Arc<Synchronizer>,
    aggregator: Aggregator,
    source: Arc<dyn ContentSource>,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let (config, config_path) = AppConfig::load(cli.config).map_err(|err| err.to_string())?;
    match config_path.as_deref() {
        Some(path) if path.exists() => info!(path = %path.display(), "loaded config"),
        _ => info!("using default config"),
    }

    match cli.command {
        Command::Sync(args) => run_sync(&config, args).await,
        Command::Compare(args) => run_compare(&config, args).await,
        Command::Serve(args) => {
            let services = build_services(&config).await?;
            let state = server::AppState {
                synchronizer: services.synchronizer,
                aggregator: services.aggregator,
                source: services.source,
                config: Arc::new(config),
                config_path,
            };
            server::serve(args, state).await
        }
        Command::Diagnose(DiagnoseCommand::Upstream { handle }) => {
            let source =
                HttpContentSource::new(config.upstream.clone()).map_err(|err| err.to_string())?;
            let report = diagnose_upstream(&source, &handle)
                .await
                .map_err(|err| err.to_string())?;
            print_json(&report)
        }
        Command::Diagnose(DiagnoseCommand::Env) => {
            print_json(&env_report(&config, config_path.as_deref()))
        }
        Command::Config(ConfigCommand::Init { path }) => {
            AppConfig::default()
                .write(&path)
                .map_err(|err| err.to_string())?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

async fn build_services(config: &AppConfig) -> Result<Services, String> {
    let store: Arc<dyn MetricsStore> = Arc::new(
        FileStore::load(config.store.path.clone())
            .await
            .map_err(|err| err.to_string())?,
    );
    let source: Arc<dyn ContentSource> = Arc::new(
        HttpContentSource::new(config.upstream.clone()).map_err(|err| err.to_string())?,
    );
    let synchronizer = Arc::new(Synchronizer::new(
        store.clone(),
        source.clone(),
        config.sync.clone(),
    ));
    let aggregator = Aggregator::new(store).with_provisioner(synchronizer.clone());
    Ok(Services {
        synchronizer,
        aggregator,
        source,
    })
}

async fn run_sync(config: &AppConfig, args: SyncArgs) -> Result<(), String> {
    let services = build_services(config).await?;
    let report = services
        .synchronizer
        .sync(&args.handle)
        .await
        .map_err(|err| err.to_string())?;

    if args.json {
        return print_json(&report);
    }

    println!("Synchronized @{} ({})", report.handle, report.account_id);
    println!(
        "Posts fetched: {} | skipped: {} | analyzed: {}",
        report.posts_fetched, report.posts_skipped, report.posts_processed
    );
    println!("Upstream requests: {}", report.diagnostics.attempts.len());
    Ok(())
}

async fn run_compare(config: &AppConfig, args: CompareArgs) -> Result<(), String> {
    let handles =
        parse_handle_list(args.handles.iter().map(String::as_str)).map_err(|err| err.to_string())?;
    let services = build_services(config).await?;
    let options = CompareOptions {
        posts: config.compare.post_limit(args.posts.map(i64::from)),
        autofill: args.autofill,
    };
    let entries = services.aggregator.compare(&handles, options).await;

    if args.json {
        return print_json(&entries);
    }

    println!("Comparing {} accounts over the last {} posts", entries.len(), options.posts);
    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &CompareEntry) {
    match (entry.status, entry.summary.as_ref()) {
        (CompareStatus::Ok, Some(summary)) => {
            println!("\n@{}", entry.username);
            println!(
                "  reach {} | likes {} | retweets {} | replies {} | posts {}",
                format_number(summary.totals.views as f64),
                format_number(summary.totals.likes as f64),
                format_number(summary.totals.retweets as f64),
                format_number(summary.totals.replies as f64),
                summary.totals.posts_analyzed
            );
            println!(
                "  engagement {} (likes {} | retweets {} | replies {})",
                format_percent(summary.rates.engagement_rate),
                format_percent(summary.rates.like_rate),
                format_percent(summary.rates.retweet_rate),
                format_percent(summary.rates.reply_rate)
            );
            println!("  average score {}", format_float(summary.score_avg, 2));
            for (rank, post) in summary.top.iter().enumerate() {
                println!(
                    "  #{} {} {}",
                    rank + 1,
                    format_float(post.score, 2),
                    post.url.as_deref().unwrap_or(&post.text)
                );
            }
        }
        (CompareStatus::Error, _) => {
            println!(
                "\n@{}: error: {}",
                entry.username,
                entry.error.as_deref().unwrap_or("unknown error")
            );
        }
        _ => println!("\n@{}: not synchronized yet", entry.username),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| format!("failed to serialize output: {}", err))?;
    println!("{}", payload);
    Ok(())
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
