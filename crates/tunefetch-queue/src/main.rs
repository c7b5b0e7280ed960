/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Enqueued or adopted downloads rendered until they settle, graceful shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

mod cli;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use tunefetch_adapter::{BackendClient, ContentKind, JobBackend};
use tunefetch_queue::{
    EntryMetadata, QueueConfig, QueueController, QueueEvent, TaskId, TaskStatus, drain_pending,
};

#[derive(Parser, Debug)]
#[command(name = "tunefetch", version, about = "Download queue client for a music download backend")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,
    /// Write logs to this file instead of stderr
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start one download and follow it until it settles
    Download(DownloadArgs),
    /// Follow every job already running on the backend
    Watch,
    /// Write a configuration file
    Init {
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Skip prompts and write the built-in defaults
        #[arg(long)]
        defaults: bool,
    },
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// track, album, playlist or artist
    kind: ContentKind,
    /// Link or identifier understood by the backend
    reference: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    artist: Option<String>,
    #[arg(long)]
    quality: Option<String>,
    #[arg(long = "real-time")]
    real_time: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let _log_guard = init_tracing(&args.log_level, args.log_file.as_deref())?;

    let download = match args.command {
        Command::Init { output, defaults } => {
            let output = match output {
                Some(path) => path,
                None => QueueConfig::default_path().context("no config directory on this platform")?,
            };
            return cli::init::run_init(&output, defaults);
        }
        Command::Download(download) => Some(download),
        Command::Watch => None,
    };

    let config = QueueConfig::load(args.config_path.as_deref()).context("load config")?;
    info!(
        base_url = %config.backend.base_url,
        poll_interval_ms = config.monitor.poll_interval_ms,
        "configuration loaded"
    );

    let client = BackendClient::with_config_and_base_url(config.client_config(), &config.backend.base_url)
        .context("build backend client")?;
    let controller = QueueController::new(Arc::new(client), config.monitor_policy());

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    let mut events = controller.subscribe();
    match download {
        Some(download) => {
            let metadata = EntryMetadata {
                name: download.name,
                artist: download.artist,
            };
            let mut options = config.enqueue_options();
            if download.quality.is_some() {
                options.quality = download.quality;
            }
            options.real_time |= download.real_time;

            let id = controller
                .enqueue(download.kind, &download.reference, metadata, options)
                .await
                .context("enqueue download")?;
            info!(task_id = %id, "following download");
        }
        None => {
            let adopted = controller
                .reconcile_existing()
                .await
                .context("list backend jobs")?;
            if adopted.is_empty() {
                println!("{}", style("No downloads in flight").dim());
            }
        }
    }

    loop {
        if controller.live_count().await == 0 {
            for event in drain_pending(&mut events) {
                render_event(&controller, event).await;
            }
            break;
        }
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown signal received");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => render_event(&controller, event).await,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "renderer fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    print_summary(&controller).await;
    controller
        .shutdown_and_wait()
        .await
        .context("shutdown queue")?;
    info!("queue shutdown complete");

    Ok(())
}

async fn render_event<B: JobBackend>(controller: &QueueController<B>, event: QueueEvent) {
    match event {
        QueueEvent::Added { id, .. } => {
            if let Ok(entry) = controller.get(&id).await {
                println!(
                    "{} {} - {} ({})",
                    style("+").green().bold(),
                    style(&entry.display_name).bold(),
                    entry.display_artist,
                    entry.kind
                );
            }
        }
        QueueEvent::Updated { id, status, message } => {
            let name = display_name(controller, &id).await;
            println!(
                "{} {} {}",
                styled_status(status),
                style(name).bold(),
                message.unwrap_or_default()
            );
        }
        QueueEvent::Removed { id } => {
            info!(task_id = %id, "entry removed");
        }
        QueueEvent::VisibilityChanged { .. } => {}
    }
}

async fn print_summary<B: JobBackend>(controller: &QueueController<B>) {
    let entries = controller.snapshot().await;
    if entries.is_empty() {
        return;
    }
    println!("\n{}", style("--- Queue ---").bold());
    for entry in entries {
        let retry = if entry.can_retry() { " (retryable)" } else { "" };
        println!(
            "{} {} - {}{}",
            styled_status(entry.status),
            style(&entry.display_name).bold(),
            entry.message.as_deref().unwrap_or(""),
            style(retry).dim()
        );
    }
}

async fn display_name<B: JobBackend>(controller: &QueueController<B>, id: &TaskId) -> String {
    controller
        .get(id)
        .await
        .map(|entry| entry.display_name)
        .unwrap_or_else(|_| id.to_string())
}

fn styled_status(status: TaskStatus) -> console::StyledObject<String> {
    let label = format!("[{status}]");
    match status {
        TaskStatus::Completed => style(label).green(),
        TaskStatus::Error | TaskStatus::Timeout => style(label).red(),
        TaskStatus::Cancelled | TaskStatus::Skipped => style(label).yellow(),
        _ => style(label).cyan(),
    }
}

fn init_tracing(log_level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow!(err))
            .context("initialize tracing subscriber")?;
        return Ok(None);
    };

    let file_name = path.file_name().context("log file path must name a file")?;
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(Some(guard))
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
