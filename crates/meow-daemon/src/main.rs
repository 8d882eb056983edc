mod core;
mod socket;
mod trigger;

use clap::{Parser, Subcommand};
use meow_proto::client;
use meow_proto::config::{Config, StrategyPreference};
use meow_proto::notification::{Dismissal, NotificationPayload};
use meow_proto::notifier;
use meow_proto::protocol::Request;
use meow_proto::schedule::{select_trigger, PermissionSource, Trigger};
use meow_proto::state::PermissionStore;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::trigger::{SystemdTrigger, TimerTrigger};

#[derive(Parser)]
#[command(name = "meow-daemon", version, about = "Hourly MeowTalk phrase notifications")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler daemon (default).
    Run,
    /// Show one notification, then report the outcome to the daemon.
    /// Invoked by the native trigger at the fire time.
    Deliver {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        icon: String,
        #[arg(long)]
        tag: String,
    },
}

fn init_logging() -> anyhow::Result<()> {
    let data_dir = meow_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("daemon.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,meow_daemon=debug")),
        )
        .init();

    info!("Log file: {:?}", log_path);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Deliver {
            title,
            body,
            icon,
            tag,
        } => {
            let payload = NotificationPayload {
                title,
                body,
                icon,
                tag,
            };
            deliver(&config, payload).await
        }
    }
}

fn build_trigger(
    preference: StrategyPreference,
    event_tx: mpsc::Sender<core::DaemonEvent>,
) -> Box<dyn Trigger + Send> {
    let timer: Box<dyn Trigger + Send> = Box::new(TimerTrigger::new(event_tx));
    let native = || SystemdTrigger::detect().map(|t| Box::new(t) as Box<dyn Trigger + Send>);

    match preference {
        StrategyPreference::Timer => timer,
        StrategyPreference::Auto => select_trigger(native(), timer),
        StrategyPreference::Native => {
            let native = native();
            if native.is_none() {
                warn!("Native trigger requested but systemd-run is unavailable, using timer");
            }
            select_trigger(native, timer)
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let pid_file = config.daemon.pid_file.clone();
    if let Some(parent) = pid_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&pid_file, std::process::id().to_string())?;

    // Event channel: all external inputs funnel into DaemonCore
    let (event_tx, event_rx) = mpsc::channel::<core::DaemonEvent>(256);

    let trigger = build_trigger(config.notifications.strategy, event_tx.clone());
    info!("Delivery strategy: {}", trigger.strategy());

    let listener = socket::bind(&config.daemon_address()).await?;
    let _socket_handle = socket::start_server(listener, event_tx.clone());

    let shutdown_tx = event_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(core::DaemonEvent::Shutdown).await;
        }
    });

    let daemon_core = core::DaemonCore::new(config, trigger, event_tx);
    info!("Daemon initialised, running event loop");
    let result = daemon_core.run(event_rx).await;

    if let Err(e) = std::fs::remove_file(&pid_file) {
        warn!("Could not remove pid file {:?}: {}", pid_file, e);
    }
    result
}

/// Runs outside the daemon process; the daemon only learns the outcome
/// through the socket.
async fn deliver(config: &Config, payload: NotificationPayload) -> anyhow::Result<()> {
    let permission = PermissionStore::new(config.paths.state_file.clone()).permission();
    if !permission.is_granted() {
        info!("Permission is {:?}, skipping delivery", permission);
        return Ok(());
    }

    let dismissal = match notifier::show_and_wait(&payload).await {
        Ok(dismissal) => dismissal,
        Err(e) => {
            error!("Could not show notification: {}", e);
            Dismissal::Closed
        }
    };

    let address = config.daemon_address();
    let event = core::lifecycle_for(dismissal);
    match client::send_once(&address, Request::Lifecycle { event }).await {
        Ok(reply) => info!("Reported {:?} to daemon: {:?}", event, reply),
        Err(e) => {
            warn!(
                "Daemon unreachable at {} ({}); no further notifications until it restarts",
                address, e
            );
            if dismissal == Dismissal::Clicked {
                notifier::open_page(&config.notifications.open_page).await?;
            }
        }
    }
    Ok(())
}
