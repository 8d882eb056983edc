mod render;

use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use meow_proto::catalog::{Filter, VideoCatalog};
use meow_proto::client;
use meow_proto::config::Config;
use meow_proto::fetch::{FeedClient, FeedSource};
use meow_proto::notification::{NotificationPayload, Permission, UNSUPPORTED_MESSAGE};
use meow_proto::notifier;
use meow_proto::phrase::{PhraseBook, PhraseScheduler};
use meow_proto::posts::PostFeed;
use meow_proto::protocol::{Reply, Request};
use meow_proto::schedule::{PermissionSource, ScheduleOutcome};
use meow_proto::state::PermissionStore;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "meowtalk", version, about = "Meowbah videos, posts and hourly phrases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Latest video and the two latest posts.
    Home,
    /// The video catalog.
    Videos {
        /// all, showcase, qna, animation, collab, bts or other.
        #[arg(long, default_value = "all")]
        filter: String,
        /// Reveal this many extra pages.
        #[arg(long, default_value_t = 0)]
        more: usize,
    },
    /// All social posts.
    Posts,
    /// The phrase of the hour.
    Phrase {
        /// Keep running and announce each new phrase.
        #[arg(long)]
        watch: bool,
    },
    /// Hourly notification permission.
    Notifications {
        #[command(subcommand)]
        action: NotificationsAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum NotificationsAction {
    Enable,
    Disable,
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = meow_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("cli.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG overrides; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,meow_cli=debug,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("meowtalk log: {}", log_path.display());
    info!("meowtalk starting…");

    let config = Config::load()?;
    let feeds = FeedClient::new();

    match cli.command {
        Command::Home => home(&config, &feeds).await,
        Command::Videos { filter, more } => videos(&config, &feeds, &filter, more).await,
        Command::Posts => posts(&config, &feeds).await,
        Command::Phrase { watch } => phrase(&config, watch).await,
        Command::Notifications { action } => notifications(&config, action).await,
    }
}

async fn home(config: &Config, feeds: &FeedClient) -> anyhow::Result<()> {
    let video_source = FeedSource::parse(&config.feeds.videos);
    let post_source = FeedSource::parse(&config.feeds.posts);

    let (videos, posts) = tokio::join!(
        feeds.load_videos(&video_source),
        feeds.load_posts(&post_source),
    );
    if let Err(e) = &videos {
        warn!("Error loading latest video: {}", e);
    }
    let posts = posts.map(PostFeed::new);
    if let Err(e) = &posts {
        warn!("Error loading latest posts: {}", e);
    }

    let now = Utc::now();
    println!("{}\n", PhraseBook::default().phrase_at(now));
    println!("{}\n", render::home_video(&videos, now));
    println!("{}", render::home_posts(&posts));
    Ok(())
}

async fn videos(config: &Config, feeds: &FeedClient, filter: &str, more: usize) -> anyhow::Result<()> {
    let filter = Filter::parse(filter)
        .ok_or_else(|| anyhow::anyhow!("unknown filter '{}'", filter))?;

    let source = FeedSource::parse(&config.feeds.videos);
    let videos = match feeds.load_videos(&source).await {
        Ok(videos) => videos,
        Err(e) => {
            warn!("Failed to load YouTube videos: {}", e);
            print!("{}", render::video_feed_error());
            return Ok(());
        }
    };

    let mut catalog = VideoCatalog::new();
    catalog.load(videos);
    catalog.set_filter(filter);
    for _ in 0..more {
        if !catalog.has_more() {
            break;
        }
        catalog.load_more();
    }
    debug!(
        "Showing {} of {} videos ({})",
        catalog.current_page().len(),
        catalog.filtered_len(),
        filter
    );

    print!("{}", render::video_page(&catalog, Utc::now()));
    Ok(())
}

async fn posts(config: &Config, feeds: &FeedClient) -> anyhow::Result<()> {
    let source = FeedSource::parse(&config.feeds.posts);
    match feeds.load_posts(&source).await {
        Ok(posts) => print!("{}", render::post_page(&PostFeed::new(posts))),
        Err(e) => {
            warn!("Error fetching or parsing post feed: {}", e);
            println!("{}", render::post_feed_error(&e, &config.feeds.posts));
        }
    }
    Ok(())
}

fn permission_line(permission: Permission) -> &'static str {
    if notifier::is_supported() {
        permission.status_message()
    } else {
        UNSUPPORTED_MESSAGE
    }
}

async fn phrase(config: &Config, watch: bool) -> anyhow::Result<()> {
    let store = PermissionStore::new(config.paths.state_file.clone());
    let mut scheduler = PhraseScheduler::new(PhraseBook::default());

    println!("{}", scheduler.start(Utc::now()));
    println!("{}", permission_line(store.permission()));
    if !watch {
        return Ok(());
    }

    let period = Duration::from_secs(config.notifications.poll_interval_secs.max(1));
    let mut interval = tokio::time::interval(period);
    // the first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let granted = store.permission().is_granted();
                let Some(change) = scheduler.poll(Utc::now(), granted) else {
                    continue;
                };
                info!("Phrase changed for hour {}", change.hour);
                println!("{}", change.phrase);
                if change.notify {
                    let payload =
                        NotificationPayload::phrase(change.phrase, &config.notifications.icon);
                    if let Err(e) = notifier::show(&payload).await {
                        warn!("Could not show notification: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Phrase watch stopped");
                return Ok(());
            }
        }
    }
}

async fn notifications(config: &Config, action: NotificationsAction) -> anyhow::Result<()> {
    let store = PermissionStore::new(config.paths.state_file.clone());

    match action {
        NotificationsAction::Enable | NotificationsAction::Disable => {
            if !notifier::is_supported() {
                println!("{}", UNSUPPORTED_MESSAGE);
                return Ok(());
            }
            let permission = match action {
                NotificationsAction::Enable => Permission::Granted,
                _ => Permission::Denied,
            };
            store.set_permission(permission)?;
            info!("Notification permission set to {:?}", permission);
            println!("{}", permission.status_message());
            report(client::send_once(&config.daemon_address(), Request::Reschedule).await);
        }
        NotificationsAction::Status => {
            println!("{}", permission_line(store.permission()));
            report(client::send_once(&config.daemon_address(), Request::GetStatus).await);
        }
    }
    Ok(())
}

fn report(reply: anyhow::Result<Reply>) {
    match reply {
        Ok(Reply::Status { data }) => {
            match data.next_fire {
                Some(fire) => println!(
                    "Next notification at {} ({} delivery).",
                    fire.at.with_timezone(&chrono::Local).format("%H:%M"),
                    data.strategy
                ),
                None => println!("No notification scheduled."),
            }
            if let Some(ScheduleOutcome::Failed { reason }) = data.last_outcome {
                println!("Last scheduling attempt failed: {}", reason);
            }
        }
        Ok(Reply::Error { message }) => println!("Daemon error: {}", message),
        Err(e) => {
            debug!("Daemon unreachable: {}", e);
            println!("meow-daemon is not running; hourly notifications need it.");
        }
    }
}
