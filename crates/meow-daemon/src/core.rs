//! DaemonCore: single-owner event loop for the notification chain.
//!
//! Socket clients and timer or notifier tasks send `DaemonEvent`s here.
//! DaemonCore owns the `NotificationScheduler` and its trigger exclusively;
//! every request that needs a reply carries a oneshot.
use chrono::Utc;
use meow_proto::config::Config;
use meow_proto::notification::{Dismissal, NotificationPayload};
use meow_proto::notifier;
use meow_proto::phrase::PhraseBook;
use meow_proto::protocol::{DaemonStatus, Reply, Request, PROTOCOL_VERSION};
use meow_proto::schedule::{LifecycleEvent, NotificationScheduler, Trigger};
use meow_proto::state::PermissionStore;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// ── DaemonEvent ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum DaemonEvent {
    /// A request from a socket client, with the channel for its reply.
    Request(Request, oneshot::Sender<Reply>),
    /// An in-process timer fired.
    Deliver(NotificationPayload),
    /// A notification shown by this process was dismissed.
    Dismissed(Dismissal),
    Shutdown,
}

pub type DaemonScheduler = NotificationScheduler<PermissionStore, Box<dyn Trigger + Send>>;

// ── DaemonCore ────────────────────────────────────────────────────────────────

pub struct DaemonCore {
    config: Config,
    scheduler: DaemonScheduler,
    event_tx: mpsc::Sender<DaemonEvent>,
}

impl DaemonCore {
    pub fn new(
        config: Config,
        trigger: Box<dyn Trigger + Send>,
        event_tx: mpsc::Sender<DaemonEvent>,
    ) -> Self {
        let permissions = PermissionStore::new(config.paths.state_file.clone());
        let scheduler = NotificationScheduler::new(
            PhraseBook::default(),
            config.notifications.icon.clone(),
            permissions,
            trigger,
        );
        Self {
            config,
            scheduler,
            event_tx,
        }
    }

    /// Run until `Shutdown` or until every sender is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<DaemonEvent>) -> anyhow::Result<()> {
        info!(
            "DaemonCore: starting event loop ({} delivery)",
            self.scheduler.strategy()
        );
        self.on_lifecycle(LifecycleEvent::Activated).await;

        while let Some(evt) = event_rx.recv().await {
            match evt {
                DaemonEvent::Shutdown => {
                    info!("DaemonCore: shutdown requested");
                    return Ok(());
                }

                DaemonEvent::Request(request, reply_tx) => {
                    let reply = self.handle_request(request).await;
                    if reply_tx.send(reply).is_err() {
                        debug!("DaemonCore: client left before the reply");
                    }
                }

                DaemonEvent::Deliver(payload) => self.deliver(payload),

                DaemonEvent::Dismissed(dismissal) => {
                    self.on_lifecycle(lifecycle_for(dismissal)).await;
                }
            }
        }

        info!("DaemonCore: event channel closed, shutting down");
        Ok(())
    }

    pub async fn handle_request(&mut self, request: Request) -> Reply {
        debug!("DaemonCore: request {:?}", request);
        match request {
            Request::Lifecycle { event } => self.on_lifecycle(event).await,
            Request::Reschedule => {
                self.scheduler.schedule_next(Utc::now()).await;
            }
            Request::GetStatus => {}
        }
        Reply::Status {
            data: self.status(),
        }
    }

    async fn on_lifecycle(&mut self, event: LifecycleEvent) {
        if event == LifecycleEvent::Clicked {
            if let Err(e) = notifier::open_page(&self.config.notifications.open_page).await {
                warn!("Could not open {}: {}", self.config.notifications.open_page, e);
            }
        }
        self.scheduler.handle(event, Utc::now()).await;
    }

    /// Show a timer-delivered notification.  The dismissal comes back as an
    /// event, so the loop keeps serving requests meanwhile.
    fn deliver(&self, payload: NotificationPayload) {
        if !self.scheduler.permission().is_granted() {
            info!("Permission revoked since arming, dropping notification");
            return;
        }
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            match notifier::show_and_wait(&payload).await {
                Ok(dismissal) => {
                    let _ = tx.send(DaemonEvent::Dismissed(dismissal)).await;
                }
                Err(e) => {
                    // nothing to click or close; re-arm from here
                    warn!("Could not show notification: {}", e);
                    let _ = tx.send(DaemonEvent::Dismissed(Dismissal::Closed)).await;
                }
            }
        });
    }

    pub fn status(&self) -> DaemonStatus {
        DaemonStatus {
            protocol_version: PROTOCOL_VERSION,
            strategy: self.scheduler.strategy(),
            permission: self.scheduler.permission(),
            next_fire: self.scheduler.next_fire(),
            last_outcome: self.scheduler.last_outcome().cloned(),
        }
    }
}

pub fn lifecycle_for(dismissal: Dismissal) -> LifecycleEvent {
    match dismissal {
        Dismissal::Clicked => LifecycleEvent::Clicked,
        Dismissal::Closed => LifecycleEvent::Closed,
    }
}
