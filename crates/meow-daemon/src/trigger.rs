//! Concrete one-shot triggers.
//!
//! - `SystemdTrigger` registers a transient user timer that re-runs this
//!   binary's `deliver` subcommand at the fire time.  Survives the daemon.
//! - `TimerTrigger` sleeps inside the daemon and hands the payload back to
//!   the core loop.  At most one is pending; re-arming replaces it.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meow_proto::error::SchedulingError;
use meow_proto::notification::NotificationPayload;
use meow_proto::phrase::epoch_hour;
use meow_proto::platform;
use meow_proto::schedule::{DeliveryStrategy, Trigger};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::DaemonEvent;

/// `systemd-run` talks to the user manager over D-Bus; give up rather than
/// stall the core loop.
const SYSTEMD_RUN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SystemdTrigger {
    systemd_run: PathBuf,
    exe: PathBuf,
    timeout: Duration,
}

impl SystemdTrigger {
    pub fn new(systemd_run: PathBuf, exe: PathBuf) -> Self {
        Self {
            systemd_run,
            exe,
            timeout: SYSTEMD_RUN_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `None` when `systemd-run` is not installed.
    pub fn detect() -> Option<Self> {
        let systemd_run = platform::find_systemd_run_binary()?;
        let exe = std::env::current_exe().ok()?;
        Some(Self::new(systemd_run, exe))
    }

    /// One unit per hour.  systemd refuses a second unit with the same name,
    /// see [`unit_already_exists`].
    pub fn unit_name(payload: &NotificationPayload, at: DateTime<Utc>) -> String {
        format!("{}-{}", payload.tag, epoch_hour(at))
    }

    pub fn args(&self, at: DateTime<Utc>, payload: &NotificationPayload) -> Vec<String> {
        vec![
            "--user".to_string(),
            format!("--unit={}", Self::unit_name(payload, at)),
            format!("--on-calendar={}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            "--timer-property=AccuracySec=1s".to_string(),
            "--collect".to_string(),
            self.exe.display().to_string(),
            "deliver".to_string(),
            "--title".to_string(),
            payload.title.clone(),
            "--body".to_string(),
            payload.body.clone(),
            "--icon".to_string(),
            payload.icon.clone(),
            "--tag".to_string(),
            payload.tag.clone(),
        ]
    }
}

/// The hour's unit is already queued, by an earlier daemon run or an earlier
/// re-arm in the same hour.  Its timer still fires.
pub fn unit_already_exists(stderr: &str) -> bool {
    stderr.contains("already exists") || stderr.contains("already loaded")
}

#[async_trait]
impl Trigger for SystemdTrigger {
    fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::Native
    }

    async fn arm(&mut self, at: DateTime<Utc>, payload: NotificationPayload) -> Result<(), SchedulingError> {
        if at <= Utc::now() {
            return Err(SchedulingError::Elapsed(at));
        }

        let program = self.systemd_run.display().to_string();
        let child = tokio::process::Command::new(&self.systemd_run)
            .args(self.args(at, &payload))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SchedulingError::Spawn {
                program: program.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(SchedulingError::Spawn { program, source }),
            Err(_) => {
                return Err(SchedulingError::TimedOut {
                    program,
                    after: self.timeout,
                })
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            if unit_already_exists(&stderr) {
                info!("Unit {} is already queued", Self::unit_name(&payload, at));
                return Ok(());
            }
            return Err(SchedulingError::Rejected { program, stderr });
        }
        debug!("systemd-run: {}", stderr);
        Ok(())
    }
}

pub struct TimerTrigger {
    event_tx: mpsc::Sender<DaemonEvent>,
    pending: Option<tokio::task::JoinHandle<()>>,
}

impl TimerTrigger {
    pub fn new(event_tx: mpsc::Sender<DaemonEvent>) -> Self {
        Self {
            event_tx,
            pending: None,
        }
    }
}

#[async_trait]
impl Trigger for TimerTrigger {
    fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::Timer
    }

    async fn arm(&mut self, at: DateTime<Utc>, payload: NotificationPayload) -> Result<(), SchedulingError> {
        let delay = (at - Utc::now())
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(SchedulingError::Elapsed(at))?;

        if self.event_tx.is_closed() {
            return Err(SchedulingError::ChannelClosed);
        }

        if let Some(previous) = self.pending.take() {
            previous.abort();
        }

        let tx = self.event_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(DaemonEvent::Deliver(payload)).await.is_err() {
                warn!("Timer fired after the daemon loop stopped");
            }
        }));
        Ok(())
    }
}

impl Drop for TimerTrigger {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
