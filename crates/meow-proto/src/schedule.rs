//! Background notification recurrence.
//!
//! Only one-shot primitives exist, so the hourly cadence is a chain: every
//! lifecycle event (first activation, click, close) arms exactly one next
//! notification.
//!
//! ```text
//!   Activated ─┐
//!   Clicked  ──┼─► schedule_next(now) ─► permission? ─no──► Idle
//!   Closed   ──┘                            │yes
//!                                           ▼
//!                             next_fire_time(now) ─► Trigger::arm
//!                                                      │      │
//!                                                   Armed   Failed (logged)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::SchedulingError;
use crate::notification::{NotificationPayload, Permission};
use crate::phrase::{PhraseBook, HOUR_MS};

/// When the next notification is due and what it says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireTime {
    pub at: DateTime<Utc>,
    /// Epoch hour starting at `at`.
    pub hour: i64,
    pub phrase_index: usize,
}

/// Start of the first hour strictly after `now`, and the phrase due then.
pub fn next_fire_time(now: DateTime<Utc>, book: &PhraseBook) -> FireTime {
    let hour = now.timestamp_millis().div_euclid(HOUR_MS) + 1;
    let at = DateTime::<Utc>::from_timestamp_millis(hour * HOUR_MS).unwrap_or(now);
    FireTime {
        at,
        hour,
        phrase_index: book.index_for_hour(hour),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStrategy {
    /// Host-level scheduled trigger; survives this process being stopped.
    Native,
    /// In-process delay timer; lost if the process goes away first.
    Timer,
}

impl std::fmt::Display for DeliveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStrategy::Native => f.write_str("native"),
            DeliveryStrategy::Timer => f.write_str("timer"),
        }
    }
}

/// Lifecycle events that re-arm the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Activated,
    Clicked,
    Closed,
}

/// Reads the current notification permission.  Read-only from here.
pub trait PermissionSource {
    fn permission(&self) -> Permission;
}

impl PermissionSource for Permission {
    fn permission(&self) -> Permission {
        *self
    }
}

/// A one-shot delivery mechanism.
#[async_trait]
pub trait Trigger {
    fn strategy(&self) -> DeliveryStrategy;

    /// Arrange for `payload` to be shown at `at`.
    async fn arm(&mut self, at: DateTime<Utc>, payload: NotificationPayload)
        -> Result<(), SchedulingError>;
}

#[async_trait]
impl<T: Trigger + Send + ?Sized> Trigger for Box<T> {
    fn strategy(&self) -> DeliveryStrategy {
        (**self).strategy()
    }

    async fn arm(
        &mut self,
        at: DateTime<Utc>,
        payload: NotificationPayload,
    ) -> Result<(), SchedulingError> {
        (**self).arm(at, payload).await
    }
}

/// Pick the native trigger when the platform offers one.
pub fn select_trigger(
    native: Option<Box<dyn Trigger + Send>>,
    fallback: Box<dyn Trigger + Send>,
) -> Box<dyn Trigger + Send> {
    match native {
        Some(trigger) => trigger,
        None => fallback,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleOutcome {
    /// Permission not granted; nothing armed.
    Idle,
    Armed {
        fire: FireTime,
        strategy: DeliveryStrategy,
    },
    /// Arming failed; already logged.  Recovery waits for the next event.
    Failed { reason: String },
}

pub struct NotificationScheduler<P, T> {
    book: PhraseBook,
    icon: String,
    permissions: P,
    trigger: T,
    last: Option<ScheduleOutcome>,
}

impl<P: PermissionSource, T: Trigger> NotificationScheduler<P, T> {
    pub fn new(book: PhraseBook, icon: impl Into<String>, permissions: P, trigger: T) -> Self {
        Self {
            book,
            icon: icon.into(),
            permissions,
            trigger,
            last: None,
        }
    }

    pub fn strategy(&self) -> DeliveryStrategy {
        self.trigger.strategy()
    }

    pub fn permission(&self) -> Permission {
        self.permissions.permission()
    }

    pub fn last_outcome(&self) -> Option<&ScheduleOutcome> {
        self.last.as_ref()
    }

    /// The fire time armed by the most recent successful `schedule_next`.
    pub fn next_fire(&self) -> Option<FireTime> {
        match self.last {
            Some(ScheduleOutcome::Armed { fire, .. }) => Some(fire),
            _ => None,
        }
    }

    pub async fn handle(&mut self, event: LifecycleEvent, now: DateTime<Utc>) -> ScheduleOutcome {
        debug!("scheduler: lifecycle event {:?}", event);
        self.schedule_next(now).await
    }

    /// Arm the notification for the next hour boundary.  Never fails: errors
    /// are logged and reported as [`ScheduleOutcome::Failed`], with no retry.
    pub async fn schedule_next(&mut self, now: DateTime<Utc>) -> ScheduleOutcome {
        let outcome = self.try_schedule(now).await;
        self.last = Some(outcome.clone());
        outcome
    }

    async fn try_schedule(&mut self, now: DateTime<Utc>) -> ScheduleOutcome {
        let permission = self.permissions.permission();
        if !permission.is_granted() {
            debug!("scheduler: permission is {:?}, nothing to arm", permission);
            return ScheduleOutcome::Idle;
        }

        let fire = next_fire_time(now, &self.book);
        let payload = NotificationPayload::phrase(self.book.get(fire.phrase_index), &self.icon);
        let strategy = self.trigger.strategy();

        match self.trigger.arm(fire.at, payload).await {
            Ok(()) => {
                info!(
                    "Notification scheduled for {} via {} (phrase #{})",
                    fire.at, strategy, fire.phrase_index
                );
                ScheduleOutcome::Armed { fire, strategy }
            }
            Err(e) => {
                error!("Error scheduling notification: {}", e);
                ScheduleOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
