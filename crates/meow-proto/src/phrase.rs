//! Hourly phrase rotation.
//!
//! The phrase shown at time `t` is `PHRASES[floor(t / 1h) mod len]`.  Nothing
//! is stored: the foreground tracker and the background scheduler both derive
//! the index from the wall clock, so they cannot drift apart.

use chrono::{DateTime, Utc};

pub const HOUR_MS: i64 = 60 * 60 * 1000;

pub const PHRASES: &[&str] = &[
    "Purr... Feeling cute today!",
    "Time for a digital head boop!",
    "Meow! Hope you're having a pawsome day!",
    "Did you know cats spend 70% of their lives sleeping? Goals!",
    "Just saw a virtual bird, it was riveting.",
    "Remember to stretch and land on your feet!",
    "Sending purrs and good vibes your way!",
    "Is it snack o'clock yet? Always is in my world.",
    "The keyboard is surprisingly comfy.",
    "Stay curious and keep exploring!",
    "If I fits, I sits... even in the digital realm.",
    "Chasing the red dot of destiny today.",
    "May your day be filled with sunbeams and gentle breezes.",
    "Let's make some mischief! Or maybe just nap.",
    "My meowtivation level is... surprisingly high right now!",
    "Just a little reminder that you're purrfect.",
    "Current mood: Zoomies, followed by a long nap.",
    "The internet is my giant litter box of information!",
    "Do you ever just stare blankly at a wall? It's an art form.",
    "Thinking about important cat stuff. You wouldn't understand.",
    "Meow does not have a race, Meow is a doll, dolls don't have races, silly.",
    "Jellybean-Sama!",
    "Arigato for educating Meow. Gomenasai, friends...Meow promises never to say that word again...",
    "Woof...hee-hee...bark, bark...",
    "Kawaii and small...uwu",
    "Meow is having a great day!",
    "Reading meow's discord questions!",
    "Meows gonna do unspeakable things to ur plush dada @zaptiee ( ´ ∀ `)ノ～ ♡",
    "KYAAAAA~~",
    "Rice Krispies are Meow's all-time favourite food!!",
    "nyahallo!!",
    "Meows selling a bodypillow!",
    "NYAN NYAN NIHAO NYAN!!",
];

/// Whole hours since the Unix epoch.
pub fn epoch_hour(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis().div_euclid(HOUR_MS)
}

/// Index into a phrase list of `len` entries for the hour containing `t`.
pub fn hour_bucket(t: DateTime<Utc>, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    epoch_hour(t).rem_euclid(len as i64) as usize
}

/// A fixed, non-empty list of phrases.
#[derive(Debug, Clone, Copy)]
pub struct PhraseBook {
    phrases: &'static [&'static str],
}

impl Default for PhraseBook {
    fn default() -> Self {
        Self { phrases: PHRASES }
    }
}

impl PhraseBook {
    /// `None` for an empty list.
    pub fn new(phrases: &'static [&'static str]) -> Option<Self> {
        if phrases.is_empty() {
            return None;
        }
        Some(Self { phrases })
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn index_at(&self, t: DateTime<Utc>) -> usize {
        hour_bucket(t, self.phrases.len())
    }

    pub fn index_for_hour(&self, hour: i64) -> usize {
        hour.rem_euclid(self.phrases.len() as i64) as usize
    }

    pub fn get(&self, index: usize) -> &'static str {
        self.phrases[index % self.phrases.len()]
    }

    pub fn phrase_at(&self, t: DateTime<Utc>) -> &'static str {
        self.get(self.index_at(t))
    }
}

// ── Foreground tracker ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Tracking { hour: i64 },
}

/// Emitted when the foreground notices a new hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseChange {
    pub hour: i64,
    pub phrase: &'static str,
    /// Permission was already granted, raise an immediate notification.
    pub notify: bool,
}

/// Foreground hour-boundary detector, driven by a polling timer.
///
/// Best effort only: it fires while the process is alive and polling.
#[derive(Debug, Clone)]
pub struct PhraseScheduler {
    book: PhraseBook,
    state: TrackerState,
}

impl PhraseScheduler {
    pub fn new(book: PhraseBook) -> Self {
        Self {
            book,
            state: TrackerState::Idle,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Phrase for the current hour; moves to `Tracking`.
    pub fn start(&mut self, now: DateTime<Utc>) -> &'static str {
        let hour = epoch_hour(now);
        self.state = TrackerState::Tracking { hour };
        self.book.get(self.book.index_for_hour(hour))
    }

    /// Called on every poll tick.  Returns a change only when the hour has
    /// advanced past the tracked one; an `Idle` tracker starts silently.
    pub fn poll(&mut self, now: DateTime<Utc>, permission_granted: bool) -> Option<PhraseChange> {
        let hour = epoch_hour(now);
        match self.state {
            TrackerState::Idle => {
                self.start(now);
                None
            }
            TrackerState::Tracking { hour: tracked } if hour > tracked => {
                self.state = TrackerState::Tracking { hour };
                Some(PhraseChange {
                    hour,
                    phrase: self.book.get(self.book.index_for_hour(hour)),
                    notify: permission_granted,
                })
            }
            TrackerState::Tracking { .. } => None,
        }
    }

    /// Phrase currently on display, if started.
    pub fn current(&self) -> Option<&'static str> {
        match self.state {
            TrackerState::Idle => None,
            TrackerState::Tracking { hour } => Some(self.book.get(self.book.index_for_hour(hour))),
        }
    }
}
