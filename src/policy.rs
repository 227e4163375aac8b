//! Early termination.
//!
//! Subtitle tracks are tiny next to the audio and video they are muxed
//! with, and a renderer rarely needs every cue up front. The extractor
//! therefore stops reading once it has "enough": [`TerminationPolicy`] is the
//! pure decision, [`TerminationTracker`] the bookkeeping feeding it.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Default minimum number of cues every subtitle track must reach.
pub const DEFAULT_MIN_ENTRIES: usize = 50;
/// Default number of cues on any single track that ends extraction.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;
/// Consecutive cue-less events tolerated before extraction ends.
pub const DEFAULT_IDLE_CEILING: u64 = 10_000;
/// Default spacing of idle-path evaluations, in events.
pub const DEFAULT_CHECK_INTERVAL: u64 = 10_000;

/// Why extraction stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Every subtitle track reached the minimum cue count.
    MinimumReached,
    /// One track reached the cue cap.
    CapReached {
        /// Track position that hit the cap.
        track: usize,
    },
    /// Too many events passed without a new cue.
    Idle {
        /// Consecutive cue-less events observed.
        events: u64,
    },
}

impl Display for TerminationReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TerminationReason::MinimumReached => write!(f, "all subtitle tracks reached the minimum"),
            TerminationReason::CapReached { track } => {
                write!(f, "subtitle track #{} reached the cue cap", track + 1)
            }
            TerminationReason::Idle { events } => {
                write!(f, "{events} events without a new cue")
            }
        }
    }
}

/// Thresholds for early termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    /// Stop once every track has at least this many cues.
    pub min_entries: usize,
    /// Stop once any track has this many cues.
    pub max_entries: usize,
    /// Stop once more than this many consecutive events produced no cue.
    pub idle_ceiling: u64,
    /// Evaluate the idle path every this many idle events.
    pub check_interval: u64,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            min_entries: DEFAULT_MIN_ENTRIES,
            max_entries: DEFAULT_MAX_ENTRIES,
            idle_ceiling: DEFAULT_IDLE_CEILING,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl TerminationPolicy {
    /// Create the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-track minimum.
    #[must_use]
    pub fn min_entries(mut self, value: usize) -> Self {
        self.min_entries = value;
        self
    }

    /// Set the per-track cap.
    #[must_use]
    pub fn max_entries(mut self, value: usize) -> Self {
        self.max_entries = value;
        self
    }

    /// Set the idle ceiling.
    #[must_use]
    pub fn idle_ceiling(mut self, value: u64) -> Self {
        self.idle_ceiling = value;
        self
    }

    /// Set the idle evaluation interval. Clamped to at least 1.
    #[must_use]
    pub fn check_interval(mut self, value: u64) -> Self {
        self.check_interval = value.max(1);
        self
    }

    /// Decide whether to stop, given per-track cue counts and the number of
    /// consecutive events without a cue.
    ///
    /// Never stops when there are no subtitle tracks: attachments may still
    /// be ahead.
    pub fn evaluate(&self, counts: &[usize], idle_events: u64) -> Option<TerminationReason> {
        if counts.is_empty() {
            return None;
        }
        if counts.iter().all(|count| *count >= self.min_entries) {
            return Some(TerminationReason::MinimumReached);
        }
        if let Some(track) = counts.iter().position(|count| *count >= self.max_entries) {
            return Some(TerminationReason::CapReached { track });
        }
        if idle_events > self.idle_ceiling {
            return Some(TerminationReason::Idle {
                events: idle_events,
            });
        }
        None
    }
}

/// Per-session counters feeding a [`TerminationPolicy`].
///
/// The idle counter only starts once the first cue has arrived, so a long
/// cue-less intro does not end extraction before any subtitle is seen.
#[derive(Debug, Clone)]
pub struct TerminationTracker {
    policy: TerminationPolicy,
    counts: Vec<usize>,
    idle_events: u64,
    armed: bool,
}

impl TerminationTracker {
    /// Create a tracker for `track_count` subtitle tracks.
    pub fn new(policy: TerminationPolicy, track_count: usize) -> Self {
        Self {
            policy,
            counts: vec![0; track_count],
            idle_events: 0,
            armed: false,
        }
    }

    /// Cue counts per track position.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Consecutive events without a cue.
    pub fn idle_events(&self) -> u64 {
        self.idle_events
    }

    /// Record a new cue on `track` and evaluate.
    pub fn record_cue(&mut self, track: usize) -> Option<TerminationReason> {
        if let Some(count) = self.counts.get_mut(track) {
            *count += 1;
        }
        self.idle_events = 0;
        self.armed = true;
        self.policy.evaluate(&self.counts, self.idle_events)
    }

    /// Record an event that produced no cue; evaluates every
    /// `check_interval` idle events.
    pub fn record_idle(&mut self) -> Option<TerminationReason> {
        if !self.armed {
            return None;
        }
        self.idle_events += 1;
        if self.idle_events % self.policy.check_interval.max(1) == 0 {
            self.policy.evaluate(&self.counts, self.idle_events)
        } else {
            None
        }
    }
}
