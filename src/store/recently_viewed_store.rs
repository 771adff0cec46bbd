use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::state::StateCell;
use crate::models::{DoctorSummary, RecentDoctor};

/// Storage key of the persisted recently-viewed list.
pub const RECENTLY_VIEWED_STORAGE_KEY: &str = "recently-viewed-doctors";
pub const MAX_RECENT_DOCTORS: usize = 20;
pub const DEFAULT_RECENT_LIMIT: usize = 10;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentlyViewedState {
    pub recent_doctors: Vec<RecentDoctor>,
}

impl RecentlyViewedState {
    /// Moves `doctor` to the front stamped with `now`, keeping ids unique and
    /// the list bounded. Stamps never go backwards: if `now` is not past the
    /// newest entry, the newest stamp plus one millisecond is used.
    pub fn add(&mut self, doctor: DoctorSummary, now: DateTime<Utc>) {
        let viewed_at = match self.recent_doctors.iter().map(|d| d.viewed_at).max() {
            Some(newest) if now <= newest => newest + Duration::milliseconds(1),
            _ => now,
        };

        self.recent_doctors.retain(|d| d.id() != doctor.id);
        self.recent_doctors
            .insert(0, RecentDoctor { doctor, viewed_at });
        self.recent_doctors.truncate(MAX_RECENT_DOCTORS);
    }

    pub fn clear(&mut self) {
        self.recent_doctors.clear();
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<RecentDoctor> {
        let mut doctors = self.recent_doctors.clone();
        doctors.sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));
        doctors.truncate(limit);
        doctors
    }

    /// Re-establishes the list invariants on state read from storage.
    pub fn normalize(&mut self) {
        self.recent_doctors
            .sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));
        let mut seen = std::collections::HashSet::new();
        self.recent_doctors
            .retain(|d| seen.insert(d.id().to_string()));
        self.recent_doctors.truncate(MAX_RECENT_DOCTORS);
    }
}

/// Bounded, deduplicated, most-recent-first list of viewed doctors.
pub struct RecentlyViewedStore {
    state: StateCell<RecentlyViewedState>,
    clock: Clock,
}

impl Default for RecentlyViewedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentlyViewedStore {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            state: StateCell::new(RecentlyViewedState::default()),
            clock: Box::new(clock),
        }
    }

    pub fn state(&self) -> RecentlyViewedState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecentlyViewedState> {
        self.state.subscribe()
    }

    pub(crate) fn cell(&self) -> &StateCell<RecentlyViewedState> {
        &self.state
    }

    pub(crate) fn restore(&self, mut persisted: RecentlyViewedState) {
        persisted.normalize();
        self.state.update(|s| *s = persisted);
    }

    pub fn add_recent_doctor(&self, doctor: DoctorSummary) {
        let now = (self.clock)();
        self.state.update(|s| s.add(doctor, now));
    }

    pub fn clear_recent_doctors(&self) {
        self.state.update(RecentlyViewedState::clear);
    }

    pub fn get_recent_doctors(&self, limit: usize) -> Vec<RecentDoctor> {
        self.state.read(|s| s.recent(limit))
    }

    pub fn len(&self) -> usize {
        self.state.read(|s| s.recent_doctors.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
