use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use api_token::Decision;

/// Label for requests served without authentication.
pub const ANONYMOUS: &str = "<anonymous>";
/// Label for every denied request, whatever the reason.
pub const DENIED: &str = "<denied>";

/// Minutes of history kept per label.
pub const RETENTION_MINUTES: u64 = 60;

type MinuteCounts = HashMap<u64, HashMap<u16, u64>>;

#[derive(Default)]
struct Inner {
    counts: HashMap<String, MinuteCounts>,
    // Newest minute seen; pruning runs when it advances.
    latest: u64,
}

impl Inner {
    fn prune(&mut self) {
        let latest = self.latest;
        self.counts.retain(|_, per_label| {
            per_label.retain(|minute, _| minute + RETENTION_MINUTES > latest);
            !per_label.is_empty()
        });
    }
}

/// In-memory per-minute status counts keyed by token label, bounded to the
/// last [`RETENTION_MINUTES`].
#[derive(Default)]
pub struct Metrics {
    inner: std::sync::Mutex<Inner>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics label for an auth outcome: the token id, or [`DENIED`].
    pub fn label_for(decision: &Decision) -> String {
        match decision.token_id() {
            Some(id) => format!("token:{id}"),
            None => DENIED.to_string(),
        }
    }

    /// Record a status code for a label at the current wall-clock time.
    pub fn record(&self, label: &str, status: u16) {
        self.record_at(label, status, SystemTime::now());
    }

    /// Record a status code at a provided time (useful for tests).
    pub fn record_at(&self, label: &str, status: u16, at: SystemTime) {
        let minute = Self::minute_bucket(at);
        let Ok(mut guard) = self.inner.lock() else {
            log::warn!("metrics store poisoned, dropping sample for {}", label);
            return;
        };
        if minute + RETENTION_MINUTES <= guard.latest {
            return;
        }
        if minute > guard.latest {
            guard.latest = minute;
            guard.prune();
        }
        let per_label = guard.counts.entry(label.to_string()).or_default();
        let per_minute = per_label.entry(minute).or_default();
        *per_minute.entry(status).or_insert(0) += 1;
    }

    /// Per-minute counts for a label. Empty when the label is unknown.
    pub fn snapshot(&self, label: &str) -> MinuteCounts {
        self.inner
            .lock()
            .ok()
            .and_then(|guard| guard.counts.get(label).cloned())
            .unwrap_or_default()
    }

    /// Status counts for a label summed over the retained minutes.
    pub fn totals(&self, label: &str) -> HashMap<u16, u64> {
        let mut totals = HashMap::new();
        for minute in self.snapshot(label).values() {
            for (code, count) in minute {
                *totals.entry(*code).or_insert(0) += *count;
            }
        }
        totals
    }

    fn minute_bucket(at: SystemTime) -> u64 {
        at.duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
            / 60
    }
}
