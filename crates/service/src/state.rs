//! Shared Application State
//!
//! Thread-safe state holding the sidecar factory and recent build records.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use sidecar_gen::{ChainConfig, SidecarFactory};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::ServiceConfig;

/// Outcome of a sidecar build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    /// All sidecars built
    Built,
    /// Build rejected or failed
    Failed,
    /// Build did not finish in time
    TimedOut,
}

/// Record of the last build attempt for a slot
#[derive(Debug, Clone, Serialize)]
pub struct BuildRecord {
    pub slot: u64,
    pub status: BuildStatus,
    /// Number of sidecars produced
    pub sidecars: usize,
    /// Header body root, once known
    pub body_root: Option<String>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    config: ServiceConfig,
    factory: SidecarFactory<ChainConfig>,
    /// Latest build record per slot
    builds: DashMap<u64, BuildRecord>,
    /// Highest slot seen in a build request
    head_slot: AtomicU64,
    builds_succeeded: AtomicU64,
    builds_failed: AtomicU64,
    /// Service start time
    start_time: std::time::Instant,
    /// Last error message
    last_error: RwLock<Option<String>>,
}

impl AppState {
    /// Create new application state
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                factory: SidecarFactory::new(config.chain),
                config,
                builds: DashMap::new(),
                head_slot: AtomicU64::new(0),
                builds_succeeded: AtomicU64::new(0),
                builds_failed: AtomicU64::new(0),
                start_time: std::time::Instant::now(),
                last_error: RwLock::new(None),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn factory(&self) -> &SidecarFactory<ChainConfig> {
        &self.inner.factory
    }

    /// Highest slot a build was requested for
    #[must_use]
    pub fn head_slot(&self) -> u64 {
        self.inner.head_slot.load(Ordering::Relaxed)
    }

    /// Get uptime in seconds
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    /// Store a build record, replacing any earlier one for the slot, and
    /// drop records older than the configured history window.
    pub fn record_build(&self, record: BuildRecord) {
        match record.status {
            BuildStatus::Built => {
                self.inner.builds_succeeded.fetch_add(1, Ordering::Relaxed);
            }
            BuildStatus::Failed | BuildStatus::TimedOut => {
                self.inner.builds_failed.fetch_add(1, Ordering::Relaxed);
                self.set_error(record.error.clone());
            }
        }

        let head = self
            .inner
            .head_slot
            .fetch_max(record.slot, Ordering::Relaxed)
            .max(record.slot);
        self.inner.builds.insert(record.slot, record);

        let history = self.inner.config.build_history;
        self.inner
            .builds
            .retain(|slot, _| slot.saturating_add(history) > head);
    }

    /// Get the build record for a slot
    #[must_use]
    pub fn get_build(&self, slot: u64) -> Option<BuildRecord> {
        self.inner.builds.get(&slot).map(|r| r.clone())
    }

    /// Get build counts
    #[must_use]
    pub fn build_counts(&self) -> BuildCounts {
        BuildCounts {
            succeeded: self.inner.builds_succeeded.load(Ordering::Relaxed),
            failed: self.inner.builds_failed.load(Ordering::Relaxed),
            tracked_slots: self.inner.builds.len(),
        }
    }

    /// Set last error
    pub fn set_error(&self, error: Option<String>) {
        *self.inner.last_error.write() = error;
    }

    /// Get last error
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.read().clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServiceConfig::default())
    }
}

/// Build counters since startup
#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildCounts {
    pub succeeded: u64,
    pub failed: u64,
    pub tracked_slots: usize,
}
