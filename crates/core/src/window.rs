//! Submission window configuration and the gate that enforces it.
//!
//! Windows are half-open intervals `[start_at, end_at)`. The configuration is
//! a singleton replaced as a whole by an administrator; an empty
//! configuration closes the gate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::store::{Actor, WindowStore};
use crate::types::Timestamp;

/// One permitted time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_at: Timestamp,
    pub end_at: Timestamp,
}

impl TimeWindow {
    /// Check whether `now` falls inside `[start_at, end_at)`.
    pub fn contains(&self, now: Timestamp) -> bool {
        self.start_at <= now && now < self.end_at
    }
}

/// Check whether `now` falls inside at least one window.
pub fn any_open(windows: &[TimeWindow], now: Timestamp) -> bool {
    windows.iter().any(|w| w.contains(now))
}

/// Validate a window set and return it sorted by `start_at`.
///
/// Every window must have `start_at < end_at`, and no two windows may
/// overlap. Windows that only touch (`a.end_at == b.start_at`) are accepted.
pub fn validate_windows(windows: &[TimeWindow]) -> Result<Vec<TimeWindow>, CoreError> {
    for (index, window) in windows.iter().enumerate() {
        if window.start_at >= window.end_at {
            return Err(CoreError::InvalidWindowConfig(format!(
                "Window {index} starts at {} which is not before its end {}",
                window.start_at, window.end_at
            )));
        }
    }

    let mut sorted = windows.to_vec();
    sorted.sort_by_key(|w| (w.start_at, w.end_at));

    for pair in sorted.windows(2) {
        if pair[0].end_at > pair[1].start_at {
            return Err(CoreError::InvalidWindowConfig(format!(
                "Window {} - {} overlaps window {} - {}",
                pair[0].start_at, pair[0].end_at, pair[1].start_at, pair[1].end_at
            )));
        }
    }

    Ok(sorted)
}

/// Decides whether gated transitions are currently permitted.
///
/// Every check reads the committed configuration from the [`WindowStore`];
/// nothing is cached, so a replacement affects the very next check.
#[derive(Clone)]
pub struct WindowGate {
    store: Arc<dyn WindowStore>,
}

impl WindowGate {
    pub fn new(store: Arc<dyn WindowStore>) -> Self {
        Self { store }
    }

    /// Check whether `now` is inside a configured window.
    pub async fn is_open(&self, now: Timestamp) -> Result<bool, CoreError> {
        let windows = self.store.load().await?;
        Ok(any_open(&windows, now))
    }

    /// The committed configuration, sorted by start.
    pub async fn windows(&self) -> Result<Vec<TimeWindow>, CoreError> {
        let mut windows = self.store.load().await?;
        windows.sort_by_key(|w| (w.start_at, w.end_at));
        Ok(windows)
    }

    /// Replace the configuration. Only administrators may do this.
    pub async fn set_windows(
        &self,
        actor: &Actor,
        windows: &[TimeWindow],
    ) -> Result<Vec<TimeWindow>, CoreError> {
        if !actor.is_admin {
            return Err(CoreError::Forbidden(
                "Only administrators may change the window settings".into(),
            ));
        }
        let sorted = validate_windows(windows)?;
        self.store.replace(&sorted).await?;
        tracing::info!(
            actor = %actor.open_id,
            window_count = sorted.len(),
            "Window settings replaced"
        );
        Ok(sorted)
    }
}
