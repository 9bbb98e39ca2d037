// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Rolling history backing the debug surface named in spec §4.5
//! (`GET /debug/health-check-history`, `GET /debug/startup-status`).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// How many health-check events to retain before evicting the oldest.
const HISTORY_CAPACITY: usize = 500;

/// One health-check canary outcome, per spec §4.5 "Health checks".
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckEvent {
    /// Provider name checked.
    pub provider: String,
    /// Whether the canary inference call succeeded.
    pub healthy: bool,
    /// Round-trip latency of the canary call, in milliseconds.
    pub latency_ms: f64,
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
}

/// Snapshot of what the router discovered at startup, for operators
/// diagnosing a misconfigured region.
#[derive(Debug, Clone, Serialize)]
pub struct StartupStatus {
    /// When the process started.
    pub started_at: DateTime<Utc>,
    /// Number of provider entries loaded from configuration.
    pub providers_configured: usize,
    /// Regions covered by at least one configured provider.
    pub regions: Vec<String>,
}

/// Bounded ring buffer of recent health-check events, plus a
/// one-time startup snapshot.
pub struct DebugLog {
    events: Mutex<VecDeque<HealthCheckEvent>>,
    startup: Mutex<Option<StartupStatus>>,
}

impl DebugLog {
    /// An empty log.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
            startup: Mutex::new(None),
        }
    }

    /// Appends a health-check event, evicting the oldest if at
    /// capacity.
    pub fn record(&self, event: HealthCheckEvent) {
        let mut events = self.events.lock();
        if events.len() >= HISTORY_CAPACITY {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Every retained health-check event, oldest first.
    pub fn history(&self) -> Vec<HealthCheckEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Records the one-time startup snapshot.
    pub fn set_startup(&self, status: StartupStatus) {
        *self.startup.lock() = Some(status);
    }

    /// The startup snapshot, if the router has finished booting.
    pub fn startup(&self) -> Option<StartupStatus> {
        self.startup.lock().clone()
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_history_preserves_order() {
        let log = DebugLog::new();
        log.record(HealthCheckEvent {
            provider: "modal-us".to_string(),
            healthy: true,
            latency_ms: 120.0,
            checked_at: Utc::now(),
        });
        log.record(HealthCheckEvent {
            provider: "runpod-us".to_string(),
            healthy: false,
            latency_ms: 0.0,
            checked_at: Utc::now(),
        });
        let history = log.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].provider, "modal-us");
    }

    #[test]
    fn test_startup_status_round_trips() {
        let log = DebugLog::new();
        assert!(log.startup().is_none());
        log.set_startup(StartupStatus {
            started_at: Utc::now(),
            providers_configured: 2,
            regions: vec!["US".to_string()],
        });
        assert_eq!(log.startup().unwrap().providers_configured, 2);
    }
}
