// Application state management
//
// AppState wires the map core to its collaborators: the snapshot source
// polled on a timer through a background worker, the sound cue sink, and the
// in-memory event log shown in the log panel. Fetches never run on the UI
// loop; their results are drained each tick and fed to the core there.
// Configuration types live in the config submodule.

pub mod config;
pub mod event;

pub use config::{AppConfig, LOG_CAPACITY, UI_INTERVAL_MS, WHEEL_NOTCH_DELTA};

use crate::audio::{play_best_effort, SoundCue};
use crate::engine::{Admission, MapCore};
use crate::geo::Landmass;
use crate::net::{ChannelStatus, PollWorker, Snapshot, SnapshotSource, SourceError};
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use ratatui::layout::Rect;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Severity of a log panel line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Warn,
    Channel(ChannelStatus),
}

/// One line of the log panel
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub kind: LogKind,
    pub message: String,
}

/// Main application state
pub struct AppState {
    /// Whether the application is running
    pub running: bool,

    /// Rendering and animation core
    pub core: MapCore,

    /// Worker running the snapshot source; without one the map only shows landmasses
    poller: Option<PollWorker>,

    /// A fetch was requested and its result has not arrived yet
    in_flight: bool,

    /// Sound cue sink (bell or silent)
    sound: Box<dyn SoundCue>,

    poll_interval: Duration,

    /// Time of the last poll attempt, None forces a poll on the next tick
    last_poll: Option<Instant>,

    /// Monotonic debug trigger counter
    pub trigger_count: u64,

    /// Label of the node under the mouse pointer
    pub hovered: Option<String>,

    /// Most recent fetch failure, cleared on the next success
    pub fetch_error: Option<String>,

    /// Bounded event log, newest last
    pub logs: VecDeque<LogEntry>,

    /// Inner area of the map panel from the last frame, for mouse mapping
    pub map_area: Rect,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        landmasses: &[Landmass],
        source: Option<Box<dyn SnapshotSource>>,
        sound: Box<dyn SoundCue>,
        rng: StdRng,
    ) -> Self {
        let mut state = Self {
            running: true,
            core: MapCore::new(config.core_config(), landmasses, rng),
            poller: None,
            in_flight: false,
            sound,
            poll_interval: config.poll_interval(),
            last_poll: None,
            trigger_count: 0,
            hovered: None,
            fetch_error: None,
            logs: VecDeque::with_capacity(LOG_CAPACITY),
            map_area: Rect::default(),
        };

        match source.map(PollWorker::spawn) {
            Some(Ok(worker)) => {
                state.push_log(LogKind::Info, format!("Polling {}", worker.describe()));
                state.poller = Some(worker);
            }
            Some(Err(e)) => {
                warn!(error = %e, "Cannot start poll worker");
                state.push_log(LogKind::Warn, format!("Polling disabled: {}", e));
            }
            None => state.push_log(
                LogKind::Warn,
                "No snapshot source configured, press 'l' for demo bolts once nodes exist"
                    .to_string(),
            ),
        }
        state
    }

    /// Timer step: take in finished fetches, request the next one when
    /// due, then retire faded bolts
    pub fn on_tick(&mut self, now: Instant) {
        self.collect_fetches(now);

        let due = match self.last_poll {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.poll_interval,
        };
        if due && !self.in_flight {
            self.request_fetch(now);
        }
        self.core.on_tick(now);
    }

    /// Request a poll on the next tick
    pub fn force_poll(&mut self) {
        self.last_poll = None;
    }

    fn request_fetch(&mut self, now: Instant) {
        self.last_poll = Some(now);
        let Some(poller) = self.poller.as_ref() else {
            return;
        };

        info!(source = %poller.describe(), "Fetching snapshot");
        if poller.request() {
            self.in_flight = true;
        } else {
            warn!("Poll worker is gone, polling stopped");
            self.poller = None;
            self.push_log(LogKind::Warn, "Polling stopped".to_string());
        }
    }

    fn collect_fetches(&mut self, now: Instant) {
        let finished: Vec<_> = match self.poller.as_ref() {
            Some(poller) => std::iter::from_fn(|| poller.try_result()).collect(),
            None => Vec::new(),
        };
        for result in finished {
            self.in_flight = false;
            self.on_fetch(result, now);
        }
    }

    /// Feed one fetch result to the core
    ///
    /// A failed fetch is logged and the cycle skipped; the previous snapshot
    /// stays authoritative.
    fn on_fetch(&mut self, result: Result<Snapshot, SourceError>, now: Instant) {
        match result {
            Ok(snapshot) => {
                let summary = format!(
                    "Snapshot: {} nodes, {} channels",
                    snapshot.nodes.len(),
                    snapshot.channels.len()
                );
                info!(
                    nodes = snapshot.nodes.len(),
                    channels = snapshot.channels.len(),
                    "Snapshot fetched"
                );
                self.fetch_error = None;
                self.push_log(LogKind::Info, summary);
                let admission = self.core.accept_snapshot(snapshot, now);
                self.apply(admission);
            }
            Err(e) => {
                warn!(error = %e, "Snapshot fetch failed, keeping previous snapshot");
                self.push_log(LogKind::Warn, format!("Fetch failed: {}", e));
                self.fetch_error = Some(e.to_string());
            }
        }
    }

    /// Tick, then wait for the fetch that tick requested to land
    #[cfg(test)]
    pub(crate) fn tick_and_settle(&mut self, now: Instant) {
        self.on_tick(now);
        if !self.in_flight {
            return;
        }
        let result = self
            .poller
            .as_ref()
            .and_then(|p| p.wait_result(Duration::from_secs(5)));
        if let Some(result) = result {
            self.in_flight = false;
            self.on_fetch(result, now);
        }
    }

    /// Debug trigger: bump the counter and request one ad-hoc bolt
    pub fn trigger_debug_bolt(&mut self, now: Instant) {
        self.trigger_count += 1;
        let admission = self.core.on_trigger(self.trigger_count, now);
        if admission.events.is_empty() {
            self.push_log(LogKind::Warn, "Debug bolt needs at least two nodes".to_string());
        }
        self.apply(admission);
    }

    pub fn on_resize(&mut self, width: f64, height: f64) {
        if self.core.on_resize(width, height) {
            tracing::debug!(width, height, "Canvas resized, scene rebuilt");
        }
    }

    pub fn on_wheel(&mut self, delta_y: f64, anchor: (f64, f64)) {
        self.core.on_wheel(delta_y, anchor);
    }

    pub fn reset_zoom(&mut self) {
        self.core.reset_zoom();
        self.push_log(LogKind::Info, "Zoom reset".to_string());
    }

    pub fn on_hover(&mut self, point: (f64, f64)) {
        self.hovered = self.core.hit_test(point).map(|m| m.label.clone());
    }

    /// Log admitted events and ring the bell when the cooldown allows
    fn apply(&mut self, admission: Admission) {
        if admission.baseline {
            self.push_log(LogKind::Info, "Baseline established".to_string());
        }
        if admission.truncated > 0 {
            self.push_log(
                LogKind::Warn,
                format!("Burst truncated: {} events dropped", admission.truncated),
            );
        }
        for event in &admission.events {
            self.push_log(
                LogKind::Channel(event.status),
                format!("Channel {} {}", event.channel_id, event.status.as_str()),
            );
        }
        if admission.play_sound {
            play_best_effort(self.sound.as_mut());
        }
    }

    pub fn push_log(&mut self, kind: LogKind, message: String) {
        if self.logs.len() >= LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            at: Local::now(),
            kind,
            message,
        });
    }
}
