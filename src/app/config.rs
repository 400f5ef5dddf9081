// Application configuration types
//
// This module contains:
// - Constants for the UI loop and the log panel
// - AppConfig, the TOML-backed set of every tunable knob
// - Conversion into the core's CoreConfig

use crate::engine::{CoreConfig, SchedulerConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// UI frame interval (input poll timeout between redraws)
pub const UI_INTERVAL_MS: u64 = 50;

/// Lines retained by the in-memory event log
pub const LOG_CAPACITY: usize = 200;

/// Wheel delta reported for one terminal scroll notch (pixel-mode equivalent)
pub const WHEEL_NOTCH_DELTA: f64 = 100.0;

/// Config file name under the platform config directory
const CONFIG_DIR: &str = "boltmap";
const CONFIG_FILE: &str = "config.toml";

/// Natural Earth 1:110m countries, used when no landmass dataset is configured
pub const DEFAULT_LANDMASS_URL: &str = "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_admin_0_countries.geojson";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Every user-tunable knob; missing keys take their defaults
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Snapshot location: http(s) URL or JSON file path
    pub source: Option<String>,

    /// Landmass GeoJSON location: http(s) URL or file path; empty disables land
    pub landmass: Option<String>,

    /// Landmasses removed before fitting and drawing (name or id)
    pub excluded_landmasses: Vec<String>,

    pub poll_interval_ms: u64,
    pub fetch_timeout_ms: u64,

    /// Bolt fade duration
    pub fade_ms: u64,

    /// Maximum pending events / in-flight bolts
    pub max_pending: usize,

    /// Sliding window for pending events
    pub window_ms: u64,

    pub sound_cooldown_ms: u64,
    pub sound: bool,

    pub min_scale: f64,
    pub max_scale: f64,

    pub bolt_segments: usize,
    pub jitter_px: f64,

    /// Seed for bolt jitter and debug picks; random when absent
    pub seed: Option<u64>,

    /// tracing output file; tracing is off when absent
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: None,
            landmass: Some(DEFAULT_LANDMASS_URL.to_string()),
            excluded_landmasses: vec!["Antarctica".to_string(), "ATA".to_string()],
            poll_interval_ms: 10_000,
            fetch_timeout_ms: 5_000,
            fade_ms: 60_000,
            max_pending: 30,
            window_ms: 5_000,
            sound_cooldown_ms: 1_000,
            sound: true,
            min_scale: 0.5,
            max_scale: 10.0,
            bolt_segments: 7,
            jitter_px: 9.0,
            seed: None,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::config_path();
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        Self::from_toml(&content).map_err(|e| ConfigError::Parse { path, source: e })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let config: Self = toml::from_str(content)?;
        Ok(config.sanitized())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    /// Clamp values the core cannot work with
    pub fn sanitized(mut self) -> Self {
        self.max_pending = self.max_pending.max(1);
        self.bolt_segments = self.bolt_segments.max(1);
        self.poll_interval_ms = self.poll_interval_ms.max(100);
        if !self.jitter_px.is_finite() || self.jitter_px < 0.0 {
            self.jitter_px = 0.0;
        }
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            self.min_scale = 0.5;
        }
        if !(self.max_scale.is_finite() && self.max_scale > 0.0) {
            self.max_scale = 10.0;
        }
        if self.min_scale > self.max_scale {
            std::mem::swap(&mut self.min_scale, &mut self.max_scale);
        }
        if self.landmass.as_deref().is_some_and(|l| l.trim().is_empty()) {
            self.landmass = None;
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            scheduler: SchedulerConfig {
                window: Duration::from_millis(self.window_ms),
                cap: self.max_pending,
                fade: Duration::from_millis(self.fade_ms),
                sound_cooldown: Duration::from_millis(self.sound_cooldown_ms),
                bolt_segments: self.bolt_segments,
                jitter: self.jitter_px,
            },
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            excluded_landmasses: self.excluded_landmasses.clone(),
        }
    }
}
