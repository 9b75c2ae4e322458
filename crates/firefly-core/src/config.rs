//! Configuration loading and typed config structures for the Firefly
//! simulation.
//!
//! The configuration lives in `firefly-config.yaml` in the working
//! directory. Every field has a default, so a missing file, a missing
//! section, or an empty document all produce a runnable configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::clock::Coupling;
use crate::grid::{Activation, GridBlueprint};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed correctly but cannot drive a simulation.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `firefly-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Grid dimensions, population density, and coupling reach.
    #[serde(default)]
    pub grid: GridConfig,

    /// Flash timing and clock cadence.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Delivery cadence and per-session buffering.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Listening address and HTTP paths.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Largest accepted grid side length.
///
/// A tick costs `O(N^2 * r^2)` and the grid holds `N^2` cells.
pub const MAX_GRID_SIZE: usize = 1024;

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override the server section:
    /// - `FIREFLY_HOST` overrides `server.host`
    /// - `FIREFLY_PORT` overrides `server.port`
    /// - `FIREFLY_STATIC_DIR` overrides `server.static_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::deserialize_yaml(&contents)?.with_env_overrides()
    }

    /// Load from `path` if it exists, otherwise start from the defaults.
    /// Environment overrides apply either way.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_file`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Self::default().with_env_overrides()
        }
    }

    /// Parse configuration from a YAML string. The environment is not
    /// consulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config = Self::deserialize_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn deserialize_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserialises to unit, not to a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        self.server.apply_env_overrides()?;
        self.validate()?;
        Ok(self)
    }

    /// Check that every value can drive a simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };

        if self.grid.size == 0 {
            return invalid("grid.size must be at least 1");
        }
        if self.grid.size > MAX_GRID_SIZE {
            return invalid("grid.size must not exceed 1024");
        }
        let p = self.grid.activation_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return invalid("grid.activation_probability must be within [0, 1]");
        }
        if self.timing.cycle_period_min_ms >= self.timing.cycle_period_max_ms {
            return invalid("timing.cycle_period_min_ms must be below cycle_period_max_ms");
        }
        if self.timing.flash_duration_min_ms >= self.timing.flash_duration_max_ms {
            return invalid("timing.flash_duration_min_ms must be below flash_duration_max_ms");
        }
        if self.timing.tick_interval_ms == 0 {
            return invalid("timing.tick_interval_ms must be at least 1");
        }
        if self.broadcast.interval_ms == 0 {
            return invalid("broadcast.interval_ms must be at least 1");
        }
        if self.broadcast.session_queue_capacity == 0 {
            return invalid("broadcast.session_queue_capacity must be at least 1");
        }
        if !self.server.ws_path.starts_with('/') {
            return invalid("server.ws_path must start with '/'");
        }
        Ok(())
    }

    /// Size and activation parameters used to build every fresh grid.
    pub fn grid_blueprint(&self) -> GridBlueprint {
        GridBlueprint {
            size: self.grid.size,
            activation: Activation {
                probability: self.grid.activation_probability,
                cycle_period_ms: self.timing.cycle_period_min_ms..self.timing.cycle_period_max_ms,
                flash_duration_ms: self.timing.flash_duration_min_ms
                    ..self.timing.flash_duration_max_ms,
            },
        }
    }

    /// Parameters of the neighbour coupling rule.
    ///
    /// The radius is clamped to half the grid size; beyond that the
    /// window already covers the whole torus.
    pub const fn coupling(&self) -> Coupling {
        let half = self.grid.size / 2;
        let radius = if self.grid.neighbor_radius > half {
            half
        } else {
            self.grid.neighbor_radius
        };
        Coupling {
            radius,
            advance: Duration::from_millis(self.timing.coupling_advance_ms),
        }
    }
}

/// Grid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridConfig {
    /// Side length N of the N x N torus.
    #[serde(default = "default_grid_size")]
    pub size: usize,

    /// Probability that any one cell is populated at (re)start.
    #[serde(default = "default_activation_probability")]
    pub activation_probability: f64,

    /// Chebyshev radius searched for flashing neighbours.
    #[serde(default = "default_neighbor_radius")]
    pub neighbor_radius: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: default_grid_size(),
            activation_probability: default_activation_probability(),
            neighbor_radius: default_neighbor_radius(),
        }
    }
}

/// Flash timing and clock cadence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Shortest cycle period (inclusive).
    #[serde(default = "default_cycle_period_min_ms")]
    pub cycle_period_min_ms: u64,

    /// Longest cycle period (exclusive).
    #[serde(default = "default_cycle_period_max_ms")]
    pub cycle_period_max_ms: u64,

    /// Shortest flash (inclusive).
    #[serde(default = "default_flash_duration_min_ms")]
    pub flash_duration_min_ms: u64,

    /// Longest flash (exclusive).
    #[serde(default = "default_flash_duration_max_ms")]
    pub flash_duration_max_ms: u64,

    /// How far a flashing neighbour pulls a dim cell's next flash.
    #[serde(default = "default_coupling_advance_ms")]
    pub coupling_advance_ms: u64,

    /// Simulation clock period.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seconds between scheduled restarts (0 = never).
    #[serde(default = "default_restart_interval_secs")]
    pub restart_interval_secs: u64,
}

impl TimingConfig {
    /// Simulation clock period as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Scheduled restart period, or `None` when disabled.
    pub const fn restart_interval(&self) -> Option<Duration> {
        if self.restart_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.restart_interval_secs))
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cycle_period_min_ms: default_cycle_period_min_ms(),
            cycle_period_max_ms: default_cycle_period_max_ms(),
            flash_duration_min_ms: default_flash_duration_min_ms(),
            flash_duration_max_ms: default_flash_duration_max_ms(),
            coupling_advance_ms: default_coupling_advance_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            restart_interval_secs: default_restart_interval_secs(),
        }
    }
}

/// Broadcast configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Heartbeat period of the dispatcher.
    #[serde(default = "default_broadcast_interval_ms")]
    pub interval_ms: u64,

    /// Frames buffered per session before new frames are dropped.
    #[serde(default = "default_session_queue_capacity")]
    pub session_queue_capacity: usize,
}

impl BroadcastConfig {
    /// Dispatcher heartbeat as a [`Duration`].
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_broadcast_interval_ms(),
            session_queue_capacity: default_session_queue_capacity(),
        }
    }
}

/// Listening address and HTTP paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the viewer `WebSocket` endpoint.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Directory of pre-built front-end files.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl ServerSettings {
    /// Override server settings with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `FIREFLY_PORT` is not a port
    /// number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("FIREFLY_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("FIREFLY_PORT") {
            self.port = val.parse().map_err(|e| ConfigError::Invalid {
                reason: format!("FIREFLY_PORT={val}: {e}"),
            })?;
        }
        if let Ok(val) = std::env::var("FIREFLY_STATIC_DIR") {
            self.static_dir = val;
        }
        Ok(())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            static_dir: default_static_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_grid_size() -> usize {
    30
}

const fn default_activation_probability() -> f64 {
    0.12
}

const fn default_neighbor_radius() -> usize {
    10
}

const fn default_cycle_period_min_ms() -> u64 {
    4000
}

const fn default_cycle_period_max_ms() -> u64 {
    6000
}

const fn default_flash_duration_min_ms() -> u64 {
    600
}

const fn default_flash_duration_max_ms() -> u64 {
    733
}

const fn default_coupling_advance_ms() -> u64 {
    250
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_restart_interval_secs() -> u64 {
    3600
}

const fn default_broadcast_interval_ms() -> u64 {
    100
}

const fn default_session_queue_capacity() -> usize {
    4
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8443
}

fn default_ws_path() -> String {
    String::from("/ws")
}

fn default_static_dir() -> String {
    String::from("./static")
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid.size, 30);
        assert_eq!(config.grid.neighbor_radius, 10);
        assert_eq!(config.timing.coupling_advance_ms, 250);
        assert_eq!(config.timing.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.broadcast.interval(), Duration::from_millis(100));
        assert_eq!(config.server.ws_path, "/ws");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
grid:
  size: 12
  activation_probability: 0.5
  neighbor_radius: 2

timing:
  cycle_period_min_ms: 1000
  cycle_period_max_ms: 2000
  flash_duration_min_ms: 100
  flash_duration_max_ms: 200
  coupling_advance_ms: 50
  tick_interval_ms: 20
  restart_interval_secs: 0

broadcast:
  interval_ms: 40
  session_queue_capacity: 8

server:
  host: "127.0.0.1"
  port: 9000
  ws_path: "/stream"
  static_dir: "web/dist"

logging:
  level: "debug"
"#;

        let config = SimulationConfig::parse(yaml).unwrap();

        assert_eq!(config.grid.size, 12);
        assert_eq!(config.grid.neighbor_radius, 2);
        assert_eq!(config.timing.restart_interval(), None);
        assert_eq!(config.broadcast.session_queue_capacity, 8);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.ws_path, "/stream");
        assert_eq!(config.logging.level, "debug");

        let blueprint = config.grid_blueprint();
        assert_eq!(blueprint.size, 12);
        assert_eq!(blueprint.activation.cycle_period_ms, 1000..2000);
        assert_eq!(blueprint.activation.flash_duration_ms, 100..200);

        let coupling = config.coupling();
        assert_eq!(coupling.radius, 2);
        assert_eq!(coupling.advance, Duration::from_millis(50));
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimulationConfig::parse("grid:\n  size: 8\n").unwrap();

        assert_eq!(config.grid.size, 8);
        // Everything else uses defaults, whatever FIREFLY_* says.
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.timing.cycle_period_min_ms, 4000);
        assert_eq!(
            config.timing.restart_interval(),
            Some(Duration::from_secs(3600))
        );
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(SimulationConfig::parse("").is_ok());
    }

    #[test]
    fn zero_grid_is_rejected() {
        let result = SimulationConfig::parse("grid:\n  size: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let huge = SimulationConfig::parse("grid:\n  size: 5000000000\n");
        assert!(matches!(huge, Err(ConfigError::Invalid { .. })));

        let over = SimulationConfig::parse("grid:\n  size: 1025\n");
        assert!(matches!(over, Err(ConfigError::Invalid { .. })));

        let limit = SimulationConfig::parse("grid:\n  size: 1024\n").unwrap();
        assert_eq!(limit.grid.size, MAX_GRID_SIZE);
    }

    #[test]
    fn coupling_radius_is_clamped_to_half_the_grid() {
        let small = SimulationConfig::parse("grid:\n  size: 8\n  neighbor_radius: 10\n").unwrap();
        assert_eq!(small.coupling().radius, 4);

        let large = SimulationConfig::parse("grid:\n  size: 100\n  neighbor_radius: 10\n").unwrap();
        assert_eq!(large.coupling().radius, 10);
    }

    #[test]
    fn missing_file_loads_valid_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("no-such-config.yaml");
        let config = SimulationConfig::load(&path).unwrap();
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let result = SimulationConfig::parse("grid:\n  activation_probability: 1.5\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let yaml = "timing:\n  flash_duration_min_ms: 800\n  flash_duration_max_ms: 700\n";
        let result = SimulationConfig::parse(yaml);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let result = SimulationConfig::parse("grid: [unterminated");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("firefly-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
