use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TRAFFIC_THRESHOLD_BYTES: u64 = 102_400;
pub const DEFAULT_TRAFFIC_WINDOW_SECS: u64 = 1;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
/// Outer cadence when the idle-kill watchdog runs.
pub const WATCHDOG_POLL_INTERVAL_SECS: u64 = 1;
/// Outer cadence of the indicator-only loop.
pub const INDICATOR_POLL_INTERVAL_SECS: u64 = 2;

pub const DEFAULT_SCREEN_CAPTURE_PROCESS: &str = "screenCapture.exe";
pub const DEFAULT_CAMERA_CAPTURE_PROCESS: &str = "media_capture.exe";
pub const DEFAULT_REMOTE_DESKTOP_PROCESS: &str = "rtcRemoteDesktop.exe";

pub const DEFAULT_VOLUME_FLOOR: f32 = 0.12;
pub const DEFAULT_START_CUE: &str = r"C:\Windows\Media\Speech On.wav";
pub const DEFAULT_END_CUE: &str = r"C:\Windows\Media\Speech Sleep.wav";

pub const DEFAULT_IDLE_RUN_LENGTH: u32 = 60;
pub const DEFAULT_KILL_COMMAND: &[&str] =
    &["Nsudo", "-U:S", "-ShowWindowMode:Hide", "taskkill", "/f", "/im"];

pub const DEFAULT_INDICATOR_SIZE: u32 = 4;
pub const DEFAULT_INDICATOR_OPACITY: f32 = 1.0;

/// Root configuration structure. Deserialized from %APPDATA%\StatusPrompter\config.toml.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub processes: ProcessConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub idle_kill: IdleKillConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
}

impl Config {
    /// Outer loop cadence. An explicit `poll_interval_secs` wins; otherwise the
    /// watchdog variant polls every second and the indicator-only variant every two.
    pub fn effective_poll_interval(&self) -> Duration {
        let secs = self.monitor.poll_interval_secs.unwrap_or(if self.idle_kill.enabled {
            WATCHDOG_POLL_INTERVAL_SECS
        } else {
            INDICATOR_POLL_INTERVAL_SECS
        });
        Duration::from_secs(secs.max(1))
    }
}

/// Sampling cadence and the low-traffic predicate.
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Overrides the outer loop cadence (seconds).
    pub poll_interval_secs: Option<u64>,
    /// Sleep after a transient query failure before the next attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Length of one outbound-traffic measurement window.
    #[serde(default = "default_traffic_window_secs")]
    pub traffic_window_secs: u64,
    /// A window whose outbound delta is at or below this many bytes counts as low.
    #[serde(default = "default_traffic_threshold_bytes")]
    pub traffic_threshold_bytes: u64,
}

impl MonitorConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn traffic_window(&self) -> Duration {
        Duration::from_secs(self.traffic_window_secs.max(1))
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: None,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            traffic_window_secs: DEFAULT_TRAFFIC_WINDOW_SECS,
            traffic_threshold_bytes: DEFAULT_TRAFFIC_THRESHOLD_BYTES,
        }
    }
}

/// Executable names whose presence drives the three process-backed indicators.
#[derive(Debug, Deserialize, Clone)]
pub struct ProcessConfig {
    #[serde(default = "default_screen_capture")]
    pub screen_capture: String,
    #[serde(default = "default_camera_capture")]
    pub camera_capture: String,
    #[serde(default = "default_remote_desktop")]
    pub remote_desktop: String,
}

impl ProcessConfig {
    /// All monitored names, in the order the watchdog terminates them.
    pub fn all(&self) -> [&str; 3] {
        [
            self.camera_capture.as_str(),
            self.screen_capture.as_str(),
            self.remote_desktop.as_str(),
        ]
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            screen_capture: DEFAULT_SCREEN_CAPTURE_PROCESS.to_string(),
            camera_capture: DEFAULT_CAMERA_CAPTURE_PROCESS.to_string(),
            remote_desktop: DEFAULT_REMOTE_DESKTOP_PROCESS.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Volume raised to while a cue plays. Clamped to [0, 1].
    #[serde(default = "default_volume_floor")]
    pub volume_floor: f32,
    #[serde(default = "default_start_cue")]
    pub start_cue: String,
    #[serde(default = "default_end_cue")]
    pub end_cue: String,
}

impl MediaConfig {
    pub fn effective_volume_floor(&self) -> f32 {
        if self.volume_floor.is_nan() {
            return DEFAULT_VOLUME_FLOOR;
        }
        self.volume_floor.clamp(0.0, 1.0)
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            volume_floor: DEFAULT_VOLUME_FLOOR,
            start_cue: DEFAULT_START_CUE.to_string(),
            end_cue: DEFAULT_END_CUE.to_string(),
        }
    }
}

/// Forced termination of the monitored processes after sustained low traffic.
#[derive(Debug, Deserialize, Clone)]
pub struct IdleKillConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Consecutive qualifying samples required before the kill fires. Minimum 1.
    #[serde(default = "default_idle_run_length")]
    pub run_length: u32,
    /// Program and leading arguments; the process name is appended.
    #[serde(default = "default_kill_command")]
    pub command: Vec<String>,
}

impl IdleKillConfig {
    pub fn effective_run_length(&self) -> u32 {
        self.run_length.max(1)
    }
}

impl Default for IdleKillConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            run_length: DEFAULT_IDLE_RUN_LENGTH,
            command: default_kill_command(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndicatorConfig {
    /// Edge length of each square indicator in pixels.
    #[serde(default = "default_indicator_size")]
    pub size: u32,
    #[serde(default = "default_indicator_opacity")]
    pub opacity: f32,
    /// Distance from the top of the primary screen in pixels.
    #[serde(default)]
    pub top: i32,
}

impl IndicatorConfig {
    pub fn effective_opacity(&self) -> f32 {
        if self.opacity.is_nan() {
            return DEFAULT_INDICATOR_OPACITY;
        }
        self.opacity.clamp(0.0, 1.0)
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_INDICATOR_SIZE,
            opacity: DEFAULT_INDICATOR_OPACITY,
            top: 0,
        }
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_traffic_window_secs() -> u64 {
    DEFAULT_TRAFFIC_WINDOW_SECS
}

fn default_traffic_threshold_bytes() -> u64 {
    DEFAULT_TRAFFIC_THRESHOLD_BYTES
}

fn default_screen_capture() -> String {
    DEFAULT_SCREEN_CAPTURE_PROCESS.to_string()
}

fn default_camera_capture() -> String {
    DEFAULT_CAMERA_CAPTURE_PROCESS.to_string()
}

fn default_remote_desktop() -> String {
    DEFAULT_REMOTE_DESKTOP_PROCESS.to_string()
}

fn default_volume_floor() -> f32 {
    DEFAULT_VOLUME_FLOOR
}

fn default_start_cue() -> String {
    DEFAULT_START_CUE.to_string()
}

fn default_end_cue() -> String {
    DEFAULT_END_CUE.to_string()
}

fn default_idle_run_length() -> u32 {
    DEFAULT_IDLE_RUN_LENGTH
}

fn default_kill_command() -> Vec<String> {
    DEFAULT_KILL_COMMAND.iter().map(|s| s.to_string()).collect()
}

fn default_indicator_size() -> u32 {
    DEFAULT_INDICATOR_SIZE
}

fn default_indicator_opacity() -> f32 {
    DEFAULT_INDICATOR_OPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn default_config_matches_indicator_only_variant() {
        let c = Config::default();
        assert!(!c.idle_kill.enabled);
        assert_eq!(c.monitor.traffic_threshold_bytes, 102_400);
        assert_eq!(c.monitor.traffic_window(), Duration::from_secs(1));
        assert_eq!(c.monitor.retry_backoff(), Duration::from_millis(500));
        assert_eq!(c.media.volume_floor, 0.12);
        assert_eq!(c.idle_kill.run_length, 60);
        assert_eq!(c.indicator.size, 4);
    }

    #[test]
    fn default_process_names() {
        let p = ProcessConfig::default();
        assert_eq!(
            p.all(),
            ["media_capture.exe", "screenCapture.exe", "rtcRemoteDesktop.exe"]
        );
    }

    #[test]
    fn default_kill_command_is_nsudo_taskkill() {
        let k = IdleKillConfig::default();
        assert_eq!(k.command.first().map(String::as_str), Some("Nsudo"));
        assert_eq!(k.command.last().map(String::as_str), Some("/im"));
    }

    // ── effective_poll_interval ───────────────────────────────────────────────

    #[test]
    fn poll_interval_depends_on_variant() {
        let mut c = Config::default();
        assert_eq!(c.effective_poll_interval(), Duration::from_secs(2));

        c.idle_kill.enabled = true;
        assert_eq!(c.effective_poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn poll_interval_override_wins_and_is_at_least_one_second() {
        let mut c = Config::default();
        c.monitor.poll_interval_secs = Some(5);
        assert_eq!(c.effective_poll_interval(), Duration::from_secs(5));

        c.monitor.poll_interval_secs = Some(0);
        assert_eq!(c.effective_poll_interval(), Duration::from_secs(1));
    }

    // ── clamped accessors ─────────────────────────────────────────────────────

    #[test]
    fn volume_floor_is_clamped() {
        let mut m = MediaConfig::default();
        m.volume_floor = 1.7;
        assert_eq!(m.effective_volume_floor(), 1.0);
        m.volume_floor = -0.3;
        assert_eq!(m.effective_volume_floor(), 0.0);
        m.volume_floor = f32::NAN;
        assert_eq!(m.effective_volume_floor(), DEFAULT_VOLUME_FLOOR);
    }

    #[test]
    fn run_length_has_floor_of_one() {
        let mut k = IdleKillConfig::default();
        k.run_length = 0;
        assert_eq!(k.effective_run_length(), 1);
    }

    #[test]
    fn opacity_is_clamped() {
        let mut i = IndicatorConfig::default();
        i.opacity = 2.0;
        assert_eq!(i.effective_opacity(), 1.0);
    }

    // ── load_or_default ───────────────────────────────────────────────────────

    #[test]
    fn load_or_default_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = load_or_default(&path).unwrap();
        assert_eq!(config.processes.camera_capture, DEFAULT_CAMERA_CAPTURE_PROCESS);
        assert!(!config.idle_kill.enabled);
    }

    #[test]
    fn load_or_default_parses_taskkiller_variant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[idle_kill]
enabled = true
run_length = 30
command = ["taskkill", "/f", "/im"]

[indicator]
size = 40
opacity = 0.8
"#,
        )
        .unwrap();

        let config = load_or_default(&path).unwrap();
        assert!(config.idle_kill.enabled);
        assert_eq!(config.idle_kill.run_length, 30);
        assert_eq!(config.idle_kill.command, vec!["taskkill", "/f", "/im"]);
        assert_eq!(config.indicator.size, 40);
        assert_eq!(config.indicator.opacity, 0.8);
        assert_eq!(config.effective_poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn load_or_default_partial_toml_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[monitor]\ntraffic_threshold_bytes = 2048\n").unwrap();

        let config = load_or_default(&path).unwrap();
        assert_eq!(config.monitor.traffic_threshold_bytes, 2048);
        assert_eq!(config.monitor.retry_backoff_ms, DEFAULT_RETRY_BACKOFF_MS);
        assert_eq!(config.media.start_cue, DEFAULT_START_CUE);
        assert_eq!(config.processes.remote_desktop, DEFAULT_REMOTE_DESKTOP_PROCESS);
    }

    #[test]
    fn load_or_default_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml ][[[").unwrap();
        assert!(load_or_default(&path).is_err());
    }

    #[test]
    fn load_or_default_custom_process_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[processes]
camera_capture = "obs64.exe"
"#,
        )
        .unwrap();

        let config = load_or_default(&path).unwrap();
        assert_eq!(config.processes.camera_capture, "obs64.exe");
        assert_eq!(config.processes.screen_capture, DEFAULT_SCREEN_CAPTURE_PROCESS);
    }
}
