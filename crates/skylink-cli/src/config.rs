//! Configuration vault – reads/writes `~/.skylink/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use skylink_hal::{PREF_HEADING_MODE, Preferences};
use skylink_types::{SkyError, SpeedUnit};

/// Persisted user configuration stored in `~/.skylink/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// `true` shows compass-normalised yaw, `false` raw FPV yaw.
    #[serde(default)]
    pub pref_heading_mode: bool,

    #[serde(default)]
    pub speed_unit: SpeedUnit,

    /// Hide the video surface again when the stream fails to start.
    #[serde(default)]
    pub hide_video_on_start_failure: bool,

    /// Event bus buffer size.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Whether the simulated vehicle advertises video streaming.
    #[serde(default = "default_true")]
    pub sim_video_supported: bool,

    /// Latency of simulated capability and stream replies.
    #[serde(default = "default_probe_latency_ms")]
    pub sim_probe_latency_ms: u64,

    /// Delay before the headless video surface becomes ready.
    #[serde(default = "default_surface_delay_ms")]
    pub sim_surface_delay_ms: u64,

    /// Simulated telemetry rate.
    #[serde(default = "default_feed_hz")]
    pub sim_feed_hz: u32,
}

fn default_bus_capacity() -> usize {
    256
}
fn default_true() -> bool {
    true
}
fn default_probe_latency_ms() -> u64 {
    150
}
fn default_surface_delay_ms() -> u64 {
    100
}
fn default_feed_hz() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pref_heading_mode: false,
            speed_unit: SpeedUnit::default(),
            hide_video_on_start_failure: false,
            bus_capacity: default_bus_capacity(),
            sim_video_supported: default_true(),
            sim_probe_latency_ms: default_probe_latency_ms(),
            sim_surface_delay_ms: default_surface_delay_ms(),
            sim_feed_hz: default_feed_hz(),
        }
    }
}

/// Return the path to `~/.skylink/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".skylink").join("config.toml")
}

/// Load the config from disk and apply environment overrides.
/// Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, SkyError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, SkyError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        SkyError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| SkyError::Config(format!("failed to parse config: {e}")))?;
    Ok(Some(cfg))
}

/// Apply `SKYLINK_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SKYLINK_HEADING_MODE` (`compass`/`fpv`) | `pref_heading_mode` |
/// | `SKYLINK_SPEED_UNIT` (`metric`/`imperial`) | `speed_unit` |
/// | `SKYLINK_VIDEO_SUPPORTED` (`true`/`false`) | `sim_video_supported` |
/// | `SKYLINK_FEED_HZ` | `sim_feed_hz` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SKYLINK_HEADING_MODE") {
        match v.to_ascii_lowercase().as_str() {
            "compass" => cfg.pref_heading_mode = true,
            "fpv" => cfg.pref_heading_mode = false,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("SKYLINK_SPEED_UNIT") {
        match v.to_ascii_lowercase().as_str() {
            "metric" => cfg.speed_unit = SpeedUnit::Metric,
            "imperial" => cfg.speed_unit = SpeedUnit::Imperial,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("SKYLINK_VIDEO_SUPPORTED")
        && let Ok(supported) = v.parse::<bool>()
    {
        cfg.sim_video_supported = supported;
    }
    if let Ok(v) = std::env::var("SKYLINK_FEED_HZ")
        && let Ok(hz) = v.parse::<u32>()
        && hz > 0
    {
        cfg.sim_feed_hz = hz;
    }
}

/// Save the config to disk, creating `~/.skylink/` if necessary.
pub fn save(cfg: &Config) -> Result<(), SkyError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), SkyError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            SkyError::Config(format!("failed to create config directory: {e}"))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                SkyError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| SkyError::Config(format!("failed to serialize config: {e}")))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| {
                SkyError::Config(format!("failed to write config at {}: {e}", path.display()))
            })?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| {
        SkyError::Config(format!("failed to write config at {}: {e}", path.display()))
    })?;
    Ok(())
}

/// [`Preferences`] backed by the config file.
///
/// Every lookup re-reads the file, so an edit made between two activations
/// is picked up by the second one.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Preferences for FilePreferences {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        // Without a readable file the caller's default stands in for the
        // stored value; environment overrides still apply.
        let fallback = || Config {
            pref_heading_mode: default,
            ..Config::default()
        };
        let mut cfg = match load_from(&self.path) {
            Ok(Some(cfg)) => cfg,
            Ok(None) => fallback(),
            Err(e) => {
                tracing::warn!(error = %e, key, "preference lookup failed; using default");
                fallback()
            }
        };
        apply_env_overrides(&mut cfg);
        match key {
            PREF_HEADING_MODE => cfg.pref_heading_mode,
            _ => default,
        }
    }
}
