use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Coalescing thresholds for progress updates (`[throttle]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum time between two emitted updates, in milliseconds.
    pub min_interval_ms: u64,
    /// Progress advance (0.0..=1.0) that forces an emission before the interval is up.
    pub min_progress_delta: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
            min_progress_delta: 0.05,
        }
    }
}

impl ThrottleConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// When the progress notification may be posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Post while a session exists, foreground included (shown as a banner).
    Always,
    /// Post only while the app is in the background.
    #[default]
    BackgroundOnly,
}

/// Notification surface settings (`[notification]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Stable notification identity; every post reuses it so the OS replaces
    /// instead of stacking.
    pub identifier: String,
    /// Master switch. When false the grant is still bracketed but nothing is posted.
    pub show_notification: bool,
    pub display_mode: DisplayMode,
    /// Small icon resource name; `None` uses the platform default.
    pub small_icon_name: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            identifier: "bgx.transfer.progress".to_string(),
            show_notification: true,
            display_mode: DisplayMode::BackgroundOnly,
            small_icon_name: None,
        }
    }
}

/// Global configuration loaded from `~/.config/bgx/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BgxConfig {
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bgx")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BgxConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BgxConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<BgxConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: BgxConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
