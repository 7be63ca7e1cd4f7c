//! Configuration management.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for promem.
#[derive(Debug, Clone)]
pub struct PromemConfig {
    /// Path to the profile document.
    pub profile_path: PathBuf,
    /// Host tool configuration.
    pub host: HostToolConfig,
    /// Monitor configuration.
    pub monitor: MonitorConfig,
}

/// Host tool configuration.
///
/// The host tool owns both the interaction log and the model-invocation
/// capability; promem only ever reaches them through this command.
#[derive(Debug, Clone)]
pub struct HostToolConfig {
    /// Command used to invoke the host tool.
    pub command: String,
    /// Timeout for the `logs path` lookup subprocess.
    pub logs_path_timeout: Duration,
    /// Timeout for a model invocation subprocess.
    pub prompt_timeout: Duration,
}

/// Monitor configuration.
///
/// The intervals are policy, not structure: the monitor works with any
/// positive values, these defaults match the intended deployment.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Whether the fragment surface starts the monitor at all.
    pub enabled: bool,
    /// Interval between polls of the interaction log.
    pub poll_interval: Duration,
    /// Granularity at which the worker checks for a stop signal while asleep.
    pub stop_check_interval: Duration,
    /// How long `stop()` waits for the worker to acknowledge.
    pub stop_join_timeout: Duration,
}

impl Default for HostToolConfig {
    fn default() -> Self {
        Self {
            command: "llm".to_string(),
            logs_path_timeout: Duration::from_secs(10),
            prompt_timeout: Duration::from_secs(120),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_secs(5),
            stop_check_interval: Duration::from_millis(100),
            stop_join_timeout: Duration::from_secs(1),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Profile section.
    pub profile: Option<ConfigFileProfile>,
    /// Host tool section.
    pub host: Option<ConfigFileHost>,
    /// Monitor section.
    pub monitor: Option<ConfigFileMonitor>,
}

/// Profile section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileProfile {
    /// Profile document path override.
    pub path: Option<String>,
}

/// Host tool section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileHost {
    /// Command name.
    pub command: Option<String>,
    /// `logs path` lookup timeout in seconds.
    pub logs_path_timeout_secs: Option<u64>,
    /// Model invocation timeout in seconds.
    pub prompt_timeout_secs: Option<u64>,
}

/// Monitor section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMonitor {
    /// Whether background updates run at all.
    pub enabled: Option<bool>,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Stop-check granularity in milliseconds.
    pub stop_check_interval_ms: Option<u64>,
    /// Stop join timeout in milliseconds.
    pub stop_join_timeout_ms: Option<u64>,
}

impl Default for PromemConfig {
    fn default() -> Self {
        Self {
            profile_path: default_profile_path(),
            host: HostToolConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

/// Resolves the default profile document path.
///
/// `<platform config dir>/promem/profile.md`, falling back to a relative
/// `.promem/profile.md` when no home directory can be determined.
fn default_profile_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".promem").join("profile.md"),
        |b| b.config_dir().join("promem").join("profile.md"),
    )
}

impl PromemConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::operation("read_config_file", e))?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::operation("parse_config_file", e))?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/promem/` on macOS)
    /// 2. XDG config dir (`~/.config/promem/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        // Check platform-specific config dir first
        let platform_config = base_dirs.config_dir().join("promem").join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        // Fall back to XDG-style ~/.config/promem/ for Unix compatibility
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("promem")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `PromemConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(profile) = file.profile {
            if let Some(path) = profile.path {
                config.profile_path = PathBuf::from(path);
            }
        }
        if let Some(host) = file.host {
            if let Some(command) = host.command {
                config.host.command = command;
            }
            if let Some(secs) = host.logs_path_timeout_secs {
                config.host.logs_path_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = host.prompt_timeout_secs {
                config.host.prompt_timeout = Duration::from_secs(secs);
            }
        }
        if let Some(monitor) = file.monitor {
            if let Some(v) = monitor.enabled {
                config.monitor.enabled = v;
            }
            if let Some(ms) = monitor.poll_interval_ms {
                config.monitor.poll_interval = Duration::from_millis(ms);
            }
            if let Some(ms) = monitor.stop_check_interval_ms {
                config.monitor.stop_check_interval = Duration::from_millis(ms);
            }
            if let Some(ms) = monitor.stop_join_timeout_ms {
                config.monitor.stop_join_timeout = Duration::from_millis(ms);
            }
        }

        config
    }

    /// Sets the profile document path.
    #[must_use]
    pub fn with_profile_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile_path = path.into();
        self
    }

    /// Sets the host tool command.
    #[must_use]
    pub fn with_host_command(mut self, command: impl Into<String>) -> Self {
        self.host.command = command.into();
        self
    }

    /// Sets the monitor poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.monitor.poll_interval = interval;
        self
    }
}
