use std::time::Duration;

use ipcbridge_frame::FrameConfig;

/// Disables both alive timers when set to anything but empty or `0`.
pub const NO_ALIVE_TIMER_ENV: &str = "IPCBRIDGE_NO_ALIVE_TIMER";

/// Overrides the editor-side alive interval, in milliseconds.
pub const ALIVE_INTERVAL_ENV: &str = "IPCBRIDGE_ALIVE_INTERVAL_MS";

/// Overrides how long either side waits for the connection, in milliseconds.
pub const CONNECT_TIMEOUT_ENV: &str = "IPCBRIDGE_CONNECT_TIMEOUT_MS";

/// Component name used for the endpoint and output prefixes.
pub const DEFAULT_COMPONENT: &str = "ipcbridge-backend";

/// Editor-side supervisor configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Names the endpoint file and prefixes forwarded worker output.
    pub component: String,
    /// Liveness check period. `None` disables automatic restarts.
    pub alive_interval: Option<Duration>,
    /// How long to wait for the worker to connect back.
    pub connect_timeout: Duration,
    /// Pause between accept attempts while waiting for the worker.
    pub connect_poll_interval: Duration,
    /// How long the worker gets to exit after an end message.
    pub end_wait: Duration,
    /// How long the worker gets to exit after a terminate signal.
    pub terminate_wait: Duration,
    /// How long to wait for a killed worker to be reaped.
    pub kill_wait: Duration,
    /// Sleep between event loop turns in `run_for`/`run_until`.
    pub poll_interval: Duration,
    /// Prefix of the per-run worker temp directory.
    pub temp_dir_prefix: String,
    pub frame: FrameConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            component: DEFAULT_COMPONENT.to_string(),
            alive_interval: Some(Duration::from_secs(10)),
            connect_timeout: Duration::from_secs(10),
            connect_poll_interval: Duration::from_millis(20),
            end_wait: Duration::from_secs(10),
            terminate_wait: Duration::from_secs(1),
            kill_wait: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
            temp_dir_prefix: "ipcbridge-".to_string(),
            frame: FrameConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults adjusted by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(interval) = millis(lookup(ALIVE_INTERVAL_ENV)) {
            self.alive_interval = Some(interval);
        }
        if flag_enabled(lookup(NO_ALIVE_TIMER_ENV)) {
            self.alive_interval = None;
        }
        if let Some(timeout) = millis(lookup(CONNECT_TIMEOUT_ENV)) {
            self.connect_timeout = timeout;
        }
        self
    }
}

/// Worker-side connection configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Period of outgoing alive messages. `None` disables them.
    pub alive_interval: Option<Duration>,
    /// How long to keep retrying the connect to the editor's endpoint.
    pub connect_timeout: Duration,
    pub connect_retry_interval: Duration,
    /// Sleep between event loop turns in `run`.
    pub poll_interval: Duration,
    pub frame: FrameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            alive_interval: Some(Duration::from_secs(5)),
            connect_timeout: Duration::from_secs(10),
            connect_retry_interval: Duration::from_millis(20),
            poll_interval: Duration::from_millis(10),
            frame: FrameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults adjusted by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if flag_enabled(lookup(NO_ALIVE_TIMER_ENV)) {
            self.alive_interval = None;
        }
        if let Some(timeout) = millis(lookup(CONNECT_TIMEOUT_ENV)) {
            self.connect_timeout = timeout;
        }
        self
    }
}

fn millis(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn flag_enabled(value: Option<String>) -> bool {
    matches!(value.as_deref().map(str::trim), Some(v) if !v.is_empty() && v != "0")
}
