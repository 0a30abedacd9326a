use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub targets: TargetsConfig,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub resources: ResourceSettings,
    #[serde(default)]
    pub retention: RetentionSettings,
    #[serde(default)]
    pub stats: StatsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetsConfig {
    /// JSON registry file; re-read on every probe tick.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSettings {
    pub interval_secs: u64,
    /// Echo requests per probe.
    pub count: u32,
    /// Per-reply wait passed to ping.
    pub timeout_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            count: 1,
            timeout_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSettings {
    pub interval_secs: u64,
    /// Filesystem whose usage is reported.
    pub disk_path: String,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            disk_path: "/".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionSettings {
    /// Purge once every N probe ticks.
    #[serde(default = "default_every_ticks")]
    pub every_ticks: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

fn default_every_ticks() -> u64 {
    100
}

fn default_vacuum_interval_secs() -> u64 {
    86_400
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            every_ticks: default_every_ticks(),
            vacuum_schedule: None,
            vacuum_interval_secs: default_vacuum_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsSettings {
    pub window_hours: u32,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self { window_hours: 24 }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            !self.targets.path.is_empty(),
            "targets.path must be non-empty"
        );
        anyhow::ensure!(
            self.probe.interval_secs > 0,
            "probe.interval_secs must be > 0, got {}",
            self.probe.interval_secs
        );
        anyhow::ensure!(
            self.probe.count > 0,
            "probe.count must be > 0, got {}",
            self.probe.count
        );
        anyhow::ensure!(
            self.probe.timeout_secs > 0,
            "probe.timeout_secs must be > 0, got {}",
            self.probe.timeout_secs
        );
        anyhow::ensure!(
            self.resources.interval_secs > 0,
            "resources.interval_secs must be > 0, got {}",
            self.resources.interval_secs
        );
        anyhow::ensure!(
            !self.resources.disk_path.is_empty(),
            "resources.disk_path must be non-empty"
        );
        anyhow::ensure!(
            self.retention.every_ticks > 0,
            "retention.every_ticks must be > 0, got {}",
            self.retention.every_ticks
        );
        anyhow::ensure!(
            self.retention.vacuum_interval_secs > 0,
            "retention.vacuum_interval_secs must be > 0, got {}",
            self.retention.vacuum_interval_secs
        );
        if let Some(schedule) = &self.retention.vacuum_schedule {
            anyhow::ensure!(
                <cron::Schedule as std::str::FromStr>::from_str(schedule).is_ok(),
                "retention.vacuum_schedule is not a valid cron expression: {}",
                schedule
            );
        }
        anyhow::ensure!(
            self.stats.window_hours > 0,
            "stats.window_hours must be > 0, got {}",
            self.stats.window_hours
        );
        Ok(())
    }
}
