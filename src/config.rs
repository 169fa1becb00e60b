use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub projects: ProjectsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Backend used when a project has no API URL.
    pub default_api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound on concurrent filtered metric fetches during reconstruction.
    pub max_concurrent_fetches: usize,
    /// Passed as `timeRange` to the pre-aggregated api-metrics endpoint.
    #[serde(default)]
    pub api_metrics_time_range: Option<String>,
    /// Snapshots buffered for /ws/snapshots (slow clients may lag).
    pub broadcast_capacity: usize,
    /// Fall back to Actuator reconstruction when api-metrics is empty. When false the
    /// cheap estimate is used instead.
    #[serde(default = "default_reconstruct")]
    pub reconstruct: bool,
}

fn default_interval_secs() -> u64 {
    15
}

fn default_reconstruct() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding credentials and the selected project.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            env_prefix: default_env_prefix(),
        }
    }
}

fn default_env_prefix() -> String {
    "MONITOR".into()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
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
            self.auth.default_api_url.starts_with("http://")
                || self.auth.default_api_url.starts_with("https://"),
            "auth.default_api_url must be an http(s) URL, got {:?}",
            self.auth.default_api_url
        );
        anyhow::ensure!(
            self.auth.request_timeout_secs > 0,
            "auth.request_timeout_secs must be > 0, got {}",
            self.auth.request_timeout_secs
        );
        anyhow::ensure!(
            self.polling.interval_secs > 0,
            "polling.interval_secs must be > 0, got {}",
            self.polling.interval_secs
        );
        anyhow::ensure!(
            self.polling.max_concurrent_fetches > 0,
            "polling.max_concurrent_fetches must be > 0, got {}",
            self.polling.max_concurrent_fetches
        );
        anyhow::ensure!(
            self.polling.broadcast_capacity > 0,
            "polling.broadcast_capacity must be > 0, got {}",
            self.polling.broadcast_capacity
        );
        anyhow::ensure!(
            !self.storage.path.is_empty(),
            "storage.path must be non-empty"
        );
        Ok(())
    }
}
