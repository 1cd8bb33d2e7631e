use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use collector_engine::{ClientSettings, OrchestratorSettings, PollSettings};
use engine_logging::engine_info;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = "./collector.ron";

/// Settings read from the RON config file. Every field is optional in the
/// file and falls back to the engine defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_failures: u32,
    pub inter_job_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        let engine = OrchestratorSettings::default();
        Self {
            api_base_url: client.base_url,
            poll_interval_ms: duration_ms(engine.poll.interval),
            max_poll_failures: engine.poll.max_failures,
            inter_job_delay_ms: duration_ms(engine.inter_job_delay),
            request_timeout_secs: client.request_timeout.as_secs(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `explicit` if given (it must exist), otherwise `./collector.ron`
    /// when present, otherwise the defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG);
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        engine_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api_base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..ClientSettings::default()
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            poll: PollSettings {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_failures: self.max_poll_failures.max(1),
            },
            inter_job_delay: Duration::from_millis(self.inter_job_delay_ms),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
