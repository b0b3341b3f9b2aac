//! Console settings loaded from `BOT_CONSOLE_*` environment variables

use std::time::Duration;

use serde::Deserialize;

/// Runtime settings for the console core
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConsoleSettings {
    /// Base URL of the trading bridge
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    /// Bot list refresh interval
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    /// Only show bots owned by this client
    #[serde(default)]
    pub account_filter: Option<String>,
}

impl ConsoleSettings {
    /// Load from the environment, e.g. `BOT_CONSOLE_BRIDGE_URL`
    pub fn load() -> anyhow::Result<Self> {
        Self::from_source(config::Environment::with_prefix("BOT_CONSOLE"))
    }

    fn from_source<S>(source: S) -> anyhow::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .set_default("bridge_url", default_bridge_url())?
            .set_default("poll_interval_secs", default_poll_interval_secs())?
            .set_default("request_timeout_secs", default_request_timeout_secs())?
            .add_source(source)
            .build()?
            .try_deserialize::<ConsoleSettings>()?;

        if settings.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("poll_interval_secs must be greater than 0"));
        }
        Ok(settings)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            bearer_token: None,
            wallet_address: None,
            account_filter: None,
        }
    }
}

fn default_bridge_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}
