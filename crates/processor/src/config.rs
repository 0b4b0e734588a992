//! Processor configuration

use anyhow::{Context, Result};
use processor_lib::{KruizeClientConfig, PipelineConfig};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable prefix, e.g. `ROSOCP_KRUIZE_HOST`
pub const ENV_PREFIX: &str = "ROSOCP";

/// Processor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_bootstrap_servers")]
    pub kafka_bootstrap_servers: String,

    #[serde(default = "default_consumer_group_id")]
    pub kafka_consumer_group_id: String,

    /// Let the broker client commit offsets on its own
    #[serde(default)]
    pub kafka_auto_commit: bool,

    #[serde(default)]
    pub kafka_security_protocol: Option<String>,
    #[serde(default)]
    pub kafka_sasl_mechanism: Option<String>,
    #[serde(default)]
    pub kafka_sasl_username: Option<String>,
    #[serde(default)]
    pub kafka_sasl_password: Option<String>,

    #[serde(default = "default_upload_topic")]
    pub upload_topic: String,

    #[serde(default = "default_kruize_host")]
    pub kruize_host: String,

    #[serde(default = "default_kruize_port")]
    pub kruize_port: u16,

    /// Full base URL; overrides host and port when set
    #[serde(default)]
    pub kruize_url: Option<String>,

    /// Timeout for report downloads and service calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Port for the health and metrics server
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_trial_number")]
    pub trial_number: u32,

    #[serde(default)]
    pub experiment_name_separator: String,

    #[serde(default = "default_true")]
    pub list_after_failed_update: bool,
}

fn default_bootstrap_servers() -> String {
    "localhost:29092".to_string()
}

fn default_consumer_group_id() -> String {
    "ros-ocp".to_string()
}

fn default_upload_topic() -> String {
    "platform.upload.rosocp".to_string()
}

fn default_kruize_host() -> String {
    "localhost".to_string()
}

fn default_kruize_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_api_port() -> u16 {
    5005
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_trial_number() -> u32 {
    98
}

fn default_true() -> bool {
    true
}

impl ProcessorConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(environment: config::Environment) -> Result<Self> {
        config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Base URL of the recommendation service
    pub fn kruize_url(&self) -> String {
        match &self.kruize_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("http://{}:{}", self.kruize_host, self.kruize_port),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            trial_number: self.trial_number,
            experiment_name_separator: self.experiment_name_separator.clone(),
            list_after_failed_update: self.list_after_failed_update,
        }
    }

    pub fn kruize_client(&self) -> KruizeClientConfig {
        KruizeClientConfig {
            base_url: self.kruize_url(),
            request_timeout: self.request_timeout(),
        }
    }

    #[cfg(feature = "kafka")]
    pub fn kafka_source(&self) -> processor_lib::source::KafkaSourceConfig {
        processor_lib::source::KafkaSourceConfig {
            bootstrap_servers: self.kafka_bootstrap_servers.clone(),
            group_id: self.kafka_consumer_group_id.clone(),
            topic: self.upload_topic.clone(),
            auto_commit: self.kafka_auto_commit,
            security_protocol: self.kafka_security_protocol.clone(),
            sasl_mechanism: self.kafka_sasl_mechanism.clone(),
            sasl_username: self.kafka_sasl_username.clone(),
            sasl_password: self.kafka_sasl_password.clone(),
            ..Default::default()
        }
    }
}
