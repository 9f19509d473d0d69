use std::{collections::HashMap, time::Duration};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
}

/// Settings for the RadioTAG service the client talks to.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("service.base_url", "http://radiotag.prototyping.bbc.co.uk")?
            .set_default("service.timeout_secs", 10)?
            .add_source(File::with_name("config/settings").required(false));

        // If env_vars is provided, we use it instead of system environment
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Use system environment variables
            // Should be in the format APP_SERVICE__BASE_URL
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::load().expect("Failed to load config");

        assert_eq!(
            config.service.base_url,
            "http://radiotag.prototyping.bbc.co.uk"
        );
        assert_eq!(config.service.timeout_secs, 10);
        assert_eq!(config.service.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_env_config() {
        let mut env_vars = HashMap::new();
        env_vars.insert(
            "service.base_url".to_string(),
            "http://localhost:8080".to_string(),
        );
        env_vars.insert("service.timeout_secs".to_string(), "30".to_string());

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        assert_eq!(config.service.base_url, "http://localhost:8080");
        assert_eq!(config.service.timeout_secs, 30);
    }

    #[test]
    fn test_partial_env_override() {
        let mut env_vars = HashMap::new();
        // We just override the timeout
        env_vars.insert("service.timeout_secs".to_string(), "5".to_string());

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        assert_eq!(config.service.timeout_secs, 5);
        // The other values should use defaults
        assert_eq!(
            config.service.base_url,
            "http://radiotag.prototyping.bbc.co.uk"
        );
    }
}
