//! Server configuration from the environment.

use std::num::ParseIntError;

use drawingboard_core::HubConfig;
use drawingboard_core::connection::DEFAULT_QUEUE_CAPACITY;
use drawingboard_core::hub::DEFAULT_MAX_SEND_FAILURES;
use drawingboard_core::protocol::DEFAULT_SSE_LOCATION;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8888;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}: {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Settings read at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `HOSTNAME`
    pub host: String,
    /// `PORT`
    pub port: u16,
    /// `SSE_LOCATION`, announced to every joining client.
    pub sse_location: String,
    /// `MAX_SEND_FAILURES`; `0` disables eviction on failed sends.
    pub max_send_failures: Option<u32>,
    /// `OUTBOUND_QUEUE`, messages buffered per client.
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            sse_location: DEFAULT_SSE_LOCATION.to_string(),
            max_send_failures: Some(DEFAULT_MAX_SEND_FAILURES),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset and empty variables
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_send_failures = match get("MAX_SEND_FAILURES") {
            Some(v) => match parse::<u32>("MAX_SEND_FAILURES", v)? {
                0 => None,
                n => Some(n),
            },
            None => defaults.max_send_failures,
        };

        Ok(Self {
            host: get("HOSTNAME").unwrap_or(defaults.host),
            port: get("PORT")
                .map(|v| parse::<u16>("PORT", v))
                .transpose()?
                .unwrap_or(defaults.port),
            sse_location: get("SSE_LOCATION").unwrap_or(defaults.sse_location),
            max_send_failures,
            queue_capacity: get("OUTBOUND_QUEUE")
                .map(|v| parse::<usize>("OUTBOUND_QUEUE", v))
                .transpose()?
                .unwrap_or(defaults.queue_capacity),
        })
    }

    /// `host:port` to listen on.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            sse_location: self.sse_location.clone(),
            max_send_failures: self.max_send_failures,
        }
    }
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    let parsed = value.trim().parse();
    parsed.map_err(|source| ConfigError::InvalidNumber {
        name,
        value,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "localhost:8888");
        assert_eq!(config.hub_config().sse_location, "localhost:8080");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOSTNAME", "0.0.0.0"),
            ("PORT", "9000"),
            ("SSE_LOCATION", "events.example:8081"),
            ("MAX_SEND_FAILURES", "5"),
            ("OUTBOUND_QUEUE", "32"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.sse_location, "events.example:8081");
        assert_eq!(config.max_send_failures, Some(5));
        assert_eq!(config.queue_capacity, 32);
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config =
            ServerConfig::from_lookup(lookup(&[("SSE_LOCATION", ""), ("PORT", "  ")])).unwrap();
        assert_eq!(config.sse_location, DEFAULT_SSE_LOCATION);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_zero_disables_eviction() {
        let config = ServerConfig::from_lookup(lookup(&[("MAX_SEND_FAILURES", "0")])).unwrap();
        assert_eq!(config.hub_config().max_send_failures, None);
    }

    #[test]
    fn test_invalid_port() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name: "PORT", .. }));
        assert!(err.to_string().contains("eighty"));
    }
}
