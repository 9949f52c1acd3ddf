// src/registry/endpoint.rs
use crate::config::{probe_url, Config, ConfigError};
use std::sync::Arc;
use url::Url;

/// A configured target.
///
/// `id` is the URL exactly as configured and keys the status table;
/// `url` is what the prober actually requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub id: String,
    pub url: Url,
}

impl Endpoint {
    pub fn new(id: impl Into<String>, health_path: &str) -> Result<Self, ConfigError> {
        let id = id.into();
        let url = probe_url(&id, health_path).map_err(|e| ConfigError::InvalidEndpoint {
            url: id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { id, url })
    }
}

/// Ordered, immutable list of endpoints shared for the process lifetime.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: Arc<[Arc<Endpoint>]>,
}

impl EndpointRegistry {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints: endpoints.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let endpoints = config
            .endpoints
            .iter()
            .map(|id| Endpoint::new(id.as_str(), &config.health_path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(endpoints))
    }

    pub fn all(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_configured_order_and_duplicates() {
        let config: Config = serde_yaml::from_str(
            "endpoints:\n  - https://b.example.com\n  - https://a.example.com\n  - https://b.example.com\n",
        )
        .unwrap();

        let registry = EndpointRegistry::from_config(&config).unwrap();
        let ids: Vec<_> = registry.all().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            ["https://b.example.com", "https://a.example.com", "https://b.example.com"]
        );
        assert_eq!(registry.all()[1].url.as_str(), "https://a.example.com/health");
    }

    #[test]
    fn endpoint_id_is_not_normalized() {
        let endpoint = Endpoint::new("http://a.test/", "").unwrap();
        assert_eq!(endpoint.id, "http://a.test/");

        let endpoint = Endpoint::new("http://a.test", "").unwrap();
        assert_eq!(endpoint.id, "http://a.test");
        assert_eq!(endpoint.url.as_str(), "http://a.test/");
    }
}
