//! Endpoint catalog built from the `[api]` configuration section.

use std::collections::HashMap;

use crate::config::schema::{ApiConfig, ApiEndpoint};
use crate::support::template;

/// Endpoints with their URL templates already expanded.
#[derive(Debug, Clone, Default)]
pub struct ApiCatalog {
    endpoints: HashMap<String, ApiEndpoint>,
}

impl ApiCatalog {
    /// Build the catalog, expanding `{name}` placeholders from `config.urls`.
    pub fn new(config: &ApiConfig) -> Self {
        let endpoints = config
            .endpoints
            .iter()
            .map(|endpoint| {
                let expanded = ApiEndpoint {
                    url: template::expand(&endpoint.url, &config.urls),
                    ..endpoint.clone()
                };
                (endpoint.id.clone(), expanded)
            })
            .collect();
        Self { endpoints }
    }

    /// URL of the endpoint with the given id.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.endpoint(id).map(|endpoint| endpoint.url.as_str())
    }

    pub fn endpoint(&self, id: &str) -> Option<&ApiEndpoint> {
        if id.is_empty() {
            return None;
        }
        self.endpoints.get(id)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
