use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info, warn};

use crate::catalog::{CharacterCatalog, parse_catalog};
use crate::config::RosterConfig;
use crate::error::FetchError;

/// Issues the single GET behind each catalog load.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
}

impl CatalogClient {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        match HeaderValue::from_str(user_agent) {
            Ok(value) => {
                headers.insert(USER_AGENT, value);
            }
            Err(_) => warn!(user_agent, "ignoring invalid user agent"),
        }
        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(FetchError::Network)?;
        Ok(Self { http })
    }

    pub fn from_config(config: &RosterConfig) -> Result<Self, FetchError> {
        Self::new(&config.user_agent, config.timeout())
    }

    /// Fetches and parses the catalog at `url`. No retries.
    pub async fn load_catalog(&self, url: &str) -> Result<CharacterCatalog, FetchError> {
        debug!(%url, "requesting catalog");
        let response = self.http.get(url).send().await.map_err(|err| {
            warn!(%url, error = %err, "catalog request failed");
            FetchError::Network(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "catalog request rejected");
            return Err(FetchError::Request {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(FetchError::Network)?;
        let catalog = parse_catalog(&body).inspect_err(|err| {
            warn!(%url, error = %err, bytes = body.len(), "catalog body is not JSON");
        })?;
        info!(%url, records = catalog.len(), "catalog loaded");
        Ok(catalog)
    }
}
