use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fields::{Field, FieldTable};

pub const DEFAULT_ENDPOINT: &str = "https://apisimpsons.fly.dev/api/personajes?limit=50";
pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const ENV_PREFIX: &str = "ROSTER_";

/// Which normalized fields a search term is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    NameOnly,
    #[default]
    NameOccupationHistory,
}

impl SearchScope {
    pub fn fields(self) -> &'static [Field] {
        match self {
            SearchScope::NameOnly => &[Field::Name],
            SearchScope::NameOccupationHistory => {
                &[Field::Name, Field::Occupation, Field::History]
            }
        }
    }
}

/// What a load does with a body that is not JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsePolicy {
    #[default]
    EmptyCatalog,
    Surface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fallbacks {
    pub name: String,
    pub occupation: String,
    pub history: String,
    pub voice: String,
    pub first_appearance: String,
}

impl Default for Fallbacks {
    fn default() -> Self {
        Self {
            name: "Unknown name".to_string(),
            occupation: "Not specified".to_string(),
            history: "Not available".to_string(),
            voice: "Not specified".to_string(),
            first_appearance: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub endpoint: String,
    /// Cards per page. `0` disables pagination.
    pub page_size: usize,
    pub search_scope: SearchScope,
    pub parse_policy: ParsePolicy,
    /// Request timeout. `0` waits forever.
    pub timeout_secs: u64,
    pub user_agent: String,
    pub placeholder_image: String,
    pub image_error_placeholder: String,
    pub fallbacks: Fallbacks,
    /// Candidate key overrides, e.g. `fields.name = ["full_name", "name"]`.
    pub fields: BTreeMap<Field, Vec<String>>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            search_scope: SearchScope::default(),
            parse_policy: ParsePolicy::default(),
            timeout_secs: 30,
            user_agent: format!("roster-rs/{}", env!("CARGO_PKG_VERSION")),
            placeholder_image: "https://via.placeholder.com/300x300?text=No+Image".to_string(),
            image_error_placeholder: "https://via.placeholder.com/300x300?text=Simpsons"
                .to_string(),
            fallbacks: Fallbacks::default(),
            fields: BTreeMap::new(),
        }
    }
}

impl RosterConfig {
    /// Defaults, then `file` (if given and present), then `ROSTER_*` variables.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(RosterConfig::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(RosterConfig::default()))
            .merge(Toml::string(source));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: RosterConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|err| ConfigError::Endpoint {
            url: self.endpoint.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Endpoint {
                url: self.endpoint.clone(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }
        if reqwest::header::HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(ConfigError::UserAgent(self.user_agent.clone()));
        }
        Ok(())
    }

    pub fn page_size(&self) -> Option<usize> {
        (self.page_size > 0).then_some(self.page_size)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn field_table(&self) -> FieldTable {
        FieldTable::default().with_overrides(&self.fields)
    }
}
