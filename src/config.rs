use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::feed::aggregate::AggregatorConfig;
use crate::feed::pagination::PaginationConfig;
use crate::feed::rank::RankingConfig;
use crate::layout::LayoutConfig;
use crate::readiness::{ReadinessConfig, RetryConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial viewport width handed to the layout engine; the presentation
    /// layer updates it on resize.
    pub viewport_width: f32,
    /// Budget for the best-effort engagement index call.
    pub engagement_timeout_ms: u64,
    pub sources: SourcesConfig,
    pub normalize: NormalizeConfig,
    pub aggregator: AggregatorConfig,
    pub ranking: RankingConfig,
    pub pagination: PaginationConfig,
    pub layout: LayoutConfig,
    pub readiness: ReadinessConfig,
    pub media_retry: RetryConfig,
    pub social: SocialConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            engagement_timeout_ms: 1_500,
            sources: SourcesConfig::default(),
            normalize: NormalizeConfig::default(),
            aggregator: AggregatorConfig::default(),
            ranking: RankingConfig::default(),
            pagination: PaginationConfig::default(),
            layout: LayoutConfig::default(),
            readiness: ReadinessConfig::default(),
            media_retry: RetryConfig::default(),
            social: SocialConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub portfolio: EndpointConfig,
    pub discover: EndpointConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            portfolio: EndpointConfig {
                base_url: "https://api.atelier.example".to_string(),
                request_timeout_ms: default_request_timeout(),
            },
            discover: EndpointConfig {
                base_url: "https://discover.atelier.example".to_string(),
                request_timeout_ms: default_request_timeout(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Stock-photo hosts whose images never enter the feed. Matched by
    /// host suffix.
    pub banned_image_hosts: Vec<String>,
    /// Prices above this are assumed to be minor units. Data-quality
    /// workaround for mixed legacy rows; intent upstream is ambiguous, so
    /// it stays a visible knob instead of a hidden constant.
    pub minor_units_threshold: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            banned_image_hosts: Vec::new(),
            minor_units_threshold: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    /// Follow list for the driver binary's static follow graph.
    pub followed_authors: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        Ok(config)
    }

    /// Load `config.toml` from the working directory, falling back to
    /// defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }
}
