use crate::application::enrichment_service::DEFAULT_PLACEHOLDER;
use crate::application::playback_engine::EngineSettings;
use crate::domain::error::EngineError;
use crate::domain::tier::{Tier, TierBoundaries, TierFilter};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub data: DataSettings,
    pub playback: PlaybackSettings,
    pub classification: ClassificationSettings,
    pub enrichment: EnrichmentSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataSettings {
    pub path: String,
    pub mock_fallback: bool,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: "data.csv".to_string(),
            mock_fallback: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlaybackSettings {
    pub total_duration_ms: u64,
    pub min_tick_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            total_duration_ms: 20_000,
            min_tick_interval_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassificationSettings {
    pub good_max: f64,
    pub medium_max: f64,
    pub alert_threshold: f64,
    pub visible: Vec<Tier>,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            good_max: 0.25,
            medium_max: 0.40,
            alert_threshold: 0.40,
            visible: Tier::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EnrichmentSettings {
    pub endpoint: String,
    pub api_key: String,
    pub delay_step_ms: u64,
    pub timeout_ms: u64,
    pub placeholder: String,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.longdo.com/map/services/address".to_string(),
            api_key: String::new(),
            delay_step_ms: 300,
            timeout_ms: 10_000,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

impl AppConfig {
    /// Validate and convert into the engine's settings.
    pub fn engine_settings(&self) -> Result<EngineSettings, EngineError> {
        let classification = &self.classification;
        let boundaries = TierBoundaries::new(classification.good_max, classification.medium_max)?;

        if self.playback.total_duration_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "playback.total_duration_ms must be positive".to_string(),
            ));
        }
        if !classification.alert_threshold.is_finite() {
            return Err(EngineError::InvalidConfig(
                "classification.alert_threshold must be finite".to_string(),
            ));
        }

        Ok(EngineSettings {
            boundaries,
            alert_threshold: classification.alert_threshold,
            filter: TierFilter::new(classification.visible.iter().copied()),
            total_duration: Duration::from_millis(self.playback.total_duration_ms),
            min_tick_interval: Duration::from_millis(self.playback.min_tick_interval_ms),
            enrichment_delay_step: Duration::from_millis(self.enrichment.delay_step_ms),
        })
    }
}

/// Load `config/playback.*` (optional) overlaid with `S4C__SECTION__KEY`
/// environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/playback").required(false))
        .add_source(
            config::Environment::with_prefix("S4C")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
