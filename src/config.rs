use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::stamp::{Coordinates, LocationDetails, TimeFormat};

/// Top-level configuration for snapstamp.
///
/// Controls which AI services to ask, which OpenStreetMap endpoints to query,
/// where the stamp starts out, and how the stamped image is drawn.
///
/// # Loading
///
/// ```rust,no_run
/// use snapstamp::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.ai_services.openai.api_key = "sk-...".into();
/// config.ai_services.openai.enabled = true;
/// ```
///
/// Missing sections in a config file fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AI service configurations (OpenAI, Gemini).
    pub ai_services: AiServices,
    /// Order in which AI services are tried (failover chain).
    pub service_order: Vec<String>,
    pub geocoding: GeocodingConfig,
    pub places: PlacesConfig,
    /// Position reported as the device location.
    pub locator: LocatorConfig,
    /// Location shown before any lookup has finished.
    pub default_location: DefaultLocation,
    pub stamp: StampConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
}

/// Configuration for all available AI services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiServices {
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
}

/// OpenAI service configuration (GPT-4o-mini, GPT-4o, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub enabled: bool,
}

/// Google Gemini service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub enabled: bool,
}

/// Nominatim endpoint used for reverse and forward geocoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub user_agent: String,
    /// Language place names are returned in. The stamp font only covers
    /// Latin scripts.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

fn default_accept_language() -> String {
    "en".to_string()
}

/// Overpass endpoint used for the nearby-business search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    pub overpass_url: String,
    pub radius_m: u32,
    /// Maximum number of candidate names handed to the AI.
    pub limit: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocatorConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultLocation {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub details: LocationDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StampConfig {
    pub time_format: TimeFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub target_width: u32,
    pub margin: u32,
    /// Alpha of the band behind the text, 0-255.
    pub band_opacity: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory downloaded images are written to.
    pub directory: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai_services: AiServices {
                openai: OpenAiConfig {
                    api_key: String::new(),
                    model: "gpt-4o-mini".to_string(),
                    enabled: true,
                },
                gemini: GeminiConfig {
                    api_key: String::new(),
                    model: "gemini-2.0-flash".to_string(),
                    enabled: false,
                },
            },
            service_order: vec!["openai".to_string(), "gemini".to_string()],
            geocoding: GeocodingConfig {
                base_url: "https://nominatim.openstreetmap.org".to_string(),
                user_agent: concat!("snapstamp/", env!("CARGO_PKG_VERSION")).to_string(),
                accept_language: default_accept_language(),
            },
            places: PlacesConfig {
                overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
                radius_m: 100,
                limit: 10,
            },
            locator: LocatorConfig::default(),
            default_location: DefaultLocation {
                address: "Manama, Bahrain".to_string(),
                latitude: 26.2285,
                longitude: 50.586,
                details: LocationDetails {
                    road: String::new(),
                    city: "Manama".to_string(),
                    country: "Bahrain".to_string(),
                },
            },
            stamp: StampConfig::default(),
            render: RenderConfig {
                target_width: 800,
                margin: 20,
                band_opacity: 128,
            },
            output: OutputConfig {
                directory: ".".to_string(),
            },
        }
    }
}

impl LocatorConfig {
    /// The configured position, if both coordinates are set.
    pub fn position(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Get the ordered list of enabled AI services.
    pub fn enabled_services(&self) -> Vec<String> {
        self.service_order
            .iter()
            .filter(|name| match name.as_str() {
                "openai" => self.ai_services.openai.enabled,
                "gemini" => self.ai_services.gemini.enabled,
                _ => false,
            })
            .cloned()
            .collect()
    }
}
