use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ai::{self, AdvisorChain, BusinessAdvisor};
use crate::config::Config;
use crate::geo::{FixedLocator, NominatimClient, OverpassClient};
use crate::photo::Photo;
use crate::reconcile::Event;
use crate::render::RenderOptions;
use crate::session::{Collaborators, Session};
use crate::stamp::{Coordinates, Location, TimeFormat};

/// Where the stamp's location comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSource {
    /// Ask the device for its position and reverse-geocode it.
    Device,
    /// Use typed text as the address.
    ///
    /// Nothing is looked up: with no coordinates for the text there are no
    /// nearby candidates, so no business is suggested.
    Manual(String),
    /// Search for a place and use the best match, as the map picker does.
    Pick(String),
}

/// Everything needed to stamp one photo.
#[derive(Debug, Clone)]
pub struct StampJob {
    pub photo: PathBuf,
    pub timestamp: Option<NaiveDateTime>,
    pub format: TimeFormat,
    pub location: LocationSource,
    /// Whether an AI-suggested business may appear in the caption.
    pub include_business: bool,
    pub output_dir: PathBuf,
    /// Names the artifact.
    pub epoch_millis: i64,
}

/// The outcome of stamping a single photo.
///
/// Notices are the non-fatal problems met on the way; `error` is set only
/// when no image was written.
#[derive(Debug, Default, Serialize)]
pub struct StampResult {
    pub photo: PathBuf,
    pub timestamp: String,
    pub caption: String,
    pub address: String,
    pub candidates: Vec<String>,
    pub business: Option<String>,
    pub reason: Option<String>,
    pub notices: Vec<String>,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

/// Build the AI advisor failover chain from the configuration.
///
/// Services are added in `service_order`; enabled services without an API
/// key are skipped with a warning.
pub fn build_advisor_chain(config: &Config) -> AdvisorChain {
    let mut advisors: Vec<Box<dyn BusinessAdvisor>> = Vec::new();

    for name in &config.service_order {
        match name.as_str() {
            "openai" if config.ai_services.openai.enabled => {
                if config.ai_services.openai.api_key.is_empty() {
                    log::warn!("OpenAI enabled but no API key configured");
                    continue;
                }
                advisors.push(Box::new(ai::OpenAiService::new(
                    config.ai_services.openai.api_key.clone(),
                    config.ai_services.openai.model.clone(),
                )));
            }
            "gemini" if config.ai_services.gemini.enabled => {
                if config.ai_services.gemini.api_key.is_empty() {
                    log::warn!("Gemini enabled but no API key configured");
                    continue;
                }
                advisors.push(Box::new(ai::GeminiService::new(
                    config.ai_services.gemini.api_key.clone(),
                    config.ai_services.gemini.model.clone(),
                )));
            }
            _ => {}
        }
    }

    AdvisorChain::new(advisors)
}

/// Wire the OpenStreetMap clients, the AI chain and the configured device
/// position into a set of collaborators.
pub fn build_collaborators(config: &Config) -> Collaborators {
    let nominatim = Arc::new(NominatimClient::new(
        config.geocoding.base_url.clone(),
        config.geocoding.user_agent.clone(),
        config.geocoding.accept_language.clone(),
    ));
    Collaborators {
        locator: Arc::new(FixedLocator::new(config.locator.position())),
        geocoder: nominatim.clone(),
        finder: nominatim,
        places: Arc::new(OverpassClient::new(
            config.places.overpass_url.clone(),
            config.places.limit,
        )),
        advisor: Arc::new(build_advisor_chain(config)),
        search_radius_m: config.places.radius_m,
    }
}

/// The location shown before any lookup has finished.
pub fn initial_location(config: &Config) -> Location {
    let d = &config.default_location;
    Location {
        address: d.address.clone(),
        details: Some(d.details.clone()),
        coords: Some(Coordinates::new(d.latitude, d.longitude)),
    }
}

pub fn render_options(config: &Config) -> RenderOptions {
    let defaults = RenderOptions::default();
    let [r, g, b, _] = defaults.band_color;
    RenderOptions {
        target_width: config.render.target_width,
        margin: config.render.margin,
        band_color: [r, g, b, config.render.band_opacity],
        ..defaults
    }
}

/// A session wired to the services named in `config`.
pub fn build_session(config: &Config) -> Session {
    Session::new(
        initial_location(config),
        build_collaborators(config),
        render_options(config),
    )
}

/// Stamp one photo from start to finish.
///
/// Loads the photo, applies the timestamp and location, waits for every
/// lookup to settle, then writes the flattened PNG into the job's output
/// directory.
pub async fn stamp_photo(session: &mut Session, job: &StampJob) -> StampResult {
    let mut result = StampResult {
        photo: job.photo.clone(),
        ..StampResult::default()
    };

    let photo = match Photo::open(&job.photo) {
        Ok(photo) => photo,
        Err(e) => {
            result.error = Some(format!("{e:#}"));
            return result;
        }
    };

    session.dispatch(Event::TimestampChanged(job.timestamp));
    session.dispatch(Event::FormatChanged(job.format));
    session.dispatch(Event::PhotoSelected(photo));

    match &job.location {
        LocationSource::Device => session.dispatch(Event::RefreshLocation),
        LocationSource::Manual(text) => session.dispatch(Event::LocationEdited(text.clone())),
        LocationSource::Pick(query) => {
            if let Err(notice) = session.pick(query).await {
                log::warn!("{}: {notice}", notice.title());
                result.notices.push(notice.to_string());
            }
        }
    }

    session.settle().await;
    if !job.include_business {
        session.dispatch(Event::InclusionToggled(false));
    }

    result
        .notices
        .extend(session.take_notices().iter().map(ToString::to_string));
    fill_summary(&mut result, session);

    match session.download(job.epoch_millis) {
        Ok(artifact) => match artifact.save(&job.output_dir) {
            Ok(path) => result.output = Some(path),
            Err(e) => result.error = Some(format!("{e:#}")),
        },
        Err(notice) => result.error = Some(notice.to_string()),
    }

    result
}

fn fill_summary(result: &mut StampResult, session: &Session) {
    let state = session.state();
    let overlay = state.overlay();
    result.timestamp = overlay.timestamp;
    result.caption = overlay.caption;
    result.address = state.location().address.clone();
    result.candidates = state.candidates().to_vec();
    result.business = state.included_business().map(str::to_string);
    result.reason = state.suggestion().and_then(|s| s.reason.clone());
}

/// Default output directory: the configured one, relative to `base`.
pub fn output_dir(config: &Config, base: &Path) -> PathBuf {
    base.join(&config.output.directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── build_advisor_chain ──────────────────────────────────────────

    #[test]
    fn build_advisor_chain_none_enabled() {
        let mut config = Config::default();
        config.ai_services.openai.enabled = false;
        config.ai_services.gemini.enabled = false;

        let chain = build_advisor_chain(&config);
        assert!(chain.is_empty());
    }

    #[test]
    fn build_advisor_chain_skips_empty_keys() {
        let config = Config::default(); // openai enabled but key is empty
        let chain = build_advisor_chain(&config);
        assert!(chain.is_empty());
    }

    #[test]
    fn build_advisor_chain_with_key() {
        let mut config = Config::default();
        config.ai_services.openai.api_key = "sk-test".to_string();

        let chain = build_advisor_chain(&config);
        assert_eq!(chain.names(), vec!["OpenAI"]);
    }

    #[test]
    fn build_advisor_chain_respects_order() {
        let mut config = Config::default();
        config.ai_services.openai.api_key = "sk-test".to_string();
        config.ai_services.gemini.api_key = "g-test".to_string();
        config.ai_services.gemini.enabled = true;
        config.service_order = vec!["gemini".to_string(), "openai".to_string()];

        let chain = build_advisor_chain(&config);
        assert_eq!(chain.names(), vec!["Gemini", "OpenAI"]);
    }

    // ── initial state ────────────────────────────────────────────────

    #[test]
    fn initial_location_from_config() {
        let location = initial_location(&Config::default());
        assert_eq!(location.address, "Manama, Bahrain");
        assert_eq!(location.coords, Some(Coordinates::new(26.2285, 50.586)));
        assert_eq!(location.details.map(|d| d.country), Some("Bahrain".to_string()));
    }

    #[test]
    fn render_options_take_band_opacity() {
        let mut config = Config::default();
        config.render.band_opacity = 200;
        config.render.target_width = 640;

        let options = render_options(&config);
        assert_eq!(options.band_color, [0, 0, 0, 200]);
        assert_eq!(options.target_width, 640);
        assert_eq!(options.line_gap, RenderOptions::default().line_gap);
    }

    // ── stamp_photo ──────────────────────────────────────────────────

    fn job(photo: PathBuf, output_dir: PathBuf) -> StampJob {
        StampJob {
            photo,
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 8, 23).and_then(|d| d.and_hms_opt(16, 30, 0)),
            format: TimeFormat::ShortMonth,
            location: LocationSource::Manual("Main St, Springfield, USA".to_string()),
            include_business: true,
            output_dir,
            epoch_millis: 1_724_430_600_000,
        }
    }

    #[tokio::test]
    async fn stamp_photo_with_typed_location() {
        let dir = TempDir::new().unwrap();
        let photo_path = dir.path().join("in.png");
        image::RgbaImage::from_pixel(1000, 500, image::Rgba([10, 20, 30, 255]))
            .save(&photo_path)
            .unwrap();

        let mut session = build_session(&Config::default());
        let result = stamp_photo(&mut session, &job(photo_path, dir.path().join("out"))).await;

        assert!(result.error.is_none(), "{:?}", result.error);
        assert_eq!(result.timestamp, "Aug 23, 2024, 4:30 PM");
        assert_eq!(result.caption, "Main St, Springfield, USA");
        assert!(result.business.is_none());
        assert!(result.candidates.is_empty());
        assert!(result.reason.is_none());
        assert!(result.notices.is_empty());

        let output = result.output.unwrap();
        assert_eq!(output, dir.path().join("out").join("snapstamp-1724430600000.png"));
        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (800, 400));
    }

    #[tokio::test]
    async fn stamp_photo_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut session = build_session(&Config::default());
        let result = stamp_photo(&mut session, &job(dir.path().join("nope.jpg"), dir.path().to_path_buf())).await;

        assert!(result.error.is_some());
        assert!(result.output.is_none());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn stamp_photo_undecodable_file() {
        let dir = TempDir::new().unwrap();
        let photo_path = dir.path().join("broken.jpg");
        std::fs::write(&photo_path, b"not an image").unwrap();

        let mut session = build_session(&Config::default());
        let result = stamp_photo(&mut session, &job(photo_path, dir.path().join("out"))).await;

        assert!(result.error.unwrap().contains("could not decode photo"));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn output_dir_is_relative_to_base() {
        let mut config = Config::default();
        config.output.directory = "stamped".to_string();
        assert_eq!(output_dir(&config, Path::new("/tmp")), PathBuf::from("/tmp/stamped"));
    }
}
