use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

use super::{ForwardGeocoder, ReverseGeocoder};
use crate::stamp::{Coordinates, LocationDetails, Place};

const UNKNOWN_LOCATION: &str = "Unknown location";

/// Client for a Nominatim (OpenStreetMap) geocoding server.
pub struct NominatimClient {
    base_url: String,
    user_agent: String,
    /// Preferred language for place names, e.g. "en".
    accept_language: String,
    client: Client,
}

impl NominatimClient {
    pub fn new(base_url: String, user_agent: String, accept_language: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent,
            accept_language,
            client: Client::new(),
        }
    }

    fn reverse_query(&self, coords: Coordinates) -> Vec<(&'static str, String)> {
        self.with_language(vec![
            ("format", "json".to_string()),
            ("lat", coords.latitude.to_string()),
            ("lon", coords.longitude.to_string()),
        ])
    }

    fn search_query(&self, query: &str) -> Vec<(&'static str, String)> {
        self.with_language(vec![
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", "5".to_string()),
            ("q", query.to_string()),
        ])
    }

    // Without it Nominatim answers in the local script, which the glyph set lacks.
    fn with_language(&self, mut query: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let lang = self.accept_language.trim();
        if !lang.is_empty() {
            query.push(("accept-language", lang.to_string()));
        }
        query
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .query(query)
            .send()
            .await
            .context("Nominatim request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read Nominatim response")?;
        if !status.is_success() {
            anyhow::bail!("Nominatim error ({}): {}", status, text);
        }
        serde_json::from_str(&text).context("Failed to parse Nominatim response JSON")
    }
}

#[async_trait::async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse(&self, coords: Coordinates) -> Result<Place> {
        let json = self.get_json("reverse", &self.reverse_query(coords)).await?;

        if let Some(err) = json["error"].as_str() {
            anyhow::bail!("Nominatim: {err}");
        }
        Ok(place_from_json(&json, coords))
    }
}

#[async_trait::async_trait]
impl ForwardGeocoder for NominatimClient {
    async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let json = self.get_json("search", &self.search_query(query)).await?;

        let results = json.as_array().context("Nominatim search did not return a list")?;
        Ok(results.iter().filter_map(search_hit_to_place).collect())
    }
}

fn search_hit_to_place(hit: &Value) -> Option<Place> {
    let lat = hit["lat"].as_str()?.parse().ok()?;
    let lon = hit["lon"].as_str()?.parse().ok()?;
    Some(place_from_json(hit, Coordinates::new(lat, lon)))
}

/// Build a [`Place`] from a Nominatim result object.
///
/// The address is road, city and country joined; when none of them is known
/// the server's display name is used, then a fixed placeholder.
fn place_from_json(json: &Value, coords: Coordinates) -> Place {
    let address = &json["address"];
    let pick = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| address[*k].as_str().filter(|v| !v.is_empty()))
            .unwrap_or_default()
            .to_string()
    };

    let details = LocationDetails {
        road: pick(&["road", "street"]),
        city: pick(&["city", "town", "village"]),
        country: pick(&["country"]),
    };

    let mut full = details.address();
    if full.is_empty() {
        full = json["display_name"]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_LOCATION)
            .to_string();
    }

    Place {
        address: full,
        details,
        coords,
    }
}
