use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;

use super::PlaceSearch;
use crate::stamp::Coordinates;

/// OSM keys whose named features count as businesses.
const BUSINESS_KEYS: &[&str] = &["shop", "amenity", "tourism"];

/// Nearby-place search backed by the Overpass API.
pub struct OverpassClient {
    url: String,
    limit: usize,
    client: Client,
}

impl OverpassClient {
    pub fn new(url: String, limit: usize) -> Self {
        Self {
            url,
            limit,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl PlaceSearch for OverpassClient {
    async fn nearby(&self, coords: Coordinates, radius_m: u32) -> Result<Vec<String>> {
        let query = build_query(coords, radius_m);
        log::debug!("Overpass query: {query}");

        let resp = self
            .client
            .post(&self.url)
            .form(&[("data", query)])
            .send()
            .await
            .context("Overpass request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read Overpass response")?;
        if !status.is_success() {
            anyhow::bail!("Overpass error ({}): {}", status, text);
        }

        let json: Value = serde_json::from_str(&text).context("Failed to parse Overpass response JSON")?;
        Ok(names_by_distance(&json, coords, self.limit))
    }
}

fn build_query(coords: Coordinates, radius_m: u32) -> String {
    let around = format!("(around:{radius_m},{},{})", coords.latitude, coords.longitude);
    let selectors: String = BUSINESS_KEYS
        .iter()
        .map(|key| format!("nwr{around}[\"name\"][\"{key}\"];"))
        .collect();
    format!("[out:json][timeout:25];({selectors});out center;")
}

/// Unique business names from an Overpass result, nearest first.
fn names_by_distance(json: &Value, center: Coordinates, limit: usize) -> Vec<String> {
    let Some(elements) = json["elements"].as_array() else {
        return Vec::new();
    };

    let mut found: Vec<(f64, String)> = elements
        .iter()
        .filter_map(|el| {
            let name = el["tags"]["name"].as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            let lat = el["lat"].as_f64().or_else(|| el["center"]["lat"].as_f64())?;
            let lon = el["lon"].as_f64().or_else(|| el["center"]["lon"].as_f64())?;
            let distance = center.distance_to(&Coordinates::new(lat, lon));
            Some((distance, name.to_string()))
        })
        .collect();

    found.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|(_, name)| seen.insert(name.clone()))
        .map(|(_, name)| name)
        .take(limit)
        .collect()
}
