use serde::{Deserialize, Serialize};

/// Separator used both to build addresses and to split typed ones.
pub const ADDRESS_SEPARATOR: &str = ", ";

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance in metres.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// Decomposed address fields. Any of them may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDetails {
    pub road: String,
    pub city: String,
    pub country: String,
}

impl LocationDetails {
    /// Best-effort split of a typed address into road, city and country.
    ///
    /// Parts beyond the third are ignored; missing parts stay empty.
    pub fn from_manual(text: &str) -> Self {
        let mut parts = text.split(ADDRESS_SEPARATOR);
        let mut next = || parts.next().unwrap_or_default().to_string();
        let road = next();
        let city = next();
        let country = next();
        Self { road, city, country }
    }

    /// Non-empty fields joined with the address separator.
    pub fn address(&self) -> String {
        [&self.road, &self.city, &self.country]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(ADDRESS_SEPARATOR)
    }
}

/// A fully resolved place: what a reverse geocode or a map pick returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    pub details: LocationDetails,
    pub coords: Coordinates,
}

/// The current location resolution held in stamp state.
///
/// `coords` survive manual edits unchanged, so they may lag behind a typed
/// address.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Location {
    pub address: String,
    pub details: Option<LocationDetails>,
    pub coords: Option<Coordinates>,
}

impl From<Place> for Location {
    fn from(place: Place) -> Self {
        Self {
            address: place.address,
            details: Some(place.details),
            coords: Some(place.coords),
        }
    }
}
