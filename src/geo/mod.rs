//! Location collaborators: device position, reverse and forward geocoding,
//! and nearby-place search.
//!
//! The reconciler only knows these traits. [`NominatimClient`] and
//! [`OverpassClient`] talk to OpenStreetMap services; tests plug in their own.

mod nominatim;
mod overpass;

pub use nominatim::NominatimClient;
pub use overpass::OverpassClient;

use anyhow::Result;

use crate::stamp::{Coordinates, Place};

/// Source of the device's current position.
#[async_trait::async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates>;
}

/// Turns coordinates into an address.
#[async_trait::async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, coords: Coordinates) -> Result<Place>;
}

/// Free-text place search, used by the map picker.
#[async_trait::async_trait]
pub trait ForwardGeocoder: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Place>>;
}

/// Names of businesses around a point, closest first. May be empty.
#[async_trait::async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn nearby(&self, coords: Coordinates, radius_m: u32) -> Result<Vec<String>>;
}

/// A geolocator that reports a configured position.
///
/// Without a position every request fails, as a device with location
/// services turned off would.
pub struct FixedLocator {
    position: Option<Coordinates>,
}

impl FixedLocator {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }
}

#[async_trait::async_trait]
impl Geolocator for FixedLocator {
    async fn locate(&self) -> Result<Coordinates> {
        self.position
            .ok_or_else(|| anyhow::anyhow!("No device position configured"))
    }
}
