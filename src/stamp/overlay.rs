use serde::Serialize;

use super::location::ADDRESS_SEPARATOR;

/// The two text lines drawn onto the photo.
///
/// Always derived from stamp state, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverlaySpec {
    pub timestamp: String,
    pub caption: String,
}

impl OverlaySpec {
    /// True when neither line has anything to draw.
    pub fn is_empty(&self) -> bool {
        self.timestamp.trim().is_empty() && self.caption.trim().is_empty()
    }
}

/// Compose the location caption.
///
/// With a business to include the caption reads `"<business>, <address>"`,
/// otherwise it is the address alone.
pub fn compose_caption(address: &str, business: Option<&str>) -> String {
    let address = address.trim();
    match business.map(str::trim).filter(|b| !b.is_empty()) {
        Some(business) if address.is_empty() => business.to_string(),
        Some(business) => format!("{business}{ADDRESS_SEPARATOR}{address}"),
        None => address.to_string(),
    }
}
