/// A recoverable, user-visible failure.
///
/// Every notice is local: it is reported to the user and leaves all other
/// stamp state untouched. None of them is fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    #[error("could not decode photo: {0}")]
    Decode(String),

    #[error("location error: {0}")]
    Geolocation(String),

    #[error("error fetching location details: {0}")]
    Geocode(String),

    #[error("nearby business lookup failed: {0}")]
    NearbyLookup(String),

    #[error("business suggestion failed: {0}")]
    Suggestion(String),

    #[error("no photo selected, please select a photo before downloading")]
    NoPhoto,

    #[error("could not encode stamped image: {0}")]
    Encode(String),
}

impl Notice {
    /// Short heading suitable for a toast or a log prefix.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Decode(_) => "Photo Error",
            Self::Geolocation(_) => "Location Error",
            Self::Geocode(_) => "Address Error",
            Self::NearbyLookup(_) => "Nearby Places Error",
            Self::Suggestion(_) => "Suggestion Error",
            Self::NoPhoto => "No photo selected",
            Self::Encode(_) => "Download Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(Notice::Decode("x".into()).to_string().contains("decode photo"));
        assert!(Notice::Geolocation("x".into()).to_string().starts_with("location error:"));
        assert!(Notice::Geocode("x".into()).to_string().contains("location details"));
        assert!(Notice::NearbyLookup("x".into()).to_string().contains("nearby"));
        assert!(Notice::Suggestion("x".into()).to_string().contains("suggestion"));
        assert!(Notice::NoPhoto.to_string().contains("no photo"));
    }

    #[test]
    fn titles_are_distinct() {
        let notices = [
            Notice::Decode(String::new()),
            Notice::Geolocation(String::new()),
            Notice::Geocode(String::new()),
            Notice::NearbyLookup(String::new()),
            Notice::Suggestion(String::new()),
            Notice::NoPhoto,
            Notice::Encode(String::new()),
        ];
        let mut titles: Vec<_> = notices.iter().map(Notice::title).collect();
        titles.sort();
        titles.dedup();
        assert_eq!(titles.len(), notices.len());
    }
}
