use chrono::NaiveDateTime;

use crate::ai::BusinessSuggestion;
use crate::photo::Photo;
use crate::stamp::{Location, OverlaySpec, TimeFormat, compose_caption, stamp_text};

/// The current photo plus the serial number it was selected under.
#[derive(Debug, Clone)]
pub struct SelectedPhoto {
    pub serial: u64,
    pub photo: Photo,
}

/// Canonical stamp state. Only the [`Reconciler`](super::Reconciler)
/// writes it; everyone else reads.
#[derive(Debug, Clone)]
pub struct StampState {
    pub(super) photo: Option<SelectedPhoto>,
    pub(super) timestamp: Option<NaiveDateTime>,
    pub(super) format: TimeFormat,
    pub(super) location: Location,
    pub(super) candidates: Vec<String>,
    pub(super) suggestion: Option<BusinessSuggestion>,
    pub(super) include_business: bool,
}

impl StampState {
    pub(super) fn new(location: Location) -> Self {
        Self {
            photo: None,
            timestamp: None,
            format: TimeFormat::default(),
            location,
            candidates: Vec::new(),
            suggestion: None,
            include_business: false,
        }
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref().map(|p| &p.photo)
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    pub fn format(&self) -> TimeFormat {
        self.format
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn suggestion(&self) -> Option<&BusinessSuggestion> {
        self.suggestion.as_ref()
    }

    pub fn include_business(&self) -> bool {
        self.include_business
    }

    /// The business that would currently appear in the caption.
    pub fn included_business(&self) -> Option<&str> {
        if !self.include_business {
            return None;
        }
        self.suggestion.as_ref().and_then(BusinessSuggestion::business)
    }

    /// Derive the overlay text from the current state.
    pub fn overlay(&self) -> OverlaySpec {
        OverlaySpec {
            timestamp: stamp_text(self.timestamp.as_ref(), self.format),
            caption: compose_caption(&self.location.address, self.included_business()),
        }
    }
}
