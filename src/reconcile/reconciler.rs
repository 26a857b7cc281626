use chrono::Local;

use super::event::{Command, Event};
use super::stage::{Stage, StageTracker, Ticket};
use super::state::{SelectedPhoto, StampState};
use crate::ai::{BusinessSuggestion, SuggestionRequest};
use crate::error::Notice;
use crate::stamp::{Coordinates, Location, LocationDetails, OverlaySpec, Place};

/// The inputs a business suggestion depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SuggestionKey {
    photo: u64,
    address: String,
    candidates: Vec<String>,
}

/// Owns stamp state and orders the lookup chain
/// geolocation → reverse geocode → nearby businesses → AI suggestion.
///
/// The reconciler performs no I/O. [`handle`](Self::handle) applies one
/// event and returns the collaborator calls to make; their results come back
/// as events carrying the ticket they were issued with. Results for tickets
/// that have since been superseded are dropped.
pub struct Reconciler {
    state: StampState,
    stages: StageTracker,
    photo_serial: u64,
    /// Key of the most recent suggestion request.
    requested: Option<SuggestionKey>,
    /// Most recent suggestion received, with the key it answered.
    answered: Option<(SuggestionKey, BusinessSuggestion)>,
    notices: Vec<Notice>,
}

impl Reconciler {
    pub fn new(initial: Location) -> Self {
        Self {
            state: StampState::new(initial),
            stages: StageTracker::new(),
            photo_serial: 0,
            requested: None,
            answered: None,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &StampState {
        &self.state
    }

    pub fn stages(&self) -> &StageTracker {
        &self.stages
    }

    pub fn overlay(&self) -> OverlaySpec {
        self.state.overlay()
    }

    /// Drain the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Apply one event and return the collaborator calls it requires.
    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::PhotoSelected(photo) => {
                self.photo_serial += 1;
                log::info!("Photo selected: {}", photo.name());
                self.state.photo = Some(SelectedPhoto {
                    serial: self.photo_serial,
                    photo,
                });
                self.reconcile_suggestion().into_iter().collect()
            }
            Event::TimestampChanged(at) => {
                self.state.timestamp = at;
                Vec::new()
            }
            Event::DateChanged(date) => {
                let time = self
                    .state
                    .timestamp
                    .map(|t| t.time())
                    .unwrap_or_else(|| Local::now().time());
                self.state.timestamp = Some(date.and_time(time));
                Vec::new()
            }
            Event::TimeChanged(time) => {
                let date = self
                    .state
                    .timestamp
                    .map(|t| t.date())
                    .unwrap_or_else(|| Local::now().date_naive());
                self.state.timestamp = Some(date.and_time(time));
                Vec::new()
            }
            Event::FormatChanged(format) => {
                self.state.format = format;
                Vec::new()
            }
            Event::RefreshLocation => vec![self.restart(Stage::Geolocation, |ticket| {
                Command::Locate { ticket }
            })],
            Event::LocationEdited(text) => self.edit_location(text),
            Event::MapPicked(place) => {
                self.cancel_location_lookup();
                self.apply_place(place)
            }
            Event::InclusionToggled(on) => {
                self.toggle_business(on);
                Vec::new()
            }
            Event::Located { ticket, result } => self.on_located(ticket, result),
            Event::ReverseGeocoded { ticket, result } => self.on_reverse_geocoded(ticket, result),
            Event::NearbyFound { ticket, result } => self.on_nearby_found(ticket, result),
            Event::Suggested { ticket, result } => self.on_suggested(ticket, result),
        }
    }

    /// Issue `stage`, cancelling whatever of the chain after it is still
    /// pending from an earlier run.
    fn restart(&mut self, stage: Stage, command: impl FnOnce(Ticket) -> Command) -> Command {
        for later in stage.downstream() {
            self.stages.cancel(*later);
        }
        let ticket = self.stages.issue(stage);
        log::debug!("Issued {stage} request #{}", ticket.generation);
        command(ticket)
    }

    /// Returns `false` (and logs) when `ticket` has been superseded.
    fn accept(&mut self, ticket: Ticket, succeeded: bool) -> bool {
        if self.stages.resolve(ticket, succeeded) {
            return true;
        }
        log::debug!(
            "Discarding stale {} response #{}",
            ticket.stage,
            ticket.generation
        );
        false
    }

    fn cancel_location_lookup(&mut self) {
        let geo = self.stages.cancel(Stage::Geolocation);
        let reverse = self.stages.cancel(Stage::ReverseGeocode);
        if geo || reverse {
            log::debug!("Cancelled pending location lookup");
        }
    }

    fn on_located(&mut self, ticket: Ticket, result: Result<Coordinates, String>) -> Vec<Command> {
        if !self.accept(ticket, result.is_ok()) {
            return Vec::new();
        }
        match result {
            Ok(coords) => vec![self.restart(Stage::ReverseGeocode, |ticket| {
                Command::ReverseGeocode { ticket, coords }
            })],
            Err(reason) => {
                log::warn!("Geolocation failed: {reason}");
                self.notices.push(Notice::Geolocation(reason));
                Vec::new()
            }
        }
    }

    fn on_reverse_geocoded(&mut self, ticket: Ticket, result: Result<Place, String>) -> Vec<Command> {
        if !self.accept(ticket, result.is_ok()) {
            return Vec::new();
        }
        match result {
            Ok(place) => self.apply_place(place),
            Err(reason) => {
                log::warn!("Reverse geocoding failed: {reason}");
                self.notices.push(Notice::Geocode(reason));
                Vec::new()
            }
        }
    }

    /// Replace the location resolution wholesale and look up what is around it.
    fn apply_place(&mut self, place: Place) -> Vec<Command> {
        let coords = place.coords;
        log::info!("Location: {}", place.address);
        self.state.location = Location::from(place);
        self.state.candidates.clear();

        let mut commands = vec![self.restart(Stage::NearbyBusinesses, |ticket| {
            Command::FindNearby { ticket, coords }
        })];
        commands.extend(self.reconcile_suggestion());
        commands
    }

    fn edit_location(&mut self, text: String) -> Vec<Command> {
        self.cancel_location_lookup();
        self.state.location.details = Some(LocationDetails::from_manual(&text));
        self.state.location.address = text;
        self.reconcile_suggestion().into_iter().collect()
    }

    fn on_nearby_found(&mut self, ticket: Ticket, result: Result<Vec<String>, String>) -> Vec<Command> {
        if !self.accept(ticket, result.is_ok()) {
            return Vec::new();
        }
        match result {
            Ok(names) => {
                self.state.candidates = names
                    .into_iter()
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect();
                log::info!("Found {} nearby business(es)", self.state.candidates.len());
                self.reconcile_suggestion().into_iter().collect()
            }
            Err(reason) => {
                log::warn!("Nearby business lookup failed: {reason}");
                self.notices.push(Notice::NearbyLookup(reason));
                Vec::new()
            }
        }
    }

    fn on_suggested(&mut self, ticket: Ticket, result: Result<BusinessSuggestion, String>) -> Vec<Command> {
        if !self.accept(ticket, result.is_ok()) {
            return Vec::new();
        }
        match result {
            Ok(suggestion) => {
                if let Some(key) = self.requested.clone() {
                    self.answered = Some((key, suggestion.clone()));
                }
                self.set_suggestion(suggestion);
            }
            Err(reason) => {
                log::warn!("Business suggestion failed: {reason}");
                self.notices.push(Notice::Suggestion(reason));
            }
        }
        Vec::new()
    }

    fn set_suggestion(&mut self, suggestion: BusinessSuggestion) {
        self.state.include_business = suggestion.business().is_some();
        if let Some(reason) = suggestion.reason.as_deref() {
            log::debug!("Suggestion reason: {reason}");
        }
        self.state.suggestion = Some(suggestion);
    }

    fn toggle_business(&mut self, on: bool) {
        if on && self.state.suggestion.as_ref().and_then(|s| s.business()).is_none() {
            log::warn!("No suggested business to include");
            self.state.include_business = false;
            return;
        }
        self.state.include_business = on;
    }

    fn suggestion_key(&self) -> Option<SuggestionKey> {
        let photo = self.state.photo.as_ref()?;
        let address = self.state.location.address.trim();
        if address.is_empty() || self.state.candidates.is_empty() {
            return None;
        }
        Some(SuggestionKey {
            photo: photo.serial,
            address: address.to_string(),
            candidates: self.state.candidates.clone(),
        })
    }

    /// Keep the business suggestion in step with its inputs.
    ///
    /// When the (photo, address, candidates) key changes the old suggestion
    /// is dropped. A key that was already answered is restored from that
    /// answer; otherwise one request is issued for it.
    fn reconcile_suggestion(&mut self) -> Option<Command> {
        let key = self.suggestion_key();
        if key == self.requested {
            return None;
        }

        self.state.suggestion = None;
        self.state.include_business = false;
        self.stages.cancel(Stage::Suggestion);
        self.requested = key.clone();
        let key = key?;

        if let Some((answered_key, suggestion)) = &self.answered {
            if *answered_key == key {
                log::debug!("Reusing suggestion for unchanged inputs");
                let suggestion = suggestion.clone();
                self.set_suggestion(suggestion);
                return None;
            }
        }

        let photo = self.state.photo.as_ref()?.photo.clone();
        let ticket = self.stages.issue(Stage::Suggestion);
        log::debug!("Issued {} request #{}", Stage::Suggestion, ticket.generation);
        Some(Command::Suggest {
            ticket,
            request: SuggestionRequest {
                photo,
                location: key.address,
                candidates: key.candidates,
            },
        })
    }
}
