//! Async driver around the [`Reconciler`].
//!
//! The session turns reconciler commands into collaborator calls running on
//! a tokio [`JoinSet`] and feeds each response back through the reconciler
//! as an event. Only the session touches the reconciler, so state has a
//! single writer no matter how responses interleave.

use std::sync::Arc;
use tokio::task::JoinSet;

use crate::ai::BusinessAdvisor;
use crate::error::Notice;
use crate::geo::{ForwardGeocoder, Geolocator, PlaceSearch, ReverseGeocoder};
use crate::reconcile::{Command, Event, Reconciler, StampState};
use crate::render::{self, Artifact, RenderOptions, Rendered};
use crate::stamp::{Coordinates, Location, OverlaySpec, Place};

/// The external services a session calls out to.
#[derive(Clone)]
pub struct Collaborators {
    pub locator: Arc<dyn Geolocator>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub finder: Arc<dyn ForwardGeocoder>,
    pub places: Arc<dyn PlaceSearch>,
    pub advisor: Arc<dyn BusinessAdvisor>,
    /// Radius of the nearby-business search, in metres.
    pub search_radius_m: u32,
}

pub struct Session {
    reconciler: Reconciler,
    collaborators: Collaborators,
    in_flight: JoinSet<Event>,
    render: RenderOptions,
}

impl Session {
    pub fn new(initial: Location, collaborators: Collaborators, render: RenderOptions) -> Self {
        Self {
            reconciler: Reconciler::new(initial),
            collaborators,
            in_flight: JoinSet::new(),
            render,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn state(&self) -> &StampState {
        self.reconciler.state()
    }

    pub fn overlay(&self) -> OverlaySpec {
        self.reconciler.overlay()
    }

    /// Number of collaborator calls still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.reconciler.take_notices()
    }

    /// Apply `event` and start whatever calls it requires.
    pub fn dispatch(&mut self, event: Event) {
        for command in self.reconciler.handle(event) {
            self.spawn(command);
        }
    }

    /// Wait for the next collaborator response and apply it.
    ///
    /// Returns `false` once nothing is in flight.
    pub async fn step(&mut self) -> bool {
        match self.in_flight.join_next().await {
            None => false,
            Some(Ok(event)) => {
                self.dispatch(event);
                true
            }
            Some(Err(e)) => {
                log::error!("Lookup task did not complete: {e}");
                true
            }
        }
    }

    /// Run until every call, including ones started along the way, has
    /// answered.
    pub async fn settle(&mut self) {
        while self.step().await {}
    }

    /// Resolve a free-text place through the forward geocoder and apply the
    /// best match as a map pick.
    pub async fn pick(&mut self, query: &str) -> Result<Place, Notice> {
        let hits = self
            .collaborators
            .finder
            .search(query)
            .await
            .map_err(|e| Notice::Geocode(describe(e)))?;
        let place = hits
            .into_iter()
            .next()
            .ok_or_else(|| Notice::Geocode(format!("no place found for \"{query}\"")))?;
        self.dispatch(Event::MapPicked(place.clone()));
        Ok(place)
    }

    /// Resolve a clicked map point and apply it as a map pick.
    pub async fn pick_at(&mut self, coords: Coordinates) -> Result<Place, Notice> {
        let place = self
            .collaborators
            .geocoder
            .reverse(coords)
            .await
            .map_err(|e| Notice::Geocode(describe(e)))?;
        self.dispatch(Event::MapPicked(place.clone()));
        Ok(place)
    }

    /// Render the current state, or `None` when no photo is selected.
    pub fn preview(&self) -> Result<Option<Rendered>, Notice> {
        let state = self.reconciler.state();
        let Some(photo) = state.photo() else {
            return Ok(None);
        };
        render::render(photo, &state.overlay(), &self.render).map(Some)
    }

    /// Flatten the current preview into a PNG named after `epoch_millis`.
    pub fn download(&self, epoch_millis: i64) -> Result<Artifact, Notice> {
        let state = self.reconciler.state();
        render::download(state.photo(), &state.overlay(), &self.render, epoch_millis)
    }

    fn spawn(&mut self, command: Command) {
        let c = &self.collaborators;
        match command {
            Command::Locate { ticket } => {
                let locator = Arc::clone(&c.locator);
                self.in_flight.spawn(async move {
                    let result = locator.locate().await.map_err(describe);
                    Event::Located { ticket, result }
                });
            }
            Command::ReverseGeocode { ticket, coords } => {
                let geocoder = Arc::clone(&c.geocoder);
                self.in_flight.spawn(async move {
                    let result = geocoder.reverse(coords).await.map_err(describe);
                    Event::ReverseGeocoded { ticket, result }
                });
            }
            Command::FindNearby { ticket, coords } => {
                let places = Arc::clone(&c.places);
                let radius = c.search_radius_m;
                self.in_flight.spawn(async move {
                    let result = places.nearby(coords, radius).await.map_err(describe);
                    Event::NearbyFound { ticket, result }
                });
            }
            Command::Suggest { ticket, request } => {
                let advisor = Arc::clone(&c.advisor);
                self.in_flight.spawn(async move {
                    let result = advisor.suggest(&request).await.map_err(describe);
                    Event::Suggested { ticket, result }
                });
            }
        }
    }
}

fn describe(e: anyhow::Error) -> String {
    format!("{e:#}")
}
