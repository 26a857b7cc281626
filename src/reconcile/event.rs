use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::stage::Ticket;
use crate::ai::{BusinessSuggestion, SuggestionRequest};
use crate::photo::Photo;
use crate::stamp::{Coordinates, Place, TimeFormat};

/// Everything that can change stamp state: user actions and collaborator
/// responses.
///
/// Response errors are carried as display strings; the reconciler turns
/// them into notices.
#[derive(Debug, Clone)]
pub enum Event {
    PhotoSelected(Photo),
    TimestampChanged(Option<NaiveDateTime>),
    DateChanged(NaiveDate),
    TimeChanged(NaiveTime),
    FormatChanged(TimeFormat),
    RefreshLocation,
    LocationEdited(String),
    MapPicked(Place),
    InclusionToggled(bool),
    Located {
        ticket: Ticket,
        result: Result<Coordinates, String>,
    },
    ReverseGeocoded {
        ticket: Ticket,
        result: Result<Place, String>,
    },
    NearbyFound {
        ticket: Ticket,
        result: Result<Vec<String>, String>,
    },
    Suggested {
        ticket: Ticket,
        result: Result<BusinessSuggestion, String>,
    },
}

/// A collaborator call the reconciler wants made. Its outcome must come
/// back as the matching [`Event`] carrying the same ticket.
#[derive(Debug, Clone)]
pub enum Command {
    Locate {
        ticket: Ticket,
    },
    ReverseGeocode {
        ticket: Ticket,
        coords: Coordinates,
    },
    FindNearby {
        ticket: Ticket,
        coords: Coordinates,
    },
    Suggest {
        ticket: Ticket,
        request: SuggestionRequest,
    },
}

impl Command {
    pub fn ticket(&self) -> Ticket {
        match self {
            Command::Locate { ticket }
            | Command::ReverseGeocode { ticket, .. }
            | Command::FindNearby { ticket, .. }
            | Command::Suggest { ticket, .. } => *ticket,
        }
    }
}
