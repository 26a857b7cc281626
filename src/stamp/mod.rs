//! Stamp content: the time format table, the location model and the
//! derivation of the overlay text.

mod format;
mod location;
mod overlay;

pub use format::{TimeFormat, stamp_text};
pub use location::{ADDRESS_SEPARATOR, Coordinates, Location, LocationDetails, Place};
pub use overlay::{OverlaySpec, compose_caption};
