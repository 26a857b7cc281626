//! The state reconciler: the single owner of stamp state.

mod event;
mod reconciler;
mod stage;
mod state;

pub use event::{Command, Event};
pub use reconciler::Reconciler;
pub use stage::{Stage, StageStatus, StageTracker, Ticket};
pub use state::{SelectedPhoto, StampState};
