use serde::Serialize;
use std::fmt;

/// One asynchronous lookup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Geolocation,
    ReverseGeocode,
    NearbyBusinesses,
    Suggestion,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Geolocation,
        Stage::ReverseGeocode,
        Stage::NearbyBusinesses,
        Stage::Suggestion,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Stages that run after this one in the location chain.
    pub fn downstream(self) -> &'static [Stage] {
        match self {
            Stage::Geolocation => &[Stage::ReverseGeocode, Stage::NearbyBusinesses],
            Stage::ReverseGeocode => &[Stage::NearbyBusinesses],
            Stage::NearbyBusinesses | Stage::Suggestion => &[],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Geolocation => "geolocation",
            Stage::ReverseGeocode => "reverse geocode",
            Stage::NearbyBusinesses => "nearby businesses",
            Stage::Suggestion => "business suggestion",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StageStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Failed,
}

/// Identifies one issued request. Only the ticket holding a stage's latest
/// generation may resolve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub stage: Stage,
    pub generation: u64,
}

/// Per-stage generation counters and statuses.
///
/// Requests are never aborted; a newer generation simply makes older
/// responses stale.
#[derive(Debug, Clone, Default)]
pub struct StageTracker {
    generations: [u64; 4],
    statuses: [StageStatus; 4],
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request for `stage`, superseding any in flight.
    pub fn issue(&mut self, stage: Stage) -> Ticket {
        let i = stage.index();
        self.generations[i] += 1;
        self.statuses[i] = StageStatus::Pending;
        Ticket {
            stage,
            generation: self.generations[i],
        }
    }

    /// Abandon an in-flight request without issuing another.
    ///
    /// Returns whether anything was pending.
    pub fn cancel(&mut self, stage: Stage) -> bool {
        let i = stage.index();
        if self.statuses[i] != StageStatus::Pending {
            return false;
        }
        self.generations[i] += 1;
        self.statuses[i] = StageStatus::Idle;
        true
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.statuses[ticket.stage.index()] == StageStatus::Pending
            && self.generations[ticket.stage.index()] == ticket.generation
    }

    /// Record the outcome for `ticket`. Stale tickets change nothing and
    /// return `false`.
    pub fn resolve(&mut self, ticket: Ticket, succeeded: bool) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.statuses[ticket.stage.index()] = if succeeded {
            StageStatus::Success
        } else {
            StageStatus::Failed
        };
        true
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.statuses[stage.index()]
    }

    pub fn is_pending(&self, stage: Stage) -> bool {
        self.status(stage) == StageStatus::Pending
    }

    pub fn any_pending(&self) -> bool {
        Stage::ALL.iter().any(|s| self.is_pending(*s))
    }
}
