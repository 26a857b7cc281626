use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of display formats for the timestamp line.
///
/// Each variant is identified by its date-fns style pattern, which is also
/// its serialized form in `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    /// `08/23/2024, 4:30:00 PM`
    #[default]
    #[serde(rename = "MM/dd/yyyy, h:mm:ss a")]
    UsNumeric,
    /// `Friday, August 23rd, 2024`
    #[serde(rename = "eeee, MMMM do, yyyy")]
    LongDate,
    /// `Aug 23, 2024, 4:30 PM`
    #[serde(rename = "MMM d, yyyy, h:mm a")]
    ShortMonth,
    /// `2024-08-23 16:30:00`
    #[serde(rename = "yyyy-MM-dd HH:mm:ss")]
    Iso,
}

impl TimeFormat {
    pub const ALL: [TimeFormat; 4] = [
        TimeFormat::UsNumeric,
        TimeFormat::LongDate,
        TimeFormat::ShortMonth,
        TimeFormat::Iso,
    ];

    /// The pattern identifier of this format.
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::UsNumeric => "MM/dd/yyyy, h:mm:ss a",
            Self::LongDate => "eeee, MMMM do, yyyy",
            Self::ShortMonth => "MMM d, yyyy, h:mm a",
            Self::Iso => "yyyy-MM-dd HH:mm:ss",
        }
    }

    /// Short keyword accepted on the command line.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::UsNumeric => "us",
            Self::LongDate => "long",
            Self::ShortMonth => "short",
            Self::Iso => "iso",
        }
    }

    /// Human-facing example of the format, shown in pickers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UsNumeric => "08/23/2024, 4:30:00 PM",
            Self::LongDate => "Friday, August 23rd, 2024",
            Self::ShortMonth => "Aug 23, 2024, 4:30 PM",
            Self::Iso => "2024-08-23 16:30:00",
        }
    }

    /// Render a timestamp in this format.
    pub fn format(&self, at: &NaiveDateTime) -> String {
        match self {
            Self::UsNumeric => at.format("%m/%d/%Y, %-I:%M:%S %p").to_string(),
            Self::LongDate => format!(
                "{}, {} {}, {}",
                at.format("%A"),
                at.format("%B"),
                ordinal(at.day()),
                at.year()
            ),
            Self::ShortMonth => at.format("%b %-d, %Y, %-I:%M %p").to_string(),
            Self::Iso => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Timestamp text for an optional timestamp; absent means empty.
pub fn stamp_text(at: Option<&NaiveDateTime>, format: TimeFormat) -> String {
    at.map(|at| format.format(at)).unwrap_or_default()
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix}")
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

impl FromStr for TimeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.pattern() == wanted || f.keyword().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|f| f.keyword()).collect();
                format!("unknown time format '{wanted}' (expected one of: {})", known.join(", "))
            })
    }
}
