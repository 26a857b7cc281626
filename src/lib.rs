//! # snapstamp
//!
//! Stamp photos with a timestamp and a location caption, optionally naming a
//! nearby business chosen by an AI vision model (OpenAI, Google Gemini).
//!
//! ## Quick Start
//!
//! The pipeline module runs the whole flow for one photo: load, look up the
//! location, ask the AI about nearby businesses, render and save.
//!
//! ```rust,no_run
//! use snapstamp::config::Config;
//! use snapstamp::pipeline::{LocationSource, StampJob, build_session, stamp_photo};
//! use snapstamp::stamp::TimeFormat;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let mut session = build_session(&config);
//!
//!     let job = StampJob {
//!         photo: "photo.jpg".into(),
//!         timestamp: Some(chrono::Local::now().naive_local()),
//!         format: TimeFormat::UsNumeric,
//!         location: LocationSource::Device,
//!         include_business: true,
//!         output_dir: ".".into(),
//!         epoch_millis: chrono::Utc::now().timestamp_millis(),
//!     };
//!
//!     let result = stamp_photo(&mut session, &job).await;
//!     match result.error {
//!         Some(err) => eprintln!("Failed: {err}"),
//!         None => println!("Caption: {}", result.caption),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The [`reconcile::Reconciler`] is a synchronous state machine: feed it
//! events, run the commands it returns, and feed their results back. The
//! composition engine in [`render`] is a pure function of photo, overlay and
//! options.
//!
//! ```rust
//! use snapstamp::reconcile::{Command, Event, Reconciler};
//! use snapstamp::stamp::Location;
//!
//! let mut reconciler = Reconciler::new(Location::default());
//! let commands = reconciler.handle(Event::RefreshLocation);
//! assert!(matches!(commands[..], [Command::Locate { .. }]));
//! ```

pub mod ai;
pub mod config;
pub mod error;
pub mod geo;
pub mod photo;
pub mod pipeline;
pub mod reconcile;
pub mod render;
pub mod session;
pub mod stamp;
