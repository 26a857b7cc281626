use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::Parser;
use std::path::PathBuf;

use snapstamp::stamp::TimeFormat;
use snapstamp::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "snapstamp",
    version,
    about = "Burn a timestamp and location caption into a photo, optionally naming a nearby business picked by AI"
)]
struct Cli {
    /// Photo to stamp
    #[arg(value_name = "PHOTO")]
    photo: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Full timestamp, "YYYY-MM-DD HH:MM:SS" (default: now)
    #[arg(long, value_name = "DATETIME", conflicts_with = "no_timestamp")]
    at: Option<String>,

    /// Replace the date part, "YYYY-MM-DD"
    #[arg(long, value_name = "DATE", conflicts_with = "no_timestamp")]
    date: Option<String>,

    /// Replace the time part, "HH:MM" or "HH:MM:SS"
    #[arg(long, value_name = "TIME", conflicts_with = "no_timestamp")]
    time: Option<String>,

    /// Leave the timestamp line empty
    #[arg(long)]
    no_timestamp: bool,

    /// Timestamp format: a pattern or one of us, long, short, iso
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<String>,

    /// List the available timestamp formats and exit
    #[arg(long)]
    list_formats: bool,

    /// Use this text as the location instead of looking it up. No nearby
    /// search runs, so the caption never names a business; use --pick or
    /// --lat/--lon for that
    #[arg(short, long, value_name = "ADDRESS", conflicts_with_all = ["pick", "lat"])]
    location: Option<String>,

    /// Search for a place and use the best match as the location
    #[arg(long, value_name = "QUERY", conflicts_with = "lat")]
    pick: Option<String>,

    /// Device latitude to reverse-geocode
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Device longitude to reverse-geocode
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Never add a suggested business to the caption
    #[arg(long)]
    no_business: bool,

    /// Directory to write the stamped PNG to
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Output the result as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if cli.list_formats {
        let now = Local::now().naive_local();
        for format in TimeFormat::ALL {
            println!(
                "  {BOLD}{:<6}{RESET} {:<24} {DIM}{}{RESET}",
                format.keyword(),
                format.pattern(),
                format.format(&now)
            );
        }
        return Ok(());
    }

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let Some(photo) = cli.photo.clone() else {
        anyhow::bail!("No photo specified. Use --help for usage.");
    };

    let mut config = config::Config::load(cli.config.as_deref())?;
    if let (Some(lat), Some(lon)) = (cli.lat, cli.lon) {
        config.locator.latitude = Some(lat);
        config.locator.longitude = Some(lon);
    }

    let format = match cli.format.as_deref() {
        Some(raw) => raw.parse::<TimeFormat>().map_err(anyhow::Error::msg)?,
        None => config.stamp.time_format,
    };

    let location = if let Some(text) = cli.location.clone() {
        pipeline::LocationSource::Manual(text)
    } else if let Some(query) = cli.pick.clone() {
        pipeline::LocationSource::Pick(query)
    } else {
        pipeline::LocationSource::Device
    };

    let output_dir = match cli.output.clone() {
        Some(dir) => dir,
        None => pipeline::output_dir(&config, &std::env::current_dir()?),
    };

    let job = pipeline::StampJob {
        photo,
        timestamp: resolve_timestamp(&cli)?,
        format,
        location,
        include_business: !cli.no_business,
        output_dir,
        epoch_millis: chrono::Utc::now().timestamp_millis(),
    };

    let services = config.enabled_services();
    if services.is_empty() || pipeline::build_advisor_chain(&config).is_empty() {
        log::warn!("No AI services configured. Captions will not name a business.");
    } else {
        log::info!("AI chain: {}", services.join(" → "));
    }

    let mut session = pipeline::build_session(&config);
    let result = pipeline::stamp_photo(&mut session, &job).await;

    for notice in &result.notices {
        log::warn!("  {notice}");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    if let Some(err) = result.error {
        anyhow::bail!(err);
    }
    Ok(())
}

/// Combine `--at`, `--date` and `--time` into the stamp's timestamp.
///
/// Whatever is not given comes from the current local time.
fn resolve_timestamp(cli: &Cli) -> Result<Option<NaiveDateTime>> {
    if cli.no_timestamp {
        return Ok(None);
    }

    let base = match cli.at.as_deref() {
        Some(raw) => parse_datetime(raw)?,
        None => Local::now().naive_local(),
    };
    let date = match cli.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{raw}', expected YYYY-MM-DD"))?,
        None => base.date(),
    };
    let time = match cli.time.as_deref() {
        Some(raw) => parse_time(raw)?,
        None => base.time(),
    };
    Ok(Some(date.and_time(time)))
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .with_context(|| format!("Invalid timestamp '{raw}', expected YYYY-MM-DD HH:MM:SS"))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(raw, f).ok())
        .with_context(|| format!("Invalid time '{raw}', expected HH:MM or HH:MM:SS"))
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print what went onto the photo.
fn print_summary(result: &pipeline::StampResult) {
    println!();
    println!("  {BOLD}Stamp:{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(72));
    print_row("Photo", &result.photo.display().to_string());
    print_row("Timestamp", &result.timestamp);
    print_row("Caption", &result.caption);
    print_row("Address", &result.address);
    if !result.candidates.is_empty() {
        print_row("Nearby", &result.candidates.join("; "));
    }
    if let Some(ref business) = result.business {
        println!("  {GREEN}{:<22}{RESET} : {business}", "Business*");
    }
    if let Some(ref reason) = result.reason {
        print_row("Reason", reason);
    }
    println!("  {DIM}{}{RESET}", "─".repeat(72));
    if let Some(ref path) = result.output {
        println!("  Saved {}", path.display());
    }
    println!();
}

fn print_row(tag: &str, value: &str) {
    if !value.is_empty() {
        println!("  {tag:<22} : {value}");
    }
}
