#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the city-pulse signal pipeline.
//!
//! Reads reports from a JSON file, runs the requested analysis, and prints
//! the result as pretty JSON on stdout. Logging goes to stderr and is
//! controlled with `RUST_LOG`.

mod config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use city_pulse_ai::{LlmSummarizer, RuleBasedSummarizer};
use city_pulse_report_models::{Report, parse_iso_timestamp};
use city_pulse_signal::{AlertPredictor, SentimentClassifier, Summarizer};
use city_pulse_signal_models::{PipelineOptions, SocialPost, UserPreferences, window_from_minutes};
use city_pulse_store::{JsonFileReportStore, ReportStore};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{PulseConfig, SummarizerKind};

#[derive(Parser)]
#[command(name = "city_pulse", about = "Civic report aggregation and signal extraction")]
struct Cli {
    /// JSON file holding the report records
    #[arg(long, global = true, default_value = "reports.json")]
    reports: PathBuf,
    /// Configuration file (defaults to `city_pulse.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Summarizer backend (overrides the config file)
    #[arg(long, global = true, value_enum)]
    summarizer: Option<SummarizerKind>,
    /// Reference instant as RFC 3339 (defaults to the current time)
    #[arg(long, global = true)]
    now: Option<String>,
    /// Recency window in minutes (overrides the config file)
    #[arg(long, global = true)]
    window_minutes: Option<i64>,
    /// Spike threshold (overrides the config file)
    #[arg(long, global = true)]
    threshold: Option<usize>,
    /// Per-call summarizer deadline in seconds (overrides the config file)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster recent reports and summarize every spike
    Synthesize,
    /// Raise predictive alerts from report spikes
    Alerts,
    /// Build per-category notifications for a user's preferences
    Notify {
        /// Location to follow (repeatable; none means all)
        #[arg(long = "location")]
        locations: Vec<String>,
        /// Category to follow (repeatable; none means all)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Summarize recent activity in one area
    Area {
        /// Area (location key) to summarize
        area: String,
    },
    /// Build a digest for one or more cities
    Digest {
        /// Cities to digest (defaults to the default city)
        cities: Vec<String>,
    },
    /// Build a mood map from social posts
    Mood {
        /// JSON file with `[{"text": ..., "location": ...}]` posts
        posts: PathBuf,
        /// Analyze each post individually instead of grouping by location
        #[arg(long)]
        feed: bool,
    },
    /// Find the registered city nearest to a coordinate
    Nearest {
        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },
    /// Fetch live weather, AQI and population for a city
    Metrics {
        /// City name (defaults to the default city)
        city: Option<String>,
    },
    /// List registered cities
    Cities,
}

/// The capability backend selected for this run.
enum Backend {
    Rule(RuleBasedSummarizer),
    Llm(LlmSummarizer),
}

impl Backend {
    fn new(kind: SummarizerKind, timeout: Duration) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(match kind {
            SummarizerKind::Rule => Self::Rule(RuleBasedSummarizer::new()),
            SummarizerKind::Llm => Self::Llm(LlmSummarizer::from_env(timeout)?),
        })
    }

    fn summarizer(&self) -> &dyn Summarizer {
        match self {
            Self::Rule(rules) => rules,
            Self::Llm(llm) => llm,
        }
    }

    fn classifier(&self) -> &dyn SentimentClassifier {
        match self {
            Self::Rule(rules) => rules,
            Self::Llm(llm) => llm,
        }
    }

    fn predictor(&self) -> &dyn AlertPredictor {
        match self {
            Self::Rule(rules) => rules,
            Self::Llm(llm) => llm,
        }
    }
}

/// Settings resolved from the config file and command-line overrides.
struct Settings {
    config: PulseConfig,
    now: DateTime<Utc>,
    window_minutes: Option<i64>,
    threshold: Option<usize>,
    deadline: Option<Duration>,
}

impl Settings {
    fn options(
        &self,
        default_window: i64,
        default_threshold: usize,
    ) -> Result<PipelineOptions, city_pulse_signal::SignalError> {
        let window = window_from_minutes(self.window_minutes.unwrap_or(default_window))?;
        let threshold = self.threshold.unwrap_or(default_threshold);
        let options = city_pulse_signal::pipeline_options(window, threshold, self.now)?;
        Ok(match self.deadline {
            Some(deadline) => options.with_deadline(deadline),
            None => options,
        })
    }

    fn synthesis_options(&self) -> Result<PipelineOptions, city_pulse_signal::SignalError> {
        let pipeline = &self.config.pipeline;
        self.options(pipeline.window_minutes, pipeline.threshold)
    }

    fn alert_options(&self) -> Result<PipelineOptions, city_pulse_signal::SignalError> {
        let pipeline = &self.config.pipeline;
        self.options(pipeline.alert_window_minutes, pipeline.alert_threshold)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn load_reports(path: &Path) -> Result<Vec<Report>, Box<dyn std::error::Error>> {
    let reports = JsonFileReportStore::new(path).fetch_reports().await?;
    Ok(reports)
}

fn load_posts(path: &Path) -> Result<Vec<SocialPost>, Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn resolve_now(now: Option<&str>) -> Result<DateTime<Utc>, String> {
    now.map_or_else(
        || Ok(Utc::now()),
        |s| parse_iso_timestamp(s).ok_or_else(|| format!("Invalid --now timestamp: {s}")),
    )
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = PulseConfig::load(cli.config.as_deref())?;
    let kind = cli.summarizer.unwrap_or(config.summarizer.kind);
    let deadline = cli
        .timeout_secs
        .or(config.pipeline.summarizer_timeout_secs)
        .map(Duration::from_secs);
    let llm_timeout = deadline.unwrap_or(city_pulse_ai::llm::DEFAULT_TIMEOUT);
    let settings = Settings {
        now: resolve_now(cli.now.as_deref())?,
        window_minutes: cli.window_minutes,
        threshold: cli.threshold,
        deadline,
        config,
    };

    match cli.command {
        Commands::Synthesize => {
            let options = settings.synthesis_options()?;
            let backend = Backend::new(kind, llm_timeout)?;
            let reports = load_reports(&cli.reports).await?;
            let events =
                city_pulse_signal::synthesize_events(&reports, &options, backend.summarizer())
                    .await;
            log::info!("Synthesized {} event(s)", events.len());
            print_json(&events)?;
        }
        Commands::Alerts => {
            let options = settings.alert_options()?;
            let backend = Backend::new(kind, llm_timeout)?;
            let reports = load_reports(&cli.reports).await?;
            let alerts =
                city_pulse_signal::alerts::analyze_alerts(&reports, &options, backend.predictor())
                    .await;
            print_json(&alerts)?;
        }
        Commands::Notify { locations, tags } => {
            let backend = Backend::new(kind, llm_timeout)?;
            let reports = load_reports(&cli.reports).await?;
            let preferences = UserPreferences { locations, tags };
            let notifications = city_pulse_signal::notifications::generate_notifications(
                &reports,
                &preferences,
                backend.summarizer(),
                deadline,
                settings.now,
            )
            .await;
            print_json(&notifications)?;
        }
        Commands::Area { area } => {
            let options = settings.alert_options()?;
            let backend = Backend::new(kind, llm_timeout)?;
            let reports = load_reports(&cli.reports).await?;
            let summary = city_pulse_signal::area::summarize_area(
                &reports,
                &area,
                &options,
                backend.summarizer(),
                backend.classifier(),
            )
            .await;
            print_json(&summary)?;
        }
        Commands::Digest { cities } => {
            let backend = Backend::new(kind, llm_timeout)?;
            let reports = load_reports(&cli.reports).await?;
            let cities = if cities.is_empty() {
                vec![city_pulse_cities::default_city().name]
            } else {
                cities
            };
            let digests = city_pulse_signal::digest::generate_multi_city_digest(
                &reports,
                &cities,
                backend.summarizer(),
                backend.classifier(),
                deadline,
                settings.now,
            )
            .await;
            print_json(&digests)?;
        }
        Commands::Mood { posts, feed } => {
            let backend = Backend::new(kind, llm_timeout)?;
            let posts = load_posts(&posts)?;
            if feed {
                let analyzed =
                    city_pulse_signal::mood::analyze_social_feed(&posts, backend.classifier())
                        .await;
                print_json(&analyzed)?;
            } else {
                let mood = city_pulse_signal::mood::analyze_sentiment_by_location(
                    &posts,
                    backend.classifier(),
                )
                .await;
                print_json(&mood)?;
            }
        }
        Commands::Nearest { lat, lon } => {
            let nearest = city_pulse_cities::nearest_city(lat, lon)
                .ok_or_else(|| format!("No city near ({lat}, {lon})"))?;
            log::info!(
                "Nearest city: {} ({:.1}km away)",
                nearest.city.name,
                nearest.distance_km
            );
            print_json(&nearest)?;
        }
        Commands::Metrics { city } => {
            let city = city.unwrap_or_else(|| city_pulse_cities::default_city().name);
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()?;
            let metrics = city_pulse_cities::metrics::fetch_city_metrics(
                &client,
                &city,
                &city_pulse_cities::metrics::MetricsConfig::from_env(),
            )
            .await?;
            print_json(&metrics)?;
        }
        Commands::Cities => {
            println!("{:<12} {:>9} {:>9}", "NAME", "LAT", "LON");
            println!("{}", "-".repeat(32));
            for city in city_pulse_cities::all_cities() {
                println!("{:<12} {:>9.4} {:>9.4}", city.name, city.lat, city.lon);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use city_pulse_signal_models::InvalidOptionsError;
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "city_pulse",
            "synthesize",
            "--reports",
            "data.json",
            "--summarizer",
            "llm",
            "--threshold",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.reports, PathBuf::from("data.json"));
        assert_eq!(cli.summarizer, Some(SummarizerKind::Llm));
        assert_eq!(cli.threshold, Some(4));
    }

    #[test]
    fn nearest_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["city_pulse", "nearest", "-33.86", "151.21"]).unwrap();
        assert!(matches!(cli.command, Commands::Nearest { lat, .. } if lat < 0.0));
    }

    #[test]
    fn flags_override_config_values() {
        let settings = Settings {
            config: PulseConfig::default(),
            now: resolve_now(Some("2024-07-09T10:00:00Z")).unwrap(),
            window_minutes: Some(15),
            threshold: None,
            deadline: Some(Duration::from_secs(2)),
        };
        let options = settings.synthesis_options().unwrap();
        assert_eq!(options.window(), TimeDelta::minutes(15));
        assert_eq!(options.threshold(), 3);
        assert_eq!(options.summarizer_deadline(), Some(Duration::from_secs(2)));

        let alerts = settings.alert_options().unwrap();
        assert_eq!(alerts.window(), TimeDelta::minutes(15));
    }

    #[test]
    fn invalid_overrides_fail_fast() {
        let settings = Settings {
            config: PulseConfig::default(),
            now: Utc::now(),
            window_minutes: None,
            threshold: Some(0),
            deadline: None,
        };
        assert!(settings.synthesis_options().is_err());
    }

    #[test]
    fn out_of_range_window_is_a_config_error() {
        let settings = Settings {
            config: PulseConfig::default(),
            now: Utc::now(),
            window_minutes: Some(i64::MAX),
            threshold: None,
            deadline: None,
        };
        assert!(matches!(
            settings.synthesis_options(),
            Err(city_pulse_signal::SignalError::InvalidConfig(
                InvalidOptionsError::WindowOutOfRange { .. }
            ))
        ));

        let mut config = PulseConfig::default();
        config.pipeline.alert_window_minutes = i64::MIN;
        let settings = Settings {
            config,
            now: Utc::now(),
            window_minutes: None,
            threshold: None,
            deadline: None,
        };
        assert!(settings.alert_options().is_err());
    }

    #[test]
    fn rejects_bad_now() {
        assert!(resolve_now(Some("not a time")).is_err());
    }
}
