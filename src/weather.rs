use crate::{
    config::WeatherConfig, driver::LCD_WIDTH, render::truncate,
    util::ErrorDedup,
};
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use log::{debug, info, Level};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use ureq::{Agent, AgentBuilder, Request};

/// Gotta know weather or not it's gonna rain. Resolves a place name to a
/// one-line summary, with a single-slot cache on disk so restarts don't
/// hammer the API.
#[derive(Debug)]
pub struct WeatherCache<S> {
    source: S,
    path: PathBuf,
    ttl: Duration,
    /// Upper bound on one whole fetch, across all of its requests
    timeout: Duration,
    errors: ErrorDedup,
}

impl<S: WeatherSource> WeatherCache<S> {
    pub fn new(
        source: S,
        path: PathBuf,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            path,
            ttl,
            timeout,
            errors: ErrorDedup::new(),
        }
    }

    /// Get a weather summary for the location, from cache if it's fresh or
    /// the network if not. `None` means there's nothing to show, for any
    /// reason.
    pub fn get_weather(&self, location: Option<&str>) -> Option<String> {
        self.get_weather_at(location, Utc::now())
    }

    /// [Self::get_weather] with an explicit "now"
    pub fn get_weather_at(
        &self,
        location: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let location = location.filter(|location| !location.is_empty())?;

        // The cache holds whatever was fetched last, no matter which
        // location it was for
        if let Some(entry) = CacheEntry::load(&self.path) {
            if entry.is_fresh(now, self.ttl) {
                debug!("Using cached weather `{}`", entry.summary);
                return Some(entry.summary);
            }
        }

        // This runs every tick while the network is down, so only log
        // what's new
        match self.fetch(location, now) {
            Ok(Some(summary)) => {
                self.errors.clear();
                Some(summary)
            }
            Ok(None) => {
                let err = anyhow!("No geocoding results for `{location}`");
                self.errors.report(Level::Info, &err);
                None
            }
            Err(err) => {
                let err = err.context(format!(
                    "Error fetching weather for `{location}`"
                ));
                self.errors.report(Level::Error, &err);
                None
            }
        }
    }

    /// Hit the network and store the result. `Ok(None)` means the location
    /// didn't resolve to anywhere. Both requests share one deadline, so a
    /// slow network can't hold up the caller for longer than the timeout.
    fn fetch(
        &self,
        location: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<String>> {
        debug!("Fetching weather for `{location}`");
        let deadline = Instant::now()
            .checked_add(self.timeout)
            .context("Weather timeout is too large")?;
        let Some(coordinates) = self.source.geocode(location, deadline)? else {
            return Ok(None);
        };
        time_left(deadline)?;
        let conditions =
            self.source.current_conditions(coordinates, deadline)?;
        let summary = conditions.summary();

        let entry = CacheEntry {
            fetched_at: epoch_seconds(now),
            summary,
        };
        entry.save(&self.path)?;
        info!("Fetched weather for `{location}`: {}", entry.summary);
        Ok(Some(entry.summary))
    }
}

/// Where the weather actually comes from. Every lookup gets a deadline, and
/// must give up once it passes.
pub trait WeatherSource {
    /// Resolve a place name to its first match, if any
    fn geocode(
        &self,
        location: &str,
        deadline: Instant,
    ) -> anyhow::Result<Option<Coordinates>>;

    fn current_conditions(
        &self,
        coordinates: Coordinates,
        deadline: Instant,
    ) -> anyhow::Result<Conditions>;
}

/// Time remaining until a deadline. Error if there's none left.
pub fn time_left(deadline: Instant) -> anyhow::Result<Duration> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        bail!("Timed out fetching weather");
    }
    Ok(remaining)
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions at a point
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct Conditions {
    pub temperature: f64,
    #[serde(rename = "weathercode")]
    pub code: i64,
}

impl Conditions {
    /// Format for the LCD, e.g. `22.0C Rain`
    pub fn summary(&self) -> String {
        truncate(
            &format!("{:.1}C {}", self.temperature, weather_label(self.code)),
            LCD_WIDTH,
        )
    }
}

/// Short label for a WMO weather code. These have to be tiny, since they
/// share a line with the temperature.
/// https://open-meteo.com/en/docs#weathervariables
pub fn weather_label(code: i64) -> &'static str {
    match code {
        0 => "Clear",
        1 => "Mainly clr",
        2 => "Partly cldy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Frz rain",
        71 | 73 | 75 | 77 => "Snow",
        80..=82 => "Shwrs",
        95 | 96 | 99 => "Storm",
        _ => "Weather",
    }
}

/// The one and only cached result, as stored on disk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct CacheEntry {
    /// Unix timestamp, in seconds
    fetched_at: f64,
    summary: String,
}

impl CacheEntry {
    /// Load the cache file. Missing or corrupt is just a miss.
    fn load(path: &Path) -> Option<Self> {
        // Shitty try block
        let helper = || -> anyhow::Result<Self> {
            let contents = fs::read(path)?;
            Ok(serde_json::from_slice(&contents)?)
        };
        match helper() {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Weather cache miss at {}: {err}", path.display());
                None
            }
        }
    }

    fn save(&self, path: &Path) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(self)?;
        fs::write(path, serialized).with_context(|| {
            format!("Error saving weather cache to {}", path.display())
        })
    }

    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        epoch_seconds(now) - self.fetched_at < ttl.as_secs_f64()
    }
}

fn epoch_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

/// Weather from https://open-meteo.com. No API key needed.
#[derive(Debug)]
pub struct OpenMeteo {
    agent: Agent,
    geocode_url: String,
    forecast_url: String,
}

impl OpenMeteo {
    pub fn new(config: &WeatherConfig) -> Self {
        // The agent-wide timeout is just a backstop. Each request gets
        // whatever is left of its fetch's deadline.
        let agent = AgentBuilder::new()
            .timeout(config.timeout())
            .user_agent("piclock")
            .build();
        Self {
            agent,
            geocode_url: config.geocode_url.clone(),
            forecast_url: config.forecast_url.clone(),
        }
    }

    /// Start a GET that has to finish by the deadline
    fn get(&self, url: &str, deadline: Instant) -> anyhow::Result<Request> {
        Ok(self.agent.get(url).timeout(time_left(deadline)?))
    }
}

impl WeatherSource for OpenMeteo {
    fn geocode(
        &self,
        location: &str,
        deadline: Instant,
    ) -> anyhow::Result<Option<Coordinates>> {
        let response: GeocodeResponse = self
            .get(&self.geocode_url, deadline)?
            .query("name", location)
            .query("count", "1")
            .call()
            .with_context(|| {
                format!("Error geocoding from {}", self.geocode_url)
            })?
            .into_json()
            .context("Error parsing geocoding response as JSON")?;
        Ok(response.results.into_iter().next())
    }

    fn current_conditions(
        &self,
        coordinates: Coordinates,
        deadline: Instant,
    ) -> anyhow::Result<Conditions> {
        let response: ForecastResponse = self
            .get(&self.forecast_url, deadline)?
            .query("latitude", &coordinates.latitude.to_string())
            .query("longitude", &coordinates.longitude.to_string())
            .query("current_weather", "true")
            .call()
            .with_context(|| {
                format!("Error fetching forecast from {}", self.forecast_url)
            })?
            .into_json()
            .context("Error parsing forecast as JSON")?;
        Ok(response.current_weather)
    }
}

/// https://open-meteo.com/en/docs/geocoding-api
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    /// Omitted entirely when there are no matches
    #[serde(default)]
    results: Vec<Coordinates>,
}

/// https://open-meteo.com/en/docs
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Conditions,
}
