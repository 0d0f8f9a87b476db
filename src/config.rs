use anyhow::Context;
use log::info;
use serde::Deserialize;
use std::{fs::File, io::ErrorKind, path::PathBuf, time::Duration};

/// Static app configuration. Every field has a default, so the config file
/// only needs to list what differs from a stock install.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// I2C bus that the LCD plate hangs off of
    pub i2c_port: String,
    pub files: FileConfig,
    pub weather: WeatherConfig,
    pub timing: TimingConfig,
}

impl Config {
    const PATH: &'static str = "./config.json";

    /// Load config from the working directory. If the file isn't there, fall
    /// back to defaults. If it's there but broken, that's an error.
    pub fn load() -> anyhow::Result<Self> {
        info!("Loading config from `{}`", Self::PATH);
        let file = match File::open(Self::PATH) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No config file at `{}`, using defaults", Self::PATH);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).context(format!(
                    "Error opening config file {}",
                    Self::PATH
                ))
            }
        };
        serde_json::from_reader(file)
            .context(format!("Error parsing config file {}", Self::PATH))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            i2c_port: "/dev/i2c-1".into(),
            files: FileConfig::default(),
            weather: WeatherConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// Files shared with the settings process. That process writes them, we
/// just read them (except for the weather cache, which is ours).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub message: PathBuf,
    pub location: PathBuf,
    pub backlight: PathBuf,
    pub weather_cache: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            message: "/opt/piclock/msg.txt".into(),
            location: "/opt/piclock/location.txt".into(),
            backlight: "/opt/piclock/backlight.txt".into(),
            weather_cache: "/opt/piclock/weather_cache.json".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub geocode_url: String,
    pub forecast_url: String,
    /// Upper bound on one weather fetch, all of its requests together
    pub timeout_ms: u64,
    /// How long a cached summary stays valid
    pub ttl_secs: u64,
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocode_url: "https://geocoding-api.open-meteo.com/v1/search"
                .into(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".into(),
            timeout_ms: 5000,
            ttl_secs: 3600,
        }
    }
}

/// Cadence of the control loop. Buttons are polled, not interrupt-driven,
/// so these values decide how responsive the device feels.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Gap between two button samples
    pub sample_interval_ms: u64,
    /// Number of samples for the select button per main screen tick
    pub select_samples: u32,
    /// Pause after a menu move, so a held button doesn't skip entries
    pub debounce_ms: u64,
    /// How long the "Set to" confirmation stays up
    pub confirm_dwell_ms: u64,
    /// How long the boot banner stays up
    pub boot_dwell_ms: u64,
}

impl TimingConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn confirm_dwell(&self) -> Duration {
        Duration::from_millis(self.confirm_dwell_ms)
    }

    pub fn boot_dwell(&self) -> Duration {
        Duration::from_millis(self.boot_dwell_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 100,
            select_samples: 10,
            debounce_ms: 200,
            confirm_dwell_ms: 1500,
            boot_dwell_ms: 2000,
        }
    }
}

#[cfg(test)]
impl TimingConfig {
    /// Same sampling shape as the defaults, but nothing ever sleeps
    pub fn immediate() -> Self {
        Self {
            sample_interval_ms: 0,
            debounce_ms: 0,
            confirm_dwell_ms: 0,
            boot_dwell_ms: 0,
            ..Self::default()
        }
    }
}
