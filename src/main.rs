use anyhow::Context;
use log::{info, LevelFilter};
use piclock::{
    color::Catalog,
    config::Config,
    resource::{lcd::Lcd, Resource},
    watcher::ConfigWatcher,
    weather::{OpenMeteo, WeatherCache},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("piclock", LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::load()?;

    // Ctrl-c (or SIGTERM from systemd) flips this, and the LCD loop notices
    // on its next button sample
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            shutdown.store(true, Ordering::Relaxed);
        })
        .context("Error setting signal handler")?;
    }

    let weather = WeatherCache::new(
        OpenMeteo::new(&config.weather),
        config.files.weather_cache.clone(),
        config.weather.ttl(),
        config.weather.timeout(),
    );
    let lcd = Lcd::new(
        driver::open(&config)?,
        Catalog::builtin()?,
        ConfigWatcher::new(&config.files),
        weather,
        config.timing.clone(),
    );
    lcd.run(&shutdown)
}

#[cfg(target_arch = "arm")]
mod driver {
    use piclock::{config::Config, driver::plate::CharLcdPlate};

    pub fn open(
        config: &Config,
    ) -> anyhow::Result<
        CharLcdPlate<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay>,
    > {
        CharLcdPlate::open(&config.i2c_port)
    }
}

/// No I2C bus off the Pi, so print frames to the log instead
#[cfg(not(target_arch = "arm"))]
mod driver {
    use log::warn;
    use piclock::{config::Config, driver::mock::MockDriver};

    pub fn open(_: &Config) -> anyhow::Result<MockDriver> {
        warn!("Not running on a Pi, using mock LCD");
        Ok(MockDriver::new())
    }
}
