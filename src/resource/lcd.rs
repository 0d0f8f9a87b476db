use crate::{
    color::{Catalog, Color, ColorEntry},
    config::TimingConfig,
    driver::{Button, LcdDriver},
    menu::{MenuAction, MenuState},
    render::{compute_frame, Renderer},
    resource::Resource,
    watcher::ConfigWatcher,
    weather::{WeatherCache, WeatherSource},
};
use anyhow::anyhow;
use chrono::{Local, NaiveDateTime};
use log::{debug, info};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

const BANNER: (&str, &str) = ("  PiClock v2.0", "= Wife Edition =");
const SHUTDOWN_MESSAGE: &str = "Shutting down LCD";
const MENU_TITLE: &str = "Backlight:";
const CONFIRM_TITLE: &str = "Set to:";
/// Buttons that do something in the menu, in the order they're checked. If
/// two are held at once, the first one wins.
const MENU_BUTTONS: [Button; 4] =
    [Button::Up, Button::Down, Button::Right, Button::Left];

/// LCD resource. This is the control loop for the whole device: it owns the
/// driver and all on-device state, and ties together the menu, renderer,
/// settings files, and weather.
pub struct Lcd<D, S> {
    driver: D,
    catalog: Catalog,
    menu: MenuState,
    renderer: Renderer,
    watcher: ConfigWatcher,
    weather: WeatherCache<S>,
    timing: TimingConfig,
    /// Last backlight color applied from the settings file. Menu picks don't
    /// touch this, so the file only takes over again once it changes.
    file_color: Option<String>,
}

impl<D: LcdDriver, S: WeatherSource> Lcd<D, S> {
    pub fn new(
        driver: D,
        catalog: Catalog,
        watcher: ConfigWatcher,
        weather: WeatherCache<S>,
        timing: TimingConfig,
    ) -> Self {
        let menu = MenuState::new(catalog.len());
        Self {
            driver,
            catalog,
            menu,
            renderer: Renderer::new(),
            watcher,
            weather,
            timing,
            file_color: None,
        }
    }

    /// Main screen tick: draw the clock, pick up backlight changes, then
    /// watch the select button for a bit
    fn run_main(&mut self, shutdown: &AtomicBool) -> anyhow::Result<()> {
        self.draw_main(Local::now().naive_local())?;
        self.check_backlight()?;
        if self.wait_for_select(shutdown)? {
            self.menu.handle(Button::Select);
        }
        Ok(())
    }

    /// Draw the clock screen, if anything changed since last time
    fn draw_main(&mut self, now: NaiveDateTime) -> anyhow::Result<()> {
        let message = self.watcher.read_custom_message();
        // Weather is hidden behind a custom message, so don't fetch it
        let weather = if message.is_none() {
            let location = self.watcher.read_location();
            self.weather.get_weather(location.as_deref())
        } else {
            None
        };
        let frame =
            compute_frame(now, message.as_deref(), weather.as_deref());
        self.renderer.render(&mut self.driver, frame)?;
        Ok(())
    }

    /// Apply the backlight from the settings file, if it changed
    fn check_backlight(&mut self) -> anyhow::Result<()> {
        let Some(entry) =
            self.watcher.read_backlight_selection(&self.catalog)
        else {
            return Ok(());
        };
        if self.file_color.as_deref() != Some(entry.name.as_str()) {
            info!("Backlight changed to {}", entry.name);
            self.driver.set_backlight(entry.rgb)?;
            self.file_color = Some(entry.name.clone());
        }
        Ok(())
    }

    /// Sample the select button for one window. Return true as soon as it's
    /// pressed.
    fn wait_for_select(
        &mut self,
        shutdown: &AtomicBool,
    ) -> anyhow::Result<bool> {
        for _ in 0..self.timing.select_samples {
            if shutdown.load(Ordering::Relaxed) {
                return Ok(false);
            }
            if self.driver.is_pressed(Button::Select)? {
                return Ok(true);
            }
            thread::sleep(self.timing.sample_interval());
        }
        Ok(false)
    }

    /// Stay in the menu until a color is picked or the user backs out
    fn run_menu(&mut self, shutdown: &AtomicBool) -> anyhow::Result<()> {
        // The menu draws over the clock, so the next clock frame has to be
        // drawn from scratch
        self.renderer.invalidate();
        self.draw_menu()?;

        while self.menu.is_active() {
            if shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            if let Some(button) = self.poll_menu_buttons()? {
                match self.menu.handle(button) {
                    MenuAction::Moved => {
                        self.draw_menu()?;
                        thread::sleep(self.timing.debounce());
                    }
                    MenuAction::Committed(index) => self.apply_color(index)?,
                    MenuAction::Cancelled => self.driver.clear()?,
                    MenuAction::Entered | MenuAction::Ignored => {}
                }
            }
            thread::sleep(self.timing.sample_interval());
        }
        Ok(())
    }

    fn poll_menu_buttons(&mut self) -> anyhow::Result<Option<Button>> {
        for button in MENU_BUTTONS {
            if self.driver.is_pressed(button)? {
                return Ok(Some(button));
            }
        }
        Ok(None)
    }

    fn draw_menu(&mut self) -> anyhow::Result<()> {
        let name = &self.color_at(self.menu.index())?.name;
        let line2 = format!("> {name}");
        self.driver.clear()?;
        self.driver.write(MENU_TITLE, &line2)
    }

    /// Switch the backlight to a menu pick and show a confirmation
    fn apply_color(&mut self, index: usize) -> anyhow::Result<()> {
        let entry = self.color_at(index)?.clone();
        info!("Backlight set from menu to {}", entry.name);
        self.driver.set_backlight(entry.rgb)?;
        self.driver.clear()?;
        self.driver.write(CONFIRM_TITLE, &entry.name)?;
        thread::sleep(self.timing.confirm_dwell());
        Ok(())
    }

    fn color_at(&self, index: usize) -> anyhow::Result<&ColorEntry> {
        self.catalog
            .get_index(index)
            .ok_or_else(|| anyhow!("No color at menu index {index}"))
    }
}

impl<D: LcdDriver, S: WeatherSource> Resource for Lcd<D, S> {
    fn name(&self) -> &str {
        "LCD"
    }

    fn on_start(&mut self) -> anyhow::Result<()> {
        // Restore the last color from the settings file before anything is
        // drawn, so the screen doesn't flash white first
        let restored = self.watcher.read_backlight_selection(&self.catalog);
        let color = restored.map_or(Color::WHITE, |entry| entry.rgb);
        if let Some(entry) = restored {
            info!("Restoring backlight {}", entry.name);
            self.file_color = Some(entry.name.clone());
        }
        self.driver.set_backlight(color)?;
        self.driver.clear()?;

        self.driver.write(BANNER.0, BANNER.1)?;
        thread::sleep(self.timing.boot_dwell());
        self.driver.clear()
    }

    fn on_tick(&mut self, shutdown: &AtomicBool) -> anyhow::Result<()> {
        if self.menu.is_active() {
            debug!("Entering menu");
            self.run_menu(shutdown)
        } else {
            self.run_main(shutdown)
        }
    }

    fn on_stop(&mut self) -> anyhow::Result<()> {
        self.driver.clear()?;
        self.driver.set_backlight(Color::OFF)?;
        self.driver.write(SHUTDOWN_MESSAGE, "")
    }
}

/// Blanket Drop impls aren't possible so we need this on the implementor :(
impl<D, S> Drop for Lcd<D, S> {
    fn drop(&mut self) {
        info!("Closing resource LCD");
    }
}
