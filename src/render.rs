use crate::driver::{LcdDriver, LCD_WIDTH};
use chrono::NaiveDateTime;
use log::trace;

/// Shown on line 2 when there's no message and no weather
pub const NO_WEATHER: &str = "No weather data";

/// Both lines of text on the screen
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DisplayFrame {
    pub line1: String,
    pub line2: String,
}

impl DisplayFrame {
    /// Build a frame, cutting each line down to the LCD width
    pub fn new(line1: &str, line2: &str) -> Self {
        Self {
            line1: truncate(line1, LCD_WIDTH),
            line2: truncate(line2, LCD_WIDTH),
        }
    }
}

/// Calculate the main (clock) screen. The bottom line falls through from
/// custom message, to weather, to a placeholder.
pub fn compute_frame(
    now: NaiveDateTime,
    custom_message: Option<&str>,
    weather: Option<&str>,
) -> DisplayFrame {
    // https://docs.rs/chrono/latest/chrono/format/strftime/index.html
    let clock = now.format("%I:%M %p %b %d").to_string();
    let status = custom_message
        .filter(|message| !message.is_empty())
        .or(weather)
        .unwrap_or(NO_WEATHER);
    DisplayFrame::new(&clock, status)
}

/// Pushes frames to the driver, skipping any that are already on screen.
/// Redrawing a character LCD flickers, so we only do it on change.
#[derive(Debug, Default)]
pub struct Renderer {
    /// What's currently on the screen, as far as we know. `None` when
    /// something else has drawn over it.
    last_frame: Option<DisplayFrame>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the frame if it differs from what's on screen. Return whether or
    /// not anything was drawn.
    pub fn render(
        &mut self,
        driver: &mut impl LcdDriver,
        frame: DisplayFrame,
    ) -> anyhow::Result<bool> {
        if self.last_frame.as_ref() == Some(&frame) {
            return Ok(false);
        }

        trace!("Frame changed: old={:?}; new={frame:?}", self.last_frame);
        driver.clear()?;
        driver.write(&frame.line1, &frame.line2)?;
        self.last_frame = Some(frame);
        Ok(true)
    }

    /// Forget the last frame, so the next render always draws. Call this
    /// whenever anything else writes to the screen.
    pub fn invalidate(&mut self) {
        self.last_frame = None;
    }
}

/// Cut a string down to at most `width` characters
pub fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}
