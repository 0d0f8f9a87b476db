//! The driver is the thin layer between the control loop and the physical
//! LCD. Each implementation maps these few operations onto its hardware.

pub mod mock;
pub mod plate;

use crate::color::Color;

/// Width of the LCD, in characters
pub const LCD_WIDTH: usize = 16;

/// The five buttons on the plate
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Button {
    Select,
    Right,
    Down,
    Up,
    Left,
}

/// Everything the control loop needs from a two-line character display.
/// Errors here are hardware failures and are treated as fatal.
pub trait LcdDriver {
    /// Blank the screen
    fn clear(&mut self) -> anyhow::Result<()>;

    /// Write both lines of text, starting in the top-left
    fn write(&mut self, line1: &str, line2: &str) -> anyhow::Result<()>;

    fn set_backlight(&mut self, color: Color) -> anyhow::Result<()>;

    /// Is the button held down *right now*? No edge detection or debouncing
    /// is done here.
    fn is_pressed(&mut self, button: Button) -> anyhow::Result<bool>;
}
