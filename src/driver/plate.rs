//! Driver for the RGB 16x2 character LCD plate. The plate is an HD44780
//! controller wired to an MCP23017 I2C port expander, with the buttons and
//! the RGB backlight on spare expander pins.

use crate::{
    color::Color,
    driver::{Button, LcdDriver, LCD_WIDTH},
};
use anyhow::{anyhow, Context};
use embedded_hal::{delay::DelayNs, i2c::I2c};
use log::{info, trace};
use std::fmt::Debug;

/// I2C address of the MCP23017
const ADDRESS: u8 = 0x20;

// Port A: buttons on 0-4 (active low), red/green backlight (active low)
const RED: u8 = 1 << 6;
const GREEN: u8 = 1 << 7;
const BUTTONS: u8 = 0b0001_1111;

// Port B: blue backlight (active low), then the LCD's 4-bit bus
const BLUE: u8 = 1 << 0;
const D7: u8 = 1 << 1;
const D6: u8 = 1 << 2;
const D5: u8 = 1 << 3;
const D4: u8 = 1 << 4;
const EN: u8 = 1 << 5;
const RW: u8 = 1 << 6;
const RS: u8 = 1 << 7;
const LCD_MASK: u8 = D4 | D5 | D6 | D7 | EN | RW | RS;

/// DDRAM address of the start of each line
const LINE_OFFSETS: [u8; 2] = [0x00, 0x40];

/// MCP23017 registers, in the default (BANK=0) layout
#[derive(Copy, Clone, Debug)]
enum Register {
    IoDirA = 0x00,
    IoDirB = 0x01,
    PullUpA = 0x0C,
    GpioA = 0x12,
    OutputLatchA = 0x14,
    OutputLatchB = 0x15,
}

/// HD44780 instructions that we use. There are more, copy them in as needed.
#[derive(Copy, Clone, Debug)]
enum LcdCommand {
    Clear,
    /// Display on, cursor and blink off
    DisplayOn,
    /// 4-bit bus, 2 lines, 5x8 font
    FunctionSet,
    /// Cursor moves left to right, no display shift
    EntryMode,
    /// Move the cursor to a DDRAM address
    SetAddress(u8),
}

impl LcdCommand {
    fn byte(self) -> u8 {
        match self {
            Self::Clear => 0x01,
            Self::DisplayOn => 0x08 | 0x04,
            Self::FunctionSet => 0x20 | 0x08,
            Self::EntryMode => 0x04 | 0x02,
            Self::SetAddress(address) => 0x80 | address,
        }
    }
}

/// LCD plate driver. Generic over the bus so it can be tested without
/// hardware. We shadow both output latches so we never have to
/// read-modify-write over the bus.
pub struct CharLcdPlate<I2C, D> {
    i2c: I2C,
    delay: D,
    port_a: u8,
    port_b: u8,
}

#[cfg(target_arch = "arm")]
impl CharLcdPlate<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay> {
    /// Open the plate on a Linux I2C bus, e.g. `/dev/i2c-1`
    pub fn open(port: &str) -> anyhow::Result<Self> {
        let i2c = linux_embedded_hal::I2cdev::new(port)
            .with_context(|| format!("Error opening I2C bus {port}"))?;
        Self::new(i2c, linux_embedded_hal::Delay)
    }
}

impl<I2C: I2c, D: DelayNs> CharLcdPlate<I2C, D> {
    /// Configure the expander and run the HD44780 4-bit init sequence. The
    /// backlight starts off.
    pub fn new(i2c: I2C, delay: D) -> anyhow::Result<Self> {
        let mut plate = Self {
            i2c,
            delay,
            port_a: RED | GREEN,
            port_b: BLUE,
        };

        // Everything on port A except the backlight pins is an input
        plate.write_register(Register::IoDirA, !(RED | GREEN))?;
        plate.write_register(Register::PullUpA, BUTTONS)?;
        plate.write_register(Register::IoDirB, 0x00)?;
        plate.write_register(Register::OutputLatchA, plate.port_a)?;
        plate.write_register(Register::OutputLatchB, plate.port_b)?;

        // Magic sequence to get the controller into 4-bit mode, no matter
        // what mode it was left in
        plate.send(0x33, false)?;
        plate.send(0x32, false)?;
        plate.command(LcdCommand::DisplayOn)?;
        plate.command(LcdCommand::FunctionSet)?;
        plate.command(LcdCommand::EntryMode)?;
        plate.command(LcdCommand::Clear)?;
        info!("LCD plate initialized");
        Ok(plate)
    }

    fn write_register(
        &mut self,
        register: Register,
        value: u8,
    ) -> anyhow::Result<()> {
        self.i2c
            .write(ADDRESS, &[register as u8, value])
            .map_err(map_error)
            .with_context(|| {
                format!("Error writing {value:#04x} to {register:?}")
            })
    }

    fn read_register(&mut self, register: Register) -> anyhow::Result<u8> {
        let mut buffer = [0];
        self.i2c
            .write_read(ADDRESS, &[register as u8], &mut buffer)
            .map_err(map_error)
            .with_context(|| format!("Error reading {register:?}"))?;
        Ok(buffer[0])
    }

    fn command(&mut self, command: LcdCommand) -> anyhow::Result<()> {
        trace!("Sending LCD command: {command:x?}");
        self.send(command.byte(), false)?;
        if matches!(command, LcdCommand::Clear) {
            // Clearing is slow on the controller side
            self.delay.delay_us(3000);
        }
        Ok(())
    }

    /// Send one byte as two nibbles, high first. `data` selects the data
    /// register (text) instead of the instruction register.
    fn send(&mut self, byte: u8, data: bool) -> anyhow::Result<()> {
        self.delay.delay_us(1000);
        let rs = if data { RS } else { 0 };
        for nibble in [byte >> 4, byte & 0x0F] {
            self.port_b = (self.port_b & !LCD_MASK) | nibble_bits(nibble) | rs;
            self.write_register(Register::OutputLatchB, self.port_b)?;
            self.pulse_enable()?;
        }
        Ok(())
    }

    /// Latch whatever is on the bus into the controller
    fn pulse_enable(&mut self) -> anyhow::Result<()> {
        self.delay.delay_us(1);
        self.write_register(Register::OutputLatchB, self.port_b | EN)?;
        self.delay.delay_us(1);
        self.write_register(Register::OutputLatchB, self.port_b)?;
        self.delay.delay_us(1);
        Ok(())
    }

    fn write_line(&mut self, line: usize, text: &str) -> anyhow::Result<()> {
        self.command(LcdCommand::SetAddress(LINE_OFFSETS[line]))?;
        // The controller's character ROM is roughly ASCII. Anything else
        // would show up as garbage.
        for c in text.chars().take(LCD_WIDTH) {
            let byte = if c.is_ascii() && !c.is_ascii_control() {
                c as u8
            } else {
                b'?'
            };
            self.send(byte, true)?;
        }
        Ok(())
    }
}

impl<I2C: I2c, D: DelayNs> LcdDriver for CharLcdPlate<I2C, D> {
    fn clear(&mut self) -> anyhow::Result<()> {
        self.command(LcdCommand::Clear)
    }

    fn write(&mut self, line1: &str, line2: &str) -> anyhow::Result<()> {
        trace!("Writing text {line1:?} / {line2:?}");
        self.write_line(0, line1)?;
        self.write_line(1, line2)
    }

    fn set_backlight(&mut self, color: Color) -> anyhow::Result<()> {
        // No PWM on these pins, so any intensity counts as on. Pins are
        // active low.
        let off = |channel: f32, bit: u8| if channel > 0.0 { 0 } else { bit };
        self.port_a = (self.port_a & !(RED | GREEN))
            | off(color.red, RED)
            | off(color.green, GREEN);
        self.port_b = (self.port_b & !BLUE) | off(color.blue, BLUE);
        self.write_register(Register::OutputLatchA, self.port_a)?;
        self.write_register(Register::OutputLatchB, self.port_b)
    }

    fn is_pressed(&mut self, button: Button) -> anyhow::Result<bool> {
        let pins = self.read_register(Register::GpioA)?;
        // Pulled up, so pressed reads low
        Ok(pins & button_bit(button) == 0)
    }
}

/// Map the 4 data bits onto their (scrambled) expander pins
fn nibble_bits(nibble: u8) -> u8 {
    [D4, D5, D6, D7]
        .iter()
        .enumerate()
        .filter(|(i, _)| nibble & (1 << i) != 0)
        .fold(0, |bits, (_, pin)| bits | pin)
}

fn button_bit(button: Button) -> u8 {
    match button {
        Button::Select => 1 << 0,
        Button::Right => 1 << 1,
        Button::Down => 1 << 2,
        Button::Up => 1 << 3,
        Button::Left => 1 << 4,
    }
}

/// Bus errors only implement Debug, so we have to map manually
fn map_error(error: impl Debug) -> anyhow::Error {
    anyhow!("{error:?}")
}
