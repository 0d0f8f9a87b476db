//! Control loop for a Raspberry Pi clock with a 16x2 RGB character LCD. Shows
//! the time plus a custom message or the weather, and has a button menu to
//! pick the backlight color. A separate settings process talks to us through
//! a few small files on disk.

pub mod color;
pub mod config;
pub mod driver;
pub mod menu;
pub mod render;
pub mod resource;
pub mod util;
pub mod watcher;
pub mod weather;

#[cfg(test)]
mod test_util;
