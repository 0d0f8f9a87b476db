//! A "resource" is a piece of hardware. Each resource has a submodule, which
//! implements all logic related to that resource.

pub mod lcd;

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};

/// A hardware resource (e.g. LCD). This captures the lifecycle shared by all
/// resources: set up once, tick until told to stop, then clean up.
///
/// Ticks are driven from a single thread. A tick may take as long as it
/// wants, but should check the shutdown flag whenever it waits.
pub trait Resource: Sized {
    /// Get a descriptive name for this resource, for logging
    fn name(&self) -> &str;

    /// Update resource, once on startup
    fn on_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Do one iteration of work. Return early if `shutdown` gets set.
    fn on_tick(&mut self, shutdown: &AtomicBool) -> anyhow::Result<()>;

    /// Leave the hardware in a sane state, once on shutdown
    fn on_stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Run the resource until the shutdown flag is set. Only errors from the
    /// hardware itself make it out of here.
    fn run(mut self, shutdown: &AtomicBool) -> anyhow::Result<()> {
        info!("Starting resource {}", self.name());
        self.on_start()?;
        while !shutdown.load(Ordering::Relaxed) {
            self.on_tick(shutdown)?;
        }
        info!("Stopping resource {}", self.name());
        self.on_stop()
    }
}
