use crate::weather::{time_left, Conditions, Coordinates, WeatherSource};
use anyhow::{bail, Context};
use std::{
    cell::{Cell, RefCell},
    fs,
    path::PathBuf,
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

/// Get a fresh, empty directory for a single test. Names need to be unique
/// across the test suite, since tests run in parallel.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("piclock-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Canned weather source. Clones share state, so a test can keep a handle
/// after giving one away.
#[derive(Clone, Debug)]
pub struct FakeSource {
    /// (temperature, code). `None` means the location doesn't geocode
    conditions: Rc<Cell<Option<(f64, i64)>>>,
    calls: Rc<Cell<usize>>,
    /// Deadline handed to each lookup, in order
    deadlines: Rc<RefCell<Vec<Instant>>>,
    /// How long each lookup takes, like a slow network
    delay: Duration,
    failing: bool,
}

impl FakeSource {
    pub fn new(conditions: Option<(f64, i64)>) -> Self {
        Self {
            conditions: Rc::new(Cell::new(conditions)),
            calls: Rc::default(),
            deadlines: Rc::default(),
            delay: Duration::ZERO,
            failing: false,
        }
    }

    /// A source that acts like the network is down
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(None)
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    pub fn set_conditions(&self, conditions: Option<(f64, i64)>) {
        self.conditions.set(conditions);
    }

    /// Number of lookups that have gone out
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn deadlines(&self) -> Vec<Instant> {
        self.deadlines.borrow().clone()
    }

    /// Take as long as the network would, but no longer than the deadline
    /// allows, the same way a request timeout cuts off a real request
    fn wait(&self, deadline: Instant) -> anyhow::Result<()> {
        self.deadlines.borrow_mut().push(deadline);
        if self.delay.is_zero() {
            return Ok(());
        }
        let remaining = time_left(deadline)?;
        thread::sleep(self.delay.min(remaining));
        if self.delay > remaining {
            bail!("Request timed out");
        }
        Ok(())
    }
}

impl WeatherSource for FakeSource {
    fn geocode(
        &self,
        _: &str,
        deadline: Instant,
    ) -> anyhow::Result<Option<Coordinates>> {
        self.calls.set(self.calls.get() + 1);
        if self.failing {
            bail!("Network is unreachable");
        }
        self.wait(deadline)?;
        Ok(self.conditions.get().map(|_| Coordinates {
            latitude: 42.36,
            longitude: -71.06,
        }))
    }

    fn current_conditions(
        &self,
        _: Coordinates,
        deadline: Instant,
    ) -> anyhow::Result<Conditions> {
        self.wait(deadline)?;
        let (temperature, code) =
            self.conditions.get().context("No conditions")?;
        Ok(Conditions { temperature, code })
    }
}
