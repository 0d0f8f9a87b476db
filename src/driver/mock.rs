use crate::{
    color::Color,
    driver::{Button, LcdDriver},
};
use log::info;
use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Cap on recorded calls, so a long-running dev session doesn't grow forever
const MAX_CALLS: usize = 1000;

/// Mock driver, to allow running on non-Pi machines and in tests. Records
/// every output call and replays scripted button presses.
///
/// Clones share state, so a test can hand the driver off to the control loop
/// and still look at what happened after the loop is gone.
#[derive(Clone, Debug, Default)]
pub struct MockDriver {
    state: Rc<RefCell<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    presses: VecDeque<Button>,
    /// Set once every scripted press has been used up
    stop_when_idle: Option<Arc<AtomicBool>>,
}

/// One recorded output operation
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Clear,
    Write(String, String),
    SetBacklight(Color),
}

/// Both lines of one recorded write. Compares equal to a `(&str, &str)`
/// pair, to keep assertions short.
#[derive(Clone, Debug, PartialEq)]
pub struct Lines(pub String, pub String);

impl PartialEq<(&str, &str)> for Lines {
    fn eq(&self, (line1, line2): &(&str, &str)) -> bool {
        self.0 == *line1 && self.1 == *line2
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue up a button press. Presses are consumed in order: a press is
    /// reported (once) when its button is the next one polled for.
    pub fn press(&self, button: Button) {
        self.state.borrow_mut().presses.push_back(button);
    }

    /// Raise `shutdown` the first time a button is polled with no scripted
    /// presses left, as if someone hit ctrl-c right after the script ended
    pub fn stop_when_idle(&self, shutdown: Arc<AtomicBool>) {
        self.state.borrow_mut().stop_when_idle = Some(shutdown);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Forget everything recorded so far
    pub fn reset_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    fn record(&self, call: Call) {
        let mut state = self.state.borrow_mut();
        if state.calls.len() >= MAX_CALLS {
            state.calls.remove(0);
        }
        state.calls.push(call);
    }

    /// All backlight colors that have been set, oldest first
    pub fn backlights(&self) -> Vec<Color> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::SetBacklight(color) => Some(*color),
                _ => None,
            })
            .collect()
    }

    /// All text writes, oldest first
    pub fn writes(&self) -> Vec<Lines> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Write(line1, line2) => {
                    Some(Lines(line1.clone(), line2.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

impl LcdDriver for MockDriver {
    fn clear(&mut self) -> anyhow::Result<()> {
        self.record(Call::Clear);
        Ok(())
    }

    fn write(&mut self, line1: &str, line2: &str) -> anyhow::Result<()> {
        info!("LCD: [{line1:<16}] [{line2:<16}]");
        self.record(Call::Write(line1.into(), line2.into()));
        Ok(())
    }

    fn set_backlight(&mut self, color: Color) -> anyhow::Result<()> {
        info!("LCD backlight: {color}");
        self.record(Call::SetBacklight(color));
        Ok(())
    }

    fn is_pressed(&mut self, button: Button) -> anyhow::Result<bool> {
        let mut state = self.state.borrow_mut();
        if state.presses.front() == Some(&button) {
            state.presses.pop_front();
            return Ok(true);
        }
        if state.presses.is_empty() {
            if let Some(shutdown) = &state.stop_when_idle {
                shutdown.store(true, Ordering::Relaxed);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_presses() {
        let mut driver = MockDriver::new();
        driver.press(Button::Down);
        driver.press(Button::Right);

        // Right is queued behind Down, so it isn't visible yet
        assert!(!driver.is_pressed(Button::Right).unwrap());
        assert!(driver.is_pressed(Button::Down).unwrap());
        assert!(!driver.is_pressed(Button::Down).unwrap());
        assert!(driver.is_pressed(Button::Right).unwrap());
        assert!(!driver.is_pressed(Button::Right).unwrap());
    }

    #[test]
    fn test_records_calls() {
        let mut driver = MockDriver::new();
        driver.clear().unwrap();
        driver.write("a", "b").unwrap();
        driver.set_backlight(Color::WHITE).unwrap();
        assert_eq!(
            driver.calls(),
            &[
                Call::Clear,
                Call::Write("a".into(), "b".into()),
                Call::SetBacklight(Color::WHITE)
            ]
        );
        assert_eq!(driver.writes(), vec![("a", "b")]);
        assert_eq!(driver.backlights(), vec![Color::WHITE]);
    }

    #[test]
    fn test_clones_share_state() {
        let handle = MockDriver::new();
        let mut driver = handle.clone();
        handle.press(Button::Select);
        assert!(driver.is_pressed(Button::Select).unwrap());
        driver.write("a", "b").unwrap();
        drop(driver);
        assert_eq!(handle.writes(), vec![("a", "b")]);
    }

    #[test]
    fn test_stop_when_idle() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut driver = MockDriver::new();
        driver.stop_when_idle(Arc::clone(&shutdown));
        driver.press(Button::Down);

        // Still a press queued, even if it's not for this button
        assert!(!driver.is_pressed(Button::Up).unwrap());
        assert!(!shutdown.load(Ordering::Relaxed));
        assert!(driver.is_pressed(Button::Down).unwrap());
        assert!(!shutdown.load(Ordering::Relaxed));

        assert!(!driver.is_pressed(Button::Select).unwrap());
        assert!(shutdown.load(Ordering::Relaxed));
    }
}
