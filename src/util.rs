use log::{debug, log, Level};
use std::cell::RefCell;

/// Remembers the last error from a recurring operation, so a failure that
/// sticks around (dead network, unreadable file) gets logged once instead of
/// on every tick. Repeats of the same error drop to debug.
#[derive(Clone, Debug, Default)]
pub struct ErrorDedup {
    last: RefCell<Option<String>>,
}

impl ErrorDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log an error at `level`, unless it's the same as the last one.
    /// Return whether it was logged at `level`.
    pub fn report(&self, level: Level, err: &anyhow::Error) -> bool {
        let message = format!("{err:#}");
        let mut last = self.last.borrow_mut();
        if last.as_deref() == Some(message.as_str()) {
            debug!("{message} (repeated)");
            false
        } else {
            log!(level, "{err:?}");
            *last = Some(message);
            true
        }
    }

    /// The operation worked, so the next failure is news again
    pub fn clear(&self) {
        self.last.borrow_mut().take();
    }

    pub fn is_failing(&self) -> bool {
        self.last.borrow().is_some()
    }
}
