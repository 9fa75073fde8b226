//! Write-only status display.
//!
//! The controller reports short status strings (`INIT OK`, `NOT INIT`,
//! `RECORDING`, `DONE`) here when debug mode is on.  There is no feedback
//! channel.

/// Sink for short status strings.
pub trait StatusDisplay {
    fn show(&mut self, status: &str);
}

impl<D: StatusDisplay + ?Sized> StatusDisplay for Box<D> {
    fn show(&mut self, status: &str) {
        (**self).show(status)
    }
}

/// Routes status strings to the `log` facade at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show(&mut self, status: &str) {
        log::info!("status: {status}");
    }
}

// ---------------------------------------------------------------------------
// RecordingDisplay  (test-only)
// ---------------------------------------------------------------------------

/// Keeps every status string; clones share the same history.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    shown: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

#[cfg(test)]
impl RecordingDisplay {
    pub fn shown(&self) -> Vec<String> {
        self.shown.borrow().clone()
    }
}

#[cfg(test)]
impl StatusDisplay for RecordingDisplay {
    fn show(&mut self, status: &str) {
        self.shown.borrow_mut().push(status.to_string());
    }
}
