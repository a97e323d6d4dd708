use serde::{Deserialize, Serialize};
use std::fmt;

/// Point-in-time identity of the process owning a window.
///
/// A snapshot with `pid == 0` is the Empty snapshot: every string is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    /// Process ID, `0` when there is no process.
    pub pid: u32,
    /// Title of the process's main window.
    pub title: String,
    /// Executable name, empty when it could not be read.
    pub name: String,
    /// Product version of the executable, empty when unknown.
    pub version: String,
    /// Process start time, already rendered for display.
    pub start_time: String,
    /// Full command line. Filled in asynchronously after capture.
    pub command_line: String,
}

impl ProcessSnapshot {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pid == 0
    }

    /// Clears every field back to the Empty snapshot.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// `(label, value)` pairs in display order.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, String); 6] {
        [
            ("PID", self.pid.to_string()),
            ("Title", self.title.clone()),
            ("Name", self.name.clone()),
            ("Version", self.version.clone()),
            ("StartTime", self.start_time.clone()),
            ("Argument", self.command_line.clone()),
        ]
    }
}

impl fmt::Display for ProcessSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} - {}",
            self.pid, self.name, self.title, self.command_line
        )
    }
}
