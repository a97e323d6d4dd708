//! Seams between the tracker and the operating system.
//!
//! The tracker never calls platform APIs directly. It talks to a
//! [`WindowResolver`] for window lookups and to a [`ProcessTable`] for
//! process lookups, both of which are expected to be thin and to fail fast.

use crate::{ForegroundResult, WindowId};
use std::fmt;
use std::time::SystemTime;

/// Window lookups.
pub trait WindowResolver: Send + Sync + 'static {
    /// The window currently in the foreground, if any.
    fn foreground_window(&self) -> Option<WindowId>;

    /// The pid of the process that owns `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner cannot be determined.
    fn owning_process_id(&self, window: WindowId) -> ForegroundResult<u32>;

    /// Title of `window`; empty on failure.
    fn window_title(&self, window: WindowId) -> String;

    /// The main top-level window of `pid`, if it has one.
    fn main_window_of(&self, pid: u32) -> Option<WindowId>;
}

/// Process lookups.
pub trait ProcessTable: Send + Sync + 'static {
    /// Opens a handle to a live process.
    ///
    /// # Errors
    ///
    /// Returns an error if the process does not exist or cannot be opened.
    fn open_process(&self, pid: u32) -> ForegroundResult<Box<dyn ProcessHandle>>;

    /// Whether `pid` is the process running this code.
    fn is_current_process(&self, pid: u32) -> bool;

    /// Full command line of `pid`; empty on failure or when unsupported.
    fn command_line_of(&self, pid: u32) -> String;
}

/// A live process, exclusively owned by one snapshot.
pub trait ProcessHandle: Send + fmt::Debug {
    fn pid(&self) -> u32;

    /// # Errors
    ///
    /// Returns an error if the name cannot be read.
    fn name(&self) -> ForegroundResult<String>;

    /// Product version of the executable.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    fn version(&self) -> ForegroundResult<String>;

    /// # Errors
    ///
    /// Returns an error if the start time cannot be read.
    fn start_time(&self) -> ForegroundResult<SystemTime>;

    /// # Errors
    ///
    /// Returns an error if the exit status cannot be queried.
    fn has_exited(&self) -> ForegroundResult<bool>;

    /// Requests termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be signalled.
    fn kill(&mut self) -> ForegroundResult<()>;
}
