pub use foreground_tracker_core::*;

mod binding;
mod dispatch;
mod process_info;
mod process_table;
mod resolver;
mod source;
mod tracker;

pub use binding::{ProcessHandle, ProcessTable, WindowResolver};
pub use dispatch::{Listener, ListenerId};
pub use process_info::{ProcessInfo, SharedProcessInfo};
pub use process_table::{SysinfoProcess, SysinfoProcessTable};
pub use source::{EventSink, EventSource};
pub use tracker::{ForegroundTracker, TrackerHandle};

#[cfg(target_os = "linux")]
#[path = "linux/mod.rs"]
mod platform;

#[cfg(target_os = "windows")]
#[path = "windows/mod.rs"]
mod platform;

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
#[path = "unsupported/mod.rs"]
mod platform;

// For platform specific util API's
pub use platform::utils;
pub use platform::{NativeEventSource, NativeWindowResolver};

/// Starts a tracker with the default config on the native platform and
/// subscribes to its changes. The receiver starts with the bootstrap
/// snapshot when one was resolved.
///
/// The tracker is returned alongside the receiver; dropping it stops
/// tracking.
///
/// # Errors
///
/// Returns an error if the platform is unsupported or no tokio runtime is
/// running.
pub async fn subscribe_foreground_changes() -> ForegroundResult<(
    ForegroundTracker,
    tokio::sync::mpsc::UnboundedReceiver<SharedProcessInfo>,
)> {
    let mut tracker = ForegroundTracker::new(TrackerConfig::default())?;
    let handle = tracker.start()?;
    let receiver = handle.subscribe_with_current().await?;
    Ok((tracker, receiver))
}
