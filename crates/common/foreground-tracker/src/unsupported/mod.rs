//! Fallback for platforms without a native backend. Construction fails with
//! [`ForegroundError::Unsupported`]; trackers built with custom collaborators
//! still work.

use crate::{
    ForegroundError, ForegroundResult, TrackerConfig, WindowId,
    binding::WindowResolver,
    source::{EventSink, EventSource},
};

pub mod utils {
    use crate::{ForegroundError, ForegroundResult};
    use std::path::Path;

    pub fn system_prefers_dark() -> ForegroundResult<bool> {
        Err(ForegroundError::Unsupported)
    }

    pub(crate) fn product_version(_exe: &Path) -> ForegroundResult<String> {
        Ok(String::new())
    }
}

#[derive(Debug)]
pub struct NativeWindowResolver {}

impl NativeWindowResolver {
    /// # Errors
    ///
    /// Always [`ForegroundError::Unsupported`].
    pub fn new() -> ForegroundResult<Self> {
        Err(ForegroundError::Unsupported)
    }
}

impl WindowResolver for NativeWindowResolver {
    fn foreground_window(&self) -> Option<WindowId> {
        None
    }

    fn owning_process_id(&self, _window: WindowId) -> ForegroundResult<u32> {
        Err(ForegroundError::Unsupported)
    }

    fn window_title(&self, _window: WindowId) -> String {
        String::new()
    }

    fn main_window_of(&self, _pid: u32) -> Option<WindowId> {
        None
    }
}

#[derive(Debug)]
pub struct NativeEventSource {}

impl NativeEventSource {
    #[must_use]
    pub fn new(_config: &TrackerConfig) -> Self {
        Self {}
    }
}

impl EventSource for NativeEventSource {
    fn start(&mut self, _sink: EventSink) -> ForegroundResult<()> {
        Err(ForegroundError::Unsupported)
    }

    fn stop(&mut self) {}
}
