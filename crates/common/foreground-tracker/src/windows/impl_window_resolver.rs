use super::utils;
use crate::{ForegroundError, ForegroundResult, WindowId, binding::WindowResolver};
use windows_sys::Win32::Foundation::HWND;

/// Window queries through the Win32 user API.
#[derive(Debug, Clone, Default)]
pub struct ImplWindowResolver {}

impl ImplWindowResolver {
    /// # Errors
    ///
    /// Returns [`ForegroundError::NotInteractiveSession`] when the process
    /// runs without a visible desktop (a service session).
    pub fn new() -> ForegroundResult<Self> {
        if !utils::is_interactive_session()? {
            return Err(ForegroundError::NotInteractiveSession);
        }
        Ok(Self {})
    }
}

fn to_hwnd(window: WindowId) -> HWND {
    window.0 as usize as HWND
}

fn to_window_id(hwnd: HWND) -> WindowId {
    WindowId(hwnd as usize as u64)
}

impl WindowResolver for ImplWindowResolver {
    fn foreground_window(&self) -> Option<WindowId> {
        utils::get_foreground_window().map(to_window_id)
    }

    fn owning_process_id(&self, window: WindowId) -> ForegroundResult<u32> {
        utils::get_window_process_id(to_hwnd(window))
    }

    fn window_title(&self, window: WindowId) -> String {
        utils::get_window_title(to_hwnd(window))
    }

    fn main_window_of(&self, pid: u32) -> Option<WindowId> {
        utils::find_main_window(pid).map(to_window_id)
    }
}
