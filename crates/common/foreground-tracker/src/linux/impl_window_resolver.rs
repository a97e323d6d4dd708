use super::x11::X11Session;
use crate::{ForegroundError, ForegroundResult, WindowId, binding::WindowResolver};
use tracing::debug;

/// Window queries against the X server through EWMH properties.
pub struct ImplWindowResolver {
    session: X11Session,
}

impl ImplWindowResolver {
    /// # Errors
    ///
    /// Returns [`ForegroundError::NoDisplay`] without an X server, or
    /// [`ForegroundError::Unsupported`] on a Wayland session.
    pub fn new() -> ForegroundResult<Self> {
        Ok(Self {
            session: X11Session::connect()?,
        })
    }
}

fn to_x11(window: WindowId) -> ForegroundResult<u32> {
    u32::try_from(window.0)
        .map_err(|_| ForegroundError::platform(format!("{window} is not an X11 window")))
}

impl WindowResolver for ImplWindowResolver {
    fn foreground_window(&self) -> Option<WindowId> {
        match self.session.active_window() {
            Ok(window) => window.map(|w| WindowId(w.into())),
            Err(e) => {
                debug!("failed to read active window: {e}");
                None
            }
        }
    }

    fn owning_process_id(&self, window: WindowId) -> ForegroundResult<u32> {
        self.session.window_pid(to_x11(window)?)
    }

    fn window_title(&self, window: WindowId) -> String {
        to_x11(window)
            .and_then(|w| self.session.window_name(w))
            .unwrap_or_else(|e| {
                debug!(%window, "failed to read window title: {e}");
                String::new()
            })
    }

    fn main_window_of(&self, pid: u32) -> Option<WindowId> {
        // Prefer the active window so a multi-window process reports what the
        // user is looking at.
        if let Ok(Some(active)) = self.session.active_window()
            && self.session.window_pid(active).ok() == Some(pid)
        {
            return Some(WindowId(active.into()));
        }

        let clients = match self.session.client_list() {
            Ok(clients) => clients,
            Err(e) => {
                debug!(pid, "failed to read client list: {e}");
                return None;
            }
        };

        clients
            .into_iter()
            .find(|&window| self.session.window_pid(window).ok() == Some(pid))
            .map(|window| WindowId(window.into()))
    }
}
