use std::fmt;

/// The three notifications an OS notification source can deliver.
///
/// None of them carries a payload: the tracker re-resolves whatever it needs
/// when it handles the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsEvent {
    /// The foreground window changed.
    FocusChanged,
    /// A window started capturing the mouse (often precedes a focus change).
    CaptureStarted,
    /// Some window changed its title.
    TitleChanged,
}

impl OsEvent {
    /// Whether the event calls for a full foreground resolution rather than
    /// a title refresh.
    #[must_use]
    pub fn needs_full_refresh(self) -> bool {
        matches!(self, OsEvent::FocusChanged | OsEvent::CaptureStarted)
    }
}

/// Opaque, platform-neutral window identifier (`HWND` on Windows, X11 window
/// id on Linux).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
