use crate::{ForegroundError, ForegroundResult};
use std::env::var_os;
use std::path::Path;

/// Whether the session looks like Wayland: `XDG_SESSION_TYPE=wayland` (any
/// case) or a non-empty `WAYLAND_DISPLAY`.
pub fn wayland_detect() -> bool {
    let is_wayland_session = var_os("XDG_SESSION_TYPE")
        .map(|v| v.to_string_lossy().eq_ignore_ascii_case("wayland"))
        .unwrap_or(false);

    let has_wayland_display = var_os("WAYLAND_DISPLAY")
        .map(|v| !v.is_empty())
        .unwrap_or(false);

    is_wayland_session || has_wayland_display
}

/// There is no portable dark-mode setting on X11 desktops.
pub fn system_prefers_dark() -> ForegroundResult<bool> {
    Err(ForegroundError::Unsupported)
}

/// ELF executables carry no product version resource.
pub(crate) fn product_version(_exe: &Path) -> ForegroundResult<String> {
    Ok(String::new())
}

pub(crate) fn qualify_x11_error(err: ForegroundError) -> ForegroundError {
    if matches!(err, ForegroundError::NoDisplay) && wayland_detect() {
        ForegroundError::Unsupported
    } else {
        err
    }
}
