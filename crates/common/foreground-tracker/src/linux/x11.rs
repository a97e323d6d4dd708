use super::utils::qualify_x11_error;
use crate::{ForegroundError, ForegroundResult};
use x11rb::{
    connection::Connection,
    protocol::xproto::{AtomEnum, ChangeWindowAttributesAux, ConnectionExt, EventMask},
    rust_connection::RustConnection,
};

const MAX_STRING_PROPERTY_LEN: u32 = 4096;
const MAX_CLIENT_LIST_LEN: u32 = 4096;

#[derive(Debug, Clone, Copy)]
pub(super) struct X11Atoms {
    pub net_active_window: u32,
    pub net_client_list: u32,
    pub net_wm_name: u32,
    pub wm_name: u32,
    pub net_wm_pid: u32,
    pub utf8_string: u32,
}

/// A connection to the X server plus the root window and atoms the tracker
/// needs.
pub(super) struct X11Session {
    pub conn: RustConnection,
    pub root: u32,
    pub atoms: X11Atoms,
}

impl X11Session {
    pub fn connect() -> ForegroundResult<Self> {
        let (conn, screen_num) = connect_to_x11().map_err(qualify_x11_error)?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| ForegroundError::platform("X11 screen not found"))?;
        let atoms = setup_atoms(&conn)?;
        Ok(Self { conn, root, atoms })
    }

    pub fn active_window(&self) -> ForegroundResult<Option<u32>> {
        let reply = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms.net_active_window,
                AtomEnum::WINDOW,
                0,
                1,
            )
            .map_err(|e| {
                ForegroundError::platform_with_source("failed to get active window property", e)
            })?
            .reply()
            .map_err(|e| {
                ForegroundError::platform_with_source("failed to get active window reply", e)
            })?;

        Ok(reply
            .value32()
            .and_then(|mut v| v.next())
            .filter(|&id| id != 0))
    }

    pub fn client_list(&self) -> ForegroundResult<Vec<u32>> {
        let reply = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms.net_client_list,
                AtomEnum::WINDOW,
                0,
                MAX_CLIENT_LIST_LEN,
            )
            .map_err(|e| ForegroundError::platform_with_source("failed to get client list", e))?
            .reply()
            .map_err(|e| {
                ForegroundError::platform_with_source("failed to get client list reply", e)
            })?;

        Ok(reply
            .value32()
            .map(|windows| windows.collect())
            .unwrap_or_default())
    }

    pub fn window_pid(&self, window: u32) -> ForegroundResult<u32> {
        let reply = self
            .conn
            .get_property(
                false,
                window,
                self.atoms.net_wm_pid,
                AtomEnum::CARDINAL,
                0,
                1,
            )
            .map_err(|e| {
                ForegroundError::platform_with_source("failed to get window PID property", e)
            })?
            .reply()
            .map_err(|e| {
                ForegroundError::platform_with_source("failed to get window PID reply", e)
            })?;

        reply
            .value32()
            .and_then(|mut v| v.next())
            .ok_or_else(|| ForegroundError::platform("no PID found for window"))
    }

    pub fn window_name(&self, window: u32) -> ForegroundResult<String> {
        match self.property_string(window, self.atoms.net_wm_name, self.atoms.utf8_string) {
            Ok(Some(title)) => Ok(title),
            _ => self
                .property_string(window, self.atoms.wm_name, AtomEnum::STRING.into())
                .and_then(|opt| opt.ok_or_else(|| ForegroundError::platform("no window name found"))),
        }
    }

    pub fn watch_properties(&self, window: u32, watch: bool) -> ForegroundResult<()> {
        let mask = if watch {
            EventMask::PROPERTY_CHANGE
        } else {
            EventMask::NO_EVENT
        };
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))
            .map_err(|e| {
                ForegroundError::platform_with_source(
                    format!("failed to change event mask of window {window:#x}"),
                    e,
                )
            })?;
        Ok(())
    }

    pub fn flush(&self) -> ForegroundResult<()> {
        self.conn
            .flush()
            .map_err(|e| ForegroundError::platform_with_source("failed to flush X11 connection", e))
    }

    fn property_string(
        &self,
        window: u32,
        property: u32,
        property_type: u32,
    ) -> ForegroundResult<Option<String>> {
        let reply = self
            .conn
            .get_property(
                false,
                window,
                property,
                property_type,
                0,
                MAX_STRING_PROPERTY_LEN,
            )
            .map_err(|e| {
                ForegroundError::platform_with_source("failed to get window property", e)
            })?
            .reply()
            .map_err(|e| {
                ForegroundError::platform_with_source("failed to get window property reply", e)
            })?;

        if reply.value_len > 0 {
            Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
        } else {
            Ok(None)
        }
    }
}

fn connect_to_x11() -> ForegroundResult<(RustConnection, usize)> {
    RustConnection::connect(None).map_err(|e| {
        let error_str = e.to_string();
        if error_str.contains("DISPLAY")
            || error_str.contains("display")
            || error_str.contains("No such file or directory")
        {
            ForegroundError::NoDisplay
        } else {
            ForegroundError::platform_with_source("failed to connect to X11", e)
        }
    })
}

fn setup_atoms<C: Connection>(conn: &C) -> ForegroundResult<X11Atoms> {
    Ok(X11Atoms {
        net_active_window: get_atom(conn, b"_NET_ACTIVE_WINDOW")?,
        net_client_list: get_atom(conn, b"_NET_CLIENT_LIST")?,
        net_wm_name: get_atom(conn, b"_NET_WM_NAME")?,
        wm_name: AtomEnum::WM_NAME.into(),
        net_wm_pid: get_atom(conn, b"_NET_WM_PID")?,
        utf8_string: get_atom(conn, b"UTF8_STRING")?,
    })
}

fn get_atom<C: Connection>(conn: &C, name: &[u8]) -> ForegroundResult<u32> {
    let reply = conn
        .intern_atom(false, name)
        .map_err(|e| ForegroundError::platform_with_source("failed to intern atom", e))?
        .reply()
        .map_err(|e| ForegroundError::platform_with_source("failed to get atom reply", e))?;

    Ok(reply.atom)
}
