use crate::{ForegroundError, ForegroundResult};
use std::ffi::{OsStr, OsString, c_void};
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::Path;
use windows_sys::Win32::{
    Foundation::{ERROR_SUCCESS, HWND, LPARAM},
    Storage::FileSystem::{
        GetFileVersionInfoSizeW, GetFileVersionInfoW, VS_FIXEDFILEINFO, VerQueryValueW,
    },
    System::Registry::{HKEY_CURRENT_USER, RRF_RT_REG_DWORD, RegGetValueW},
    UI::WindowsAndMessaging::{
        EnumWindows, GW_OWNER, GetForegroundWindow, GetWindow, GetWindowTextLengthW,
        GetWindowTextW, GetWindowThreadProcessId, IsWindow, IsWindowVisible,
    },
};

const PERSONALIZE_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Themes\Personalize";

fn wide(s: impl AsRef<OsStr>) -> Vec<u16> {
    s.as_ref().encode_wide().chain(std::iter::once(0)).collect()
}

pub fn get_foreground_window() -> Option<HWND> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.is_null() || unsafe { IsWindow(hwnd) } == 0 {
        None
    } else {
        Some(hwnd)
    }
}

pub fn is_interactive_session() -> ForegroundResult<bool> {
    use windows_sys::Win32::System::StationsAndDesktops::{
        GetProcessWindowStation, GetUserObjectInformationW, UOI_FLAGS, USEROBJECTFLAGS,
    };

    let station = unsafe { GetProcessWindowStation() };
    if station.is_null() {
        return Err(ForegroundError::platform(
            "failed to get process window station",
        ));
    }

    let mut flags: USEROBJECTFLAGS = unsafe { std::mem::zeroed() };
    let mut needed: u32 = 0;
    let ok = unsafe {
        GetUserObjectInformationW(
            station as _,
            UOI_FLAGS,
            &mut flags as *mut _ as *mut _,
            std::mem::size_of::<USEROBJECTFLAGS>() as u32,
            &mut needed,
        )
    };

    if ok == 0 {
        return Err(ForegroundError::platform(
            "failed to get window station flags",
        ));
    }

    Ok(flags.dwFlags & 1 != 0)
}

/// Reads `AppsUseLightTheme` from the current user's personalization key.
pub fn system_prefers_dark() -> ForegroundResult<bool> {
    let key = wide(PERSONALIZE_KEY);
    let value = wide("AppsUseLightTheme");
    let mut data: u32 = 0;
    let mut size = std::mem::size_of::<u32>() as u32;

    let status = unsafe {
        RegGetValueW(
            HKEY_CURRENT_USER,
            key.as_ptr(),
            value.as_ptr(),
            RRF_RT_REG_DWORD,
            std::ptr::null_mut(),
            &mut data as *mut u32 as *mut c_void,
            &mut size,
        )
    };

    if status != ERROR_SUCCESS {
        return Err(ForegroundError::platform(format!(
            "failed to read AppsUseLightTheme (error {status})"
        )));
    }

    Ok(data == 0)
}

pub(crate) fn get_window_title(hwnd: HWND) -> String {
    let len = unsafe { GetWindowTextLengthW(hwnd) };
    if len <= 0 {
        return String::new();
    }

    let mut buffer = vec![0u16; len as usize + 1];
    let copied = unsafe { GetWindowTextW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32) };
    if copied <= 0 {
        return String::new();
    }

    OsString::from_wide(&buffer[..copied as usize])
        .to_string_lossy()
        .into_owned()
}

pub(crate) fn get_window_process_id(hwnd: HWND) -> ForegroundResult<u32> {
    let mut process_id = 0u32;
    unsafe {
        GetWindowThreadProcessId(hwnd, &mut process_id);
    }

    if process_id == 0 {
        return Err(ForegroundError::platform("failed to get process ID"));
    }

    Ok(process_id)
}

struct MainWindowSearch {
    pid: u32,
    found: HWND,
}

unsafe extern "system" fn main_window_candidate(hwnd: HWND, lparam: LPARAM) -> i32 {
    let search = unsafe { &mut *(lparam as *mut MainWindowSearch) };

    let mut pid = 0u32;
    unsafe { GetWindowThreadProcessId(hwnd, &mut pid) };
    if pid != search.pid {
        return 1;
    }

    let visible = unsafe { IsWindowVisible(hwnd) } != 0;
    let owned = !unsafe { GetWindow(hwnd, GW_OWNER) }.is_null();
    if visible && !owned {
        search.found = hwnd;
        return 0;
    }
    1
}

/// The first visible, unowned top-level window of `pid`.
pub(crate) fn find_main_window(pid: u32) -> Option<HWND> {
    let mut search = MainWindowSearch {
        pid,
        found: std::ptr::null_mut(),
    };
    unsafe {
        EnumWindows(
            Some(main_window_candidate),
            &mut search as *mut MainWindowSearch as LPARAM,
        );
    }
    (!search.found.is_null()).then_some(search.found)
}

/// Product version from the `VS_FIXEDFILEINFO` resource of `exe`.
pub(crate) fn product_version(exe: &Path) -> ForegroundResult<String> {
    let path = wide(exe);

    let mut ignored = 0u32;
    let size = unsafe { GetFileVersionInfoSizeW(path.as_ptr(), &mut ignored) };
    if size == 0 {
        return Err(ForegroundError::platform(format!(
            "{} has no version resource",
            exe.display()
        )));
    }

    let mut block = vec![0u8; size as usize];
    let ok = unsafe {
        GetFileVersionInfoW(path.as_ptr(), 0, size, block.as_mut_ptr() as *mut c_void)
    };
    if ok == 0 {
        return Err(ForegroundError::platform("failed to read version resource"));
    }

    let root = wide("\\");
    let mut info: *mut c_void = std::ptr::null_mut();
    let mut len = 0u32;
    let ok = unsafe {
        VerQueryValueW(
            block.as_ptr() as *const c_void,
            root.as_ptr(),
            &mut info,
            &mut len,
        )
    };
    if ok == 0 || info.is_null() || (len as usize) < std::mem::size_of::<VS_FIXEDFILEINFO>() {
        return Err(ForegroundError::platform("no fixed file info"));
    }

    let fixed = unsafe { &*(info as *const VS_FIXEDFILEINFO) };
    Ok(format!(
        "{}.{}.{}.{}",
        fixed.dwProductVersionMS >> 16,
        fixed.dwProductVersionMS & 0xffff,
        fixed.dwProductVersionLS >> 16,
        fixed.dwProductVersionLS & 0xffff,
    ))
}
