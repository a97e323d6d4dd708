mod impl_window_resolver;
pub mod utils;
mod win_event_source;

pub use impl_window_resolver::ImplWindowResolver as NativeWindowResolver;
pub use win_event_source::WinEventSource as NativeEventSource;
