mod impl_window_resolver;
pub mod utils;
mod x11;
mod xorg_event_source;

pub use impl_window_resolver::ImplWindowResolver as NativeWindowResolver;
pub use xorg_event_source::XorgEventSource as NativeEventSource;
