mod config;
mod error;
mod event;
mod snapshot;

pub use config::{DEFAULT_START_TIME_FORMAT, TrackerConfig};
pub use error::{ForegroundError, ForegroundResult};
pub use event::{OsEvent, WindowId};
pub use snapshot::ProcessSnapshot;
