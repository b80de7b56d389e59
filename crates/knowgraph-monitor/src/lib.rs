pub mod detector;
pub mod event;
pub mod snapshot;

pub use detector::{ChangeDetector, FileRecord};
pub use event::{ChangeEvent, MonitorStats};
pub use snapshot::{GitState, Snapshot};
