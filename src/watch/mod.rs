//! Poll loop and transition detection

pub mod detector;
pub mod scheduler;

pub use detector::{Change, ChangeDetector};
pub use scheduler::{CycleReport, StatusWatcher};
