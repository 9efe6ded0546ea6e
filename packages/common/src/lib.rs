pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod hook;
pub mod lifecycle;
pub mod notification;
pub mod status;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ParseEnumError;
pub use lifecycle::{LifecyclePhase, PhaseWindows, compute_phase};
pub use notification::{DedupKey, NotificationCategory, NotifyOutcome};
pub use status::HackathonStatus;
