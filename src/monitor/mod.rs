pub mod controller;
pub mod engine;
pub mod state;
pub mod strain;
pub mod throttle;

pub use controller::{MonitorController, MonitorSnapshot};
pub use engine::{FrameOutcome, MonitorEngine};
pub use state::{MonitorStatus, SessionState};
pub use strain::StrainLevel;
pub use throttle::NotificationThrottle;
