pub mod clock;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{parse_cutover, SchedulingError, UpdateScheduler};
