use chrono::{Local, NaiveDateTime};

pub mod select;
pub mod window;

pub use select::{is_overdue, next_vm_to_backup};
pub use window::is_within_window;

/// Source of "now" in the local wall-clock frame archives are named in.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
