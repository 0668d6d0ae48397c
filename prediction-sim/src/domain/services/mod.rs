mod clock;

pub use clock::{Clock, ControllableClock};
