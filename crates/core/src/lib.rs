pub mod clock;
pub mod config;
pub mod error;
pub mod types;
pub mod validation;

pub use clock::{ClockSource, SimulatedClock};
pub use config::AppConfig;
pub use error::{AdError, AdResult, MissingCounter};
