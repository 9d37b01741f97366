#![warn(clippy::unwrap_used)]

pub mod eligibility;
pub mod engine;
pub mod ranking;

pub use engine::{DeliveryConfig, DeliveryEngine};
