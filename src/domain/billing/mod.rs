//! Billing aggregate
//!
//! Rate tiers, the validated per-connection schedule, and the tiered bill
//! calculator.

pub mod calculator;
pub mod model;
pub mod repository;
pub mod schedule;

pub use calculator::TieredBillCalculator;
pub use model::{BillingInput, BillingResult, ConnectionType, RateTier, TierCharge};
pub use repository::RateTableRepository;
pub use schedule::RateSchedule;
