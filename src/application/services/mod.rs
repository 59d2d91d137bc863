//! Application services

mod billing;

pub use billing::BillingService;
