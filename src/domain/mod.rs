pub mod billing;
pub mod events;
pub mod meter_reading;
pub mod payment;

// Re-export commonly used types
pub use billing::{
    BillingInput, BillingResult, ConnectionType, RateSchedule, RateTableRepository, RateTier,
    TierCharge, TieredBillCalculator,
};
pub use meter_reading::{MeterReading, ReadingStatus};
pub use payment::{settle_payment, PaymentMethod, PaymentStatus, Settlement};

pub use crate::shared::errors::DomainError;

pub type DomainResult<T> = Result<T, DomainError>;
