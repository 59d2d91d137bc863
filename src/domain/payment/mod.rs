//! Payment settlement

pub mod model;

pub use model::{settle_payment, PaymentMethod, PaymentStatus, Settlement};
