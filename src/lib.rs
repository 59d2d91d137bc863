//! # Water Billing Core
//!
//! Tiered consumption billing for a water utility.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Rate tiers and schedules, the bill calculator, meter
//!   readings, payment settlement and event types
//! - **application**: Billing service and the broadcast event bus
//! - **infrastructure**: In-memory rate table repository
//! - **shared**: Error types
//!
//! The calculator itself is synchronous and stateless:
//!
//! ```
//! use rust_decimal::Decimal;
//! use water_billing::domain::{BillingInput, ConnectionType, RateTier, TieredBillCalculator};
//!
//! let tiers = RateTier::standard_table(ConnectionType::Residential);
//! let input = BillingInput::new(25, ConnectionType::Residential, 2000, Decimal::new(10, 2));
//! let bill = TieredBillCalculator::new().calculate(&input, &tiers).unwrap();
//! assert_eq!(bill.total_amount, Decimal::from(34100));
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod telemetry;

pub use config::{default_config_path, AppConfig, BillingSettings, LoggingConfig};

pub use application::{create_event_bus, BillingService, Event, EventBus, SharedEventBus};
pub use infrastructure::InMemoryRateTableRepository;
pub use shared::errors::{AppError, BillingError, ConfigError, DomainError};
pub use telemetry::init_tracing;
