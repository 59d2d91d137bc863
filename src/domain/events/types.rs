//! Billing events
//!
//! Facts published after the billing service changes or computes something.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::billing::ConnectionType;
use crate::domain::payment::{PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    BillCalculated(BillCalculatedEvent),
    RateScheduleUpdated(RateScheduleUpdatedEvent),
    PaymentSettled(PaymentSettledEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::BillCalculated(_) => "bill_calculated",
            Event::RateScheduleUpdated(_) => "rate_schedule_updated",
            Event::PaymentSettled(_) => "payment_settled",
        }
    }

    pub fn customer_id(&self) -> Option<&str> {
        match self {
            Event::BillCalculated(e) => Some(&e.customer_id),
            Event::RateScheduleUpdated(_) => None,
            Event::PaymentSettled(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillCalculatedEvent {
    pub reading_id: String,
    pub customer_id: String,
    pub connection_type: ConnectionType,
    pub consumption: Decimal,
    pub consumption_charge: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateScheduleUpdatedEvent {
    pub connection_type: ConnectionType,
    pub tier_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub invoice_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_amount: Decimal,
    pub outstanding: Decimal,
    pub status: PaymentStatus,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

/// Wrapper for sending events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
