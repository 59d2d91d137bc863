//! Meter reading domain entity

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};
use crate::shared::errors::BillingError;

/// Review state of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Pending,
    Approved,
    Rejected,
    Flagged,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Flagged => "flagged",
        }
    }

    /// Approved and rejected readings cannot be reviewed again.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two consecutive meter indexes for one customer and billing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterReading {
    pub id: String,
    pub customer_id: String,
    pub meter_id: String,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub reading_date: NaiveDate,
    pub status: ReadingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl MeterReading {
    /// New reading awaiting review
    pub fn new(
        id: impl Into<String>,
        customer_id: impl Into<String>,
        meter_id: impl Into<String>,
        previous_reading: impl Into<Decimal>,
        current_reading: impl Into<Decimal>,
        reading_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            customer_id: customer_id.into(),
            meter_id: meter_id.into(),
            previous_reading: previous_reading.into(),
            current_reading: current_reading.into(),
            reading_date,
            status: ReadingStatus::Pending,
            rejection_reason: None,
        }
    }

    /// Volume consumed between the two indexes.
    pub fn consumption(&self) -> Result<Decimal, BillingError> {
        let consumption = self
            .current_reading
            .checked_sub(self.previous_reading)
            .ok_or_else(|| {
                BillingError::invalid_input(format!(
                    "meter indexes {} and {} are out of range",
                    self.previous_reading, self.current_reading
                ))
            })?;
        if consumption < Decimal::ZERO {
            return Err(BillingError::invalid_input(
                "current reading cannot be less than previous reading",
            ));
        }
        Ok(consumption)
    }

    pub fn is_billable(&self) -> bool {
        self.status == ReadingStatus::Approved
    }

    pub fn approve(&mut self) -> DomainResult<()> {
        self.ensure_reviewable()?;
        self.status = ReadingStatus::Approved;
        self.rejection_reason = None;
        Ok(())
    }

    pub fn reject(&mut self, reason: impl Into<String>) -> DomainResult<()> {
        self.ensure_reviewable()?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(DomainError::Validation(
                "a rejection reason is required".to_string(),
            ));
        }
        self.status = ReadingStatus::Rejected;
        self.rejection_reason = Some(reason.trim().to_string());
        Ok(())
    }

    /// Mark for a second look; a flagged reading can still be approved or
    /// rejected later.
    pub fn flag(&mut self) -> DomainResult<()> {
        self.ensure_reviewable()?;
        self.status = ReadingStatus::Flagged;
        Ok(())
    }

    fn ensure_reviewable(&self) -> DomainResult<()> {
        if self.status.is_final() {
            return Err(DomainError::Validation(format!(
                "reading {} is already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}
