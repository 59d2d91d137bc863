//! Tiered consumption bill calculation

use rust_decimal::{Decimal, RoundingStrategy};

use super::model::{BillingInput, BillingResult, RateTier, TierCharge};
use super::schedule::RateSchedule;
use crate::shared::errors::BillingError;

/// Pure calculator for graduated water tariffs.
///
/// Holds only the currency's minor-unit precision; all other inputs come in
/// per call, so a single instance can be shared freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieredBillCalculator {
    minor_units: u32,
}

impl Default for TieredBillCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl TieredBillCalculator {
    /// Calculator rounding tax to whole currency units (TZS).
    pub fn new() -> Self {
        Self { minor_units: 0 }
    }

    /// Calculator rounding tax to `minor_units` decimal places.
    pub fn with_minor_units(minor_units: u32) -> Self {
        Self { minor_units }
    }

    pub fn minor_units(&self) -> u32 {
        self.minor_units
    }

    /// Compute base charge, tiered consumption charge and tax.
    ///
    /// Tiers of other connection types are ignored, and so are tiers above
    /// the billed consumption. Tax is charged on the pre-tax subtotal and
    /// rounded half-up to the currency minor unit.
    ///
    /// Amounts too large for [`Decimal`] are reported as
    /// [`BillingError::InvalidInput`].
    pub fn calculate(
        &self,
        input: &BillingInput,
        tiers: &[RateTier],
    ) -> Result<BillingResult, BillingError> {
        validate_input(input)?;
        let schedule = RateSchedule::covering(tiers, input.connection_type, input.consumption)?;
        self.apply(input, &schedule)
    }

    /// Same as [`calculate`](Self::calculate) for an already validated
    /// schedule.
    pub fn calculate_with_schedule(
        &self,
        input: &BillingInput,
        schedule: &RateSchedule,
    ) -> Result<BillingResult, BillingError> {
        validate_input(input)?;
        if schedule.connection_type() != input.connection_type {
            return Err(BillingError::configuration(format!(
                "schedule is for {} connections, input is {}",
                schedule.connection_type(),
                input.connection_type
            )));
        }
        self.apply(input, schedule)
    }

    fn apply(
        &self,
        input: &BillingInput,
        schedule: &RateSchedule,
    ) -> Result<BillingResult, BillingError> {
        schedule.ensure_covers(input.consumption)?;

        let mut remaining = input.consumption;
        let mut consumption_charge = Decimal::ZERO;
        let mut charges = Vec::new();

        for tier in schedule.tiers() {
            if remaining <= Decimal::ZERO {
                break;
            }
            let units = match tier.capacity() {
                Some(capacity) => remaining.min(capacity),
                None => remaining,
            };
            if units.is_zero() {
                continue;
            }

            let amount = units
                .checked_mul(tier.rate_per_unit)
                .ok_or_else(|| too_large(input, "tier charge"))?;
            consumption_charge = consumption_charge
                .checked_add(amount)
                .ok_or_else(|| too_large(input, "consumption charge"))?;
            remaining -= units;

            charges.push(TierCharge {
                min_consumption: tier.min_consumption,
                max_consumption: tier.max_consumption,
                rate_per_unit: tier.rate_per_unit,
                units,
                amount,
            });
        }

        let subtotal = input
            .base_charge
            .checked_add(consumption_charge)
            .ok_or_else(|| too_large(input, "subtotal"))?;
        let tax_amount = subtotal
            .checked_mul(input.tax_rate)
            .ok_or_else(|| too_large(input, "tax"))?
            .round_dp_with_strategy(self.minor_units, RoundingStrategy::MidpointAwayFromZero);
        let total_amount = subtotal
            .checked_add(tax_amount)
            .ok_or_else(|| too_large(input, "total"))?;

        Ok(BillingResult {
            base_charge: input.base_charge,
            consumption_charge,
            subtotal,
            tax_amount,
            total_amount,
            tiers: charges,
        })
    }
}

fn too_large(input: &BillingInput, what: &str) -> BillingError {
    BillingError::invalid_input(format!(
        "{} overflows for consumption {} and base charge {}",
        what, input.consumption, input.base_charge
    ))
}

fn validate_input(input: &BillingInput) -> Result<(), BillingError> {
    if input.consumption < Decimal::ZERO {
        return Err(BillingError::invalid_input(format!(
            "consumption must be >= 0, got {}",
            input.consumption
        )));
    }
    if input.base_charge < Decimal::ZERO {
        return Err(BillingError::invalid_input(format!(
            "base charge must be >= 0, got {}",
            input.base_charge
        )));
    }
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(BillingError::invalid_input(format!(
            "tax rate must be within [0, 1], got {}",
            input.tax_rate
        )));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────
