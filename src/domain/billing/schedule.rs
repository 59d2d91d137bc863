//! Validated per-connection-type rate schedule

use rust_decimal::Decimal;

use super::model::{ConnectionType, RateTier};
use crate::shared::errors::BillingError;

/// Tiers of one connection type, sorted by `min_consumption` and checked to
/// be contiguous from zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSchedule {
    connection_type: ConnectionType,
    tiers: Vec<RateTier>,
}

impl RateSchedule {
    /// Select the tiers for `connection_type` out of a mixed table and
    /// validate all of them.
    ///
    /// Fails with [`BillingError::Configuration`] when the connection type
    /// has no tiers, the first tier does not start at zero, a bound or rate
    /// is negative, two neighbours leave a gap or overlap, or an open-ended
    /// tier is followed by another one.
    pub fn for_connection(
        tiers: &[RateTier],
        connection_type: ConnectionType,
    ) -> Result<Self, BillingError> {
        let selected = select(tiers, connection_type)?;
        validate(connection_type, &selected)?;
        Ok(Self {
            connection_type,
            tiers: selected,
        })
    }

    /// Like [`for_connection`](Self::for_connection), but only the tiers
    /// needed to bill `consumption` units are kept and checked. A gap or a
    /// broken tier above that range does not matter for this bill.
    pub fn covering(
        tiers: &[RateTier],
        connection_type: ConnectionType,
        consumption: Decimal,
    ) -> Result<Self, BillingError> {
        let mut selected = select(tiers, connection_type)?;

        // A tier is needed once consumption passes the unit just below it.
        let needed = 1 + selected
            .iter()
            .skip(1)
            .take_while(|tier| {
                tier.min_consumption
                    .checked_sub(Decimal::ONE)
                    .map_or(true, |last_before| last_before < consumption)
            })
            .count();
        selected.truncate(needed);

        validate(connection_type, &selected)?;
        let schedule = Self {
            connection_type,
            tiers: selected,
        };
        schedule.ensure_covers(consumption)?;
        Ok(schedule)
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    pub fn tiers(&self) -> &[RateTier] {
        &self.tiers
    }

    pub fn into_tiers(self) -> Vec<RateTier> {
        self.tiers
    }

    /// Total units the schedule can bill, `None` when the top tier is
    /// open-ended. Tiers are contiguous from zero, so this is the upper
    /// bound of the last tier.
    pub fn capacity(&self) -> Option<Decimal> {
        self.tiers.last().and_then(|tier| tier.max_consumption)
    }

    /// Fails unless the schedule can bill `consumption` units.
    pub fn ensure_covers(&self, consumption: Decimal) -> Result<(), BillingError> {
        match self.capacity() {
            Some(capacity) if consumption > capacity => Err(BillingError::configuration(format!(
                "{} tiers cover {} units, consumption is {}",
                self.connection_type, capacity, consumption
            ))),
            _ => Ok(()),
        }
    }
}

fn select(
    tiers: &[RateTier],
    connection_type: ConnectionType,
) -> Result<Vec<RateTier>, BillingError> {
    let mut selected: Vec<RateTier> = tiers
        .iter()
        .filter(|t| t.connection_type == connection_type)
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(BillingError::configuration(format!(
            "no rate tiers configured for {} connections",
            connection_type
        )));
    }

    selected.sort_by(|a, b| a.min_consumption.cmp(&b.min_consumption));
    Ok(selected)
}

fn validate(connection_type: ConnectionType, tiers: &[RateTier]) -> Result<(), BillingError> {
    if let Some(first) = tiers.first() {
        if first.min_consumption != Decimal::ZERO {
            return Err(BillingError::configuration(format!(
                "{} tiers must start at 0, first tier starts at {}",
                connection_type, first.min_consumption
            )));
        }
    }

    for tier in tiers {
        if tier.rate_per_unit < Decimal::ZERO {
            return Err(BillingError::configuration(format!(
                "{} tier {} has a negative rate",
                connection_type,
                tier.label()
            )));
        }
        if let Some(max) = tier.max_consumption {
            if max < tier.min_consumption {
                return Err(BillingError::configuration(format!(
                    "{} tier {} ends before it starts",
                    connection_type,
                    tier.label()
                )));
            }
        }
    }

    for pair in tiers.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let Some(prev_max) = prev.max_consumption else {
            return Err(BillingError::configuration(format!(
                "{} tier {} is open-ended but followed by tier {}",
                connection_type,
                prev.label(),
                next.label()
            )));
        };

        let Some(expected) = prev_max.checked_add(Decimal::ONE) else {
            return Err(BillingError::configuration(format!(
                "{} tier {} ends at the largest representable value but is followed by tier {}",
                connection_type,
                prev.label(),
                next.label()
            )));
        };
        if next.min_consumption > expected {
            return Err(BillingError::configuration(format!(
                "gap between {} tiers {} and {}",
                connection_type,
                prev.label(),
                next.label()
            )));
        }
        if next.min_consumption < expected {
            return Err(BillingError::configuration(format!(
                "{} tiers {} and {} overlap",
                connection_type,
                prev.label(),
                next.label()
            )));
        }
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────
