//! Billing domain types

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shared::errors::BillingError;

/// Customer category that selects which rate table applies
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Residential,
    Commercial,
    Industrial,
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 3] = [
        ConnectionType::Residential,
        ConnectionType::Commercial,
        ConnectionType::Industrial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Residential => "residential",
            Self::Commercial => "commercial",
            Self::Industrial => "industrial",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "residential" => Ok(Self::Residential),
            "commercial" => Ok(Self::Commercial),
            "industrial" => Ok(Self::Industrial),
            other => Err(BillingError::invalid_input(format!(
                "unknown connection type '{}'",
                other
            ))),
        }
    }
}

/// One band of a graduated rate table.
///
/// Bounds are inclusive and counted in whole volume units starting at 1:
/// `[0, 10]` holds units 1 through 10 and `[11, 20]` the next ten.
/// `max_consumption = None` marks the open-ended top band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTier {
    pub connection_type: ConnectionType,
    pub min_consumption: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consumption: Option<Decimal>,
    pub rate_per_unit: Decimal,
}

impl RateTier {
    pub fn new(
        connection_type: ConnectionType,
        min_consumption: impl Into<Decimal>,
        max_consumption: Option<Decimal>,
        rate_per_unit: impl Into<Decimal>,
    ) -> Self {
        Self {
            connection_type,
            min_consumption: min_consumption.into(),
            max_consumption,
            rate_per_unit: rate_per_unit.into(),
        }
    }

    pub fn bounded(
        connection_type: ConnectionType,
        min: impl Into<Decimal>,
        max: impl Into<Decimal>,
        rate: impl Into<Decimal>,
    ) -> Self {
        Self::new(connection_type, min, Some(max.into()), rate)
    }

    pub fn unbounded(
        connection_type: ConnectionType,
        min: impl Into<Decimal>,
        rate: impl Into<Decimal>,
    ) -> Self {
        Self::new(connection_type, min, None, rate)
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_consumption.is_none()
    }

    /// Number of units this tier can bill, `None` for the open-ended tier.
    pub fn capacity(&self) -> Option<Decimal> {
        let first_unit = self.min_consumption.max(Decimal::ONE);
        self.max_consumption.map(|max| {
            // underflow means max < first_unit, an empty tier
            max.checked_sub(first_unit)
                .and_then(|span| span.checked_add(Decimal::ONE))
                .map_or(Decimal::ZERO, |units| units.max(Decimal::ZERO))
        })
    }

    /// Human-readable band label, e.g. `11-20` or `51+`.
    pub fn label(&self) -> String {
        match self.max_consumption {
            Some(max) => format!("{}-{}", self.min_consumption, max),
            None => format!("{}+", self.min_consumption),
        }
    }

    /// The residential table published on the billing dashboard, reused for
    /// any connection type.
    pub fn standard_table(connection_type: ConnectionType) -> Vec<RateTier> {
        vec![
            RateTier::bounded(connection_type, 0, 10, 800),
            RateTier::bounded(connection_type, 11, 20, 1200),
            RateTier::bounded(connection_type, 21, 50, 1800),
            RateTier::unbounded(connection_type, 51, 2500),
        ]
    }
}

/// Input for one bill calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingInput {
    /// Volume consumed in the billing period
    pub consumption: Decimal,
    pub connection_type: ConnectionType,
    /// Fixed fee independent of consumption
    pub base_charge: Decimal,
    /// Fraction in `[0, 1]`, e.g. `0.10` for 10%
    pub tax_rate: Decimal,
}

impl BillingInput {
    pub fn new(
        consumption: impl Into<Decimal>,
        connection_type: ConnectionType,
        base_charge: impl Into<Decimal>,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            consumption: consumption.into(),
            connection_type,
            base_charge: base_charge.into(),
            tax_rate,
        }
    }
}

/// Charge for the units that fell into one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCharge {
    pub min_consumption: Decimal,
    pub max_consumption: Option<Decimal>,
    pub rate_per_unit: Decimal,
    pub units: Decimal,
    pub amount: Decimal,
}

/// Outcome of a bill calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingResult {
    pub base_charge: Decimal,
    pub consumption_charge: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub tiers: Vec<TierCharge>,
}

impl BillingResult {
    /// Format the total with thousands separators, e.g. `TZS 34,100`.
    pub fn format_total(&self, currency: &str) -> String {
        format!("{} {}", currency, group_thousands(self.total_amount))
    }
}

fn group_thousands(amount: Decimal) -> String {
    let text = amount.normalize().to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

// ── Tests ──────────────────────────────────────────────────────
