//! Payment domain types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shared::errors::BillingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    MobileMoney,
    Cheque,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::MobileMoney => "mobile_money",
            Self::Cheque => "cheque",
            Self::Card => "card",
        }
    }
}

/// Settlement state of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }

    /// Status as seen on `today`: unsettled invoices past their due date
    /// become overdue.
    pub fn for_due_date(self, due_date: NaiveDate, today: NaiveDate) -> Self {
        match self {
            Self::Pending | Self::Partial if today > due_date => Self::Overdue,
            other => other,
        }
    }
}

/// Invoice balance after applying one payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub paid_amount: Decimal,
    pub outstanding: Decimal,
    pub status: PaymentStatus,
}

/// Apply `amount` to an invoice of `total` that already received
/// `already_paid`.
pub fn settle_payment(
    total: Decimal,
    already_paid: Decimal,
    amount: Decimal,
) -> Result<Settlement, BillingError> {
    if total < Decimal::ZERO {
        return Err(BillingError::invalid_input("invoice total must be >= 0"));
    }
    if already_paid < Decimal::ZERO || already_paid > total {
        return Err(BillingError::invalid_input(format!(
            "paid amount {} is outside the invoice total {}",
            already_paid, total
        )));
    }
    if amount <= Decimal::ZERO {
        return Err(BillingError::invalid_input("payment amount must be > 0"));
    }

    let outstanding = total - already_paid;
    if amount > outstanding {
        return Err(BillingError::invalid_input(format!(
            "payment of {} exceeds the outstanding balance {}",
            amount, outstanding
        )));
    }

    let paid_amount = already_paid + amount;
    let status = if paid_amount >= total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Partial
    };

    Ok(Settlement {
        paid_amount,
        outstanding: total - paid_amount,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn partial_then_full_payment() {
        let first = settle_payment(d(34100), d(0), d(10000)).unwrap();
        assert_eq!(first.status, PaymentStatus::Partial);
        assert_eq!(first.outstanding, d(24100));

        let second = settle_payment(d(34100), first.paid_amount, d(24100)).unwrap();
        assert_eq!(second.status, PaymentStatus::Paid);
        assert_eq!(second.outstanding, Decimal::ZERO);
    }

    #[test]
    fn overpayment_is_rejected() {
        let err = settle_payment(d(34100), d(30000), d(5000)).unwrap_err();
        assert!(err.to_string().contains("outstanding balance 4100"));
    }

    #[test]
    fn paid_invoice_accepts_no_more_payments() {
        assert!(settle_payment(d(2200), d(2200), d(1)).is_err());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        assert!(settle_payment(d(2200), d(0), d(0)).is_err());
        assert!(settle_payment(d(2200), d(0), d(-100)).is_err());
    }

    #[test]
    fn inconsistent_balance_is_rejected() {
        assert!(settle_payment(d(2200), d(3000), d(1)).is_err());
        assert!(settle_payment(d(-1), d(0), d(1)).is_err());
    }

    #[test]
    fn overdue_only_applies_to_unsettled_invoices() {
        let due = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        assert_eq!(PaymentStatus::Pending.for_due_date(due, after), PaymentStatus::Overdue);
        assert_eq!(PaymentStatus::Partial.for_due_date(due, after), PaymentStatus::Overdue);
        assert_eq!(PaymentStatus::Paid.for_due_date(due, after), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::Pending.for_due_date(due, due), PaymentStatus::Pending);
    }

    #[test]
    fn method_serializes_snake_case() {
        let json = serde_json::to_string(&PaymentMethod::MobileMoney).unwrap();
        assert_eq!(json, "\"mobile_money\"");
        assert_eq!(PaymentMethod::BankTransfer.as_str(), "bank_transfer");
    }
}
