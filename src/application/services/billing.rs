//! Billing service for quoting, billing readings and settling payments

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::application::events::{
    BillCalculatedEvent, Event, PaymentSettledEvent, RateScheduleUpdatedEvent, SharedEventBus,
};
use crate::config::BillingSettings;
use crate::domain::{
    settle_payment, BillingInput, BillingResult, ConnectionType, DomainError, DomainResult,
    MeterReading, PaymentMethod, RateTableRepository, RateTier, Settlement, TieredBillCalculator,
};
use crate::shared::errors::BillingError;

pub struct BillingService {
    rates: Arc<dyn RateTableRepository>,
    event_bus: SharedEventBus,
    calculator: TieredBillCalculator,
    settings: BillingSettings,
}

impl BillingService {
    pub fn new(
        rates: Arc<dyn RateTableRepository>,
        event_bus: SharedEventBus,
        settings: BillingSettings,
    ) -> Self {
        Self {
            rates,
            event_bus,
            calculator: TieredBillCalculator::with_minor_units(settings.minor_units),
            settings,
        }
    }

    pub fn settings(&self) -> &BillingSettings {
        &self.settings
    }

    /// Price `consumption` against the active schedule without billing
    /// anything.
    pub async fn quote(
        &self,
        consumption: Decimal,
        connection_type: ConnectionType,
    ) -> DomainResult<BillingResult> {
        let input = BillingInput::new(
            consumption,
            connection_type,
            self.settings.base_charge,
            self.settings.tax_rate,
        );
        self.calculate(&input).await
    }

    /// Bill an approved reading and publish [`Event::BillCalculated`].
    pub async fn bill_reading(
        &self,
        reading: &MeterReading,
        connection_type: ConnectionType,
    ) -> DomainResult<BillingResult> {
        if !reading.is_billable() {
            warn!(reading_id = %reading.id, status = %reading.status, "Refusing to bill unapproved reading");
            return Err(DomainError::Validation(format!(
                "reading {} is {}, only approved readings can be billed",
                reading.id, reading.status
            )));
        }

        let consumption = reading
            .consumption()
            .map_err(|e| self.billing_failed(e, connection_type))?;
        let result = self.quote(consumption, connection_type).await?;

        info!(
            reading_id = %reading.id,
            customer_id = %reading.customer_id,
            %connection_type,
            %consumption,
            total = %result.total_amount,
            "Bill calculated"
        );

        self.event_bus.publish(Event::BillCalculated(BillCalculatedEvent {
            reading_id: reading.id.clone(),
            customer_id: reading.customer_id.clone(),
            connection_type,
            consumption,
            consumption_charge: result.consumption_charge,
            tax_amount: result.tax_amount,
            total_amount: result.total_amount,
            currency: self.settings.currency.clone(),
            timestamp: Utc::now(),
        }));

        Ok(result)
    }

    pub async fn rate_table(&self) -> DomainResult<Vec<RateTier>> {
        self.rates.find_all().await
    }

    /// Swap the active schedule of one connection type. An invalid table is
    /// rejected and the previous one stays active.
    pub async fn update_rates(
        &self,
        connection_type: ConnectionType,
        tiers: Vec<RateTier>,
    ) -> DomainResult<Vec<RateTier>> {
        let stored = match self.rates.replace_schedule(connection_type, tiers).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(%connection_type, error = %e, "Rate schedule rejected");
                return Err(e);
            }
        };

        info!(%connection_type, tiers = stored.len(), "Rate schedule replaced");
        self.event_bus
            .publish(Event::RateScheduleUpdated(RateScheduleUpdatedEvent {
                connection_type,
                tier_count: stored.len(),
                timestamp: Utc::now(),
            }));

        Ok(stored)
    }

    /// Apply a payment to an invoice and publish [`Event::PaymentSettled`].
    pub async fn record_payment(
        &self,
        invoice_id: &str,
        total: Decimal,
        already_paid: Decimal,
        amount: Decimal,
        method: PaymentMethod,
    ) -> DomainResult<Settlement> {
        let settlement = settle_payment(total, already_paid, amount).map_err(|e| {
            metrics::counter!("billing_errors_total", "kind" => e.kind()).increment(1);
            warn!(invoice_id, %amount, error = %e, "Payment rejected");
            DomainError::from(e)
        })?;

        info!(
            invoice_id,
            %amount,
            method = method.as_str(),
            status = settlement.status.as_str(),
            outstanding = %settlement.outstanding,
            "Payment recorded"
        );

        self.event_bus.publish(Event::PaymentSettled(PaymentSettledEvent {
            invoice_id: invoice_id.to_string(),
            amount,
            method,
            paid_amount: settlement.paid_amount,
            outstanding: settlement.outstanding,
            status: settlement.status,
            currency: self.settings.currency.clone(),
            timestamp: Utc::now(),
        }));

        Ok(settlement)
    }

    async fn calculate(&self, input: &BillingInput) -> DomainResult<BillingResult> {
        let tiers = self.rates.find_by_connection(input.connection_type).await?;
        let result = self
            .calculator
            .calculate(input, &tiers)
            .map_err(|e| self.billing_failed(e, input.connection_type))?;

        let connection_type = input.connection_type.as_str();
        metrics::counter!("bills_calculated_total", "connection_type" => connection_type)
            .increment(1);
        metrics::histogram!("bill_amount", "connection_type" => connection_type)
            .record(result.total_amount.to_f64().unwrap_or_default());

        Ok(result)
    }

    fn billing_failed(&self, err: BillingError, connection_type: ConnectionType) -> DomainError {
        metrics::counter!("billing_errors_total", "kind" => err.kind()).increment(1);
        warn!(%connection_type, kind = err.kind(), error = %err, "Bill calculation failed");
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;

    use super::*;
    use crate::application::events::{create_event_bus, EventSubscriber};
    use crate::domain::PaymentStatus;
    use crate::infrastructure::InMemoryRateTableRepository;

    const RES: ConnectionType = ConnectionType::Residential;

    fn service_with(tiers: Vec<RateTier>) -> (BillingService, EventSubscriber) {
        let repo = InMemoryRateTableRepository::from_tiers(tiers).unwrap();
        let bus = create_event_bus();
        let subscriber = bus.subscribe();
        let service = BillingService::new(Arc::new(repo), bus, BillingSettings::default());
        (service, subscriber)
    }

    fn residential_service() -> (BillingService, EventSubscriber) {
        service_with(RateTier::standard_table(RES))
    }

    fn reading(previous: i64, current: i64) -> MeterReading {
        MeterReading::new(
            "R-17",
            "C-4",
            "M-0042",
            previous,
            current,
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    async fn assert_no_event(subscriber: &mut EventSubscriber) {
        let next = tokio::time::timeout(Duration::from_millis(50), subscriber.recv()).await;
        assert!(next.is_err(), "unexpected event: {:?}", next);
    }

    #[tokio::test]
    async fn quote_uses_configured_charges() {
        let (service, _sub) = residential_service();
        let result = service.quote(Decimal::from(25), RES).await.unwrap();
        assert_eq!(result.consumption_charge, Decimal::from(29000));
        assert_eq!(result.tax_amount, Decimal::from(3100));
        assert_eq!(result.total_amount, Decimal::from(34100));
        assert_eq!(result.format_total(&service.settings().currency), "TZS 34,100");
    }

    #[tokio::test]
    async fn quote_for_unconfigured_connection_type_fails() {
        let (service, _sub) = residential_service();
        let err = service
            .quote(Decimal::from(25), ConnectionType::Commercial)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Billing(BillingError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn bill_reading_publishes_event() {
        let (service, mut sub) = residential_service();
        let mut r = reading(1200, 1225);
        r.approve().unwrap();

        let result = service.bill_reading(&r, RES).await.unwrap();
        assert_eq!(result.total_amount, Decimal::from(34100));

        let message = sub.recv().await.unwrap();
        assert_eq!(message.event.customer_id(), Some("C-4"));
        match message.event {
            Event::BillCalculated(e) => {
                assert_eq!(e.reading_id, "R-17");
                assert_eq!(e.consumption, Decimal::from(25));
                assert_eq!(e.total_amount, Decimal::from(34100));
                assert_eq!(e.currency, "TZS");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn pending_reading_is_not_billed() {
        let (service, mut sub) = residential_service();
        let err = service.bill_reading(&reading(0, 10), RES).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_no_event(&mut sub).await;
    }

    #[tokio::test]
    async fn meter_rollback_is_invalid_input() {
        let (service, mut sub) = residential_service();
        let mut r = reading(500, 450);
        r.approve().unwrap();

        let err = service.bill_reading(&r, RES).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Billing(BillingError::InvalidInput(_))
        ));
        assert_no_event(&mut sub).await;
    }

    #[tokio::test]
    async fn update_rates_changes_quotes() {
        let (service, mut sub) = residential_service();
        let flat = vec![RateTier::unbounded(RES, 0, 1000)];

        service.update_rates(RES, flat).await.unwrap();
        let message = sub.recv().await.unwrap();
        assert_eq!(message.event.event_type(), "rate_schedule_updated");

        let result = service.quote(Decimal::from(25), RES).await.unwrap();
        assert_eq!(result.consumption_charge, Decimal::from(25000));
        assert_eq!(service.rate_table().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_rate_update_keeps_previous_schedule() {
        let (service, mut sub) = residential_service();
        let gapped = vec![
            RateTier::bounded(RES, 0, 10, 800),
            RateTier::unbounded(RES, 20, 1200),
        ];

        assert!(service.update_rates(RES, gapped).await.is_err());
        assert_no_event(&mut sub).await;

        let result = service.quote(Decimal::from(25), RES).await.unwrap();
        assert_eq!(result.total_amount, Decimal::from(34100));
    }

    #[tokio::test]
    async fn record_payment_settles_and_publishes() {
        let (service, mut sub) = residential_service();
        let settlement = service
            .record_payment(
                "INV-2024-03-017",
                Decimal::from(34100),
                Decimal::from(4100),
                Decimal::from(10000),
                PaymentMethod::MobileMoney,
            )
            .await
            .unwrap();
        assert_eq!(settlement.status, PaymentStatus::Partial);
        assert_eq!(settlement.outstanding, Decimal::from(20000));

        match sub.recv().await.unwrap().event {
            Event::PaymentSettled(e) => {
                assert_eq!(e.invoice_id, "INV-2024-03-017");
                assert_eq!(e.method, PaymentMethod::MobileMoney);
                assert_eq!(e.status, PaymentStatus::Partial);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn overpayment_is_rejected() {
        let (service, mut sub) = residential_service();
        let err = service
            .record_payment(
                "INV-1",
                Decimal::from(2200),
                Decimal::ZERO,
                Decimal::from(5000),
                PaymentMethod::Cash,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Billing(BillingError::InvalidInput(_))
        ));
        assert_no_event(&mut sub).await;
    }
}
