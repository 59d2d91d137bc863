//! In-memory rate table

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{
    ConnectionType, DomainError, DomainResult, RateSchedule, RateTableRepository, RateTier,
};

/// Rate table held in memory, one validated schedule per connection type
pub struct InMemoryRateTableRepository {
    schedules: DashMap<ConnectionType, Vec<RateTier>>,
}

impl InMemoryRateTableRepository {
    pub fn new() -> Self {
        Self {
            schedules: DashMap::new(),
        }
    }

    /// Seed from a mixed table; every connection type present must validate.
    pub fn from_tiers(tiers: Vec<RateTier>) -> DomainResult<Self> {
        let mut grouped: BTreeMap<ConnectionType, Vec<RateTier>> = BTreeMap::new();
        for tier in tiers {
            grouped.entry(tier.connection_type).or_default().push(tier);
        }

        let repo = Self::new();
        for (connection_type, tiers) in grouped {
            let schedule = RateSchedule::for_connection(&tiers, connection_type)?;
            repo.schedules.insert(connection_type, schedule.into_tiers());
        }
        Ok(repo)
    }

    pub fn from_config(config: &AppConfig) -> DomainResult<Self> {
        let repo = Self::from_tiers(config.rates.clone())?;
        info!(
            connection_types = repo.schedules.len(),
            "Rate table loaded from configuration"
        );
        Ok(repo)
    }
}

impl Default for InMemoryRateTableRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateTableRepository for InMemoryRateTableRepository {
    async fn find_by_connection(
        &self,
        connection_type: ConnectionType,
    ) -> DomainResult<Vec<RateTier>> {
        Ok(self
            .schedules
            .get(&connection_type)
            .map(|tiers| tiers.value().clone())
            .unwrap_or_default())
    }

    async fn find_all(&self) -> DomainResult<Vec<RateTier>> {
        let mut all = Vec::new();
        for connection_type in ConnectionType::ALL {
            if let Some(tiers) = self.schedules.get(&connection_type) {
                all.extend(tiers.value().iter().cloned());
            }
        }
        Ok(all)
    }

    async fn replace_schedule(
        &self,
        connection_type: ConnectionType,
        tiers: Vec<RateTier>,
    ) -> DomainResult<Vec<RateTier>> {
        if let Some(foreign) = tiers.iter().find(|t| t.connection_type != connection_type) {
            return Err(DomainError::Validation(format!(
                "tier {} belongs to {} connections, not {}",
                foreign.label(),
                foreign.connection_type,
                connection_type
            )));
        }

        let schedule = RateSchedule::for_connection(&tiers, connection_type)?;
        let tiers = schedule.into_tiers();
        self.schedules.insert(connection_type, tiers.clone());
        Ok(tiers)
    }
}
