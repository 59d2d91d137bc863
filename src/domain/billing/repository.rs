//! Rate table repository interface

use async_trait::async_trait;

use super::model::{ConnectionType, RateTier};
use crate::domain::DomainResult;

/// Source of the active rate table.
///
/// Implementations must only store schedules that pass
/// [`RateSchedule`](super::RateSchedule) validation, so readers can rely on
/// `find_by_connection` returning a contiguous table or nothing.
#[async_trait]
pub trait RateTableRepository: Send + Sync {
    /// Active tiers of one connection type, sorted by `min_consumption`.
    async fn find_by_connection(&self, connection_type: ConnectionType)
        -> DomainResult<Vec<RateTier>>;

    /// Every active tier across all connection types.
    async fn find_all(&self) -> DomainResult<Vec<RateTier>>;

    /// Atomically swap the schedule of one connection type.
    async fn replace_schedule(
        &self,
        connection_type: ConnectionType,
        tiers: Vec<RateTier>,
    ) -> DomainResult<Vec<RateTier>>;
}
