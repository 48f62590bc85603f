//! Bonus policy: how many points a trip earns and what a cancellation returns.
//!
//! Pure arithmetic over `Decimal`. Callers pass the client's finished-order
//! count so tiered rules can be added here without touching the lifecycle code.

use rust_decimal::{Decimal, dec};
use tracing::debug;

use crate::domain::{DomainError, Order};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusPolicy {
    earn_rate: Decimal,
    cancellation_rate: Decimal,
}

impl Default for BonusPolicy {
    /// 5% of the price on finish, 1% of the price back on a loyal cancellation.
    fn default() -> Self {
        Self {
            earn_rate: dec!(0.05),
            cancellation_rate: dec!(0.01),
        }
    }
}

impl BonusPolicy {
    pub fn new(earn_rate: Decimal, cancellation_rate: Decimal) -> Result<Self, DomainError> {
        if earn_rate < Decimal::ZERO || cancellation_rate < Decimal::ZERO {
            return Err(DomainError::InvalidAmount);
        }
        Ok(Self {
            earn_rate,
            cancellation_rate,
        })
    }

    /// Points credited when a trip finishes.
    pub fn bonus_earned(
        &self,
        price: Decimal,
        _finished_orders: usize,
    ) -> Result<Decimal, DomainError> {
        price
            .checked_mul(self.earn_rate)
            .ok_or(DomainError::AmountOverflow)
    }

    /// Points credited when an order is cancelled.
    ///
    /// Clients with no finished trip get nothing back; clients with at least
    /// one get `price * cancellation_rate` (1.5 for a price of 150 with the
    /// default rate).
    pub fn cancellation_adjustment(
        &self,
        order: &Order,
        finished_orders: usize,
    ) -> Result<Decimal, DomainError> {
        if finished_orders == 0 {
            debug!(order = %order.id, "first-time client, no cancellation refund");
            return Ok(Decimal::ZERO);
        }
        order
            .price
            .checked_mul(self.cancellation_rate)
            .ok_or(DomainError::AmountOverflow)
    }
}
