//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Monetary amount in the smallest currency unit (e.g. cents / dong).
///
/// Prices, line totals and order totals are exact integers; there is no
/// floating-point accumulation anywhere in the workflow.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Build a non-negative amount (unit prices, costs).
    pub fn new(minor_units: i64) -> DomainResult<Self> {
        if minor_units < 0 {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        Ok(Self(minor_units))
    }

    pub fn minor_units(self) -> i64 {
        self.0
    }

    /// `self × quantity`, failing on overflow.
    pub fn times(self, quantity: i64) -> DomainResult<Money> {
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    /// Sum a sequence of amounts, failing on overflow.
    pub fn sum<I>(amounts: I) -> DomainResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
