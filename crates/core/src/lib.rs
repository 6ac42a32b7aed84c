//! `stockyard-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the warehouse
//! modules (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, CategoryId, PartyId, WarehouseId};
pub use value_object::{Money, ValueObject};
