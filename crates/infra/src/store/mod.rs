//! Persistence boundary: repositories and an atomic unit of work.
//!
//! Services load aggregates through [`Repository`], decide and apply events in
//! memory, then write every touched aggregate plus the resulting events in a
//! single [`UnitOfWork::commit`]. Each staged write carries an
//! [`ExpectedVersion`](stockyard_core::ExpectedVersion), which turns lot
//! depletion into a compare-and-set.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use r#trait::{Changeset, Repository, Staged, Store, StoreError, StoredAggregate, UnitOfWork};
