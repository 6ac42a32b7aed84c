//! Movement order domain module.
//!
//! One state machine for every document that moves stock: supplier imports,
//! import orders and internal exports. The aggregate only decides status
//! transitions; the lot and product effects of a transition are applied by the
//! movement service in `stockyard-infra` within the same unit of work.

pub mod order;
pub mod status;

pub use order::{
    ApproveOrder, CancelOrder, ConfirmOrder, CreateMovementOrder, MarkReturned, MovementLine,
    MovementOrder, MovementOrderApproved, MovementOrderCancelled, MovementOrderCommand,
    MovementOrderCreated, MovementOrderEvent, MovementOrderFulfilled, MovementOrderId,
    MovementOrderRejected, MovementOrderReturned, NewMovementLine, RejectOrder,
};
pub use status::{Direction, MovementAction, MovementKind, MovementStatus};
