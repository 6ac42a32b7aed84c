//! Import lot domain module.
//!
//! A lot is the stock received by one inbound event. Lots track how much of the
//! receipt is still on the shelf so that every export can be attributed to the
//! lot (and cost) it came from.

pub mod lot;
pub mod selection;

pub use lot::{
    ImportLot, ImportLotId, LotCommand, LotEvent, LotReceived, LotReserved, LotReturned,
    ReceiveLot, ReserveFromLot, ReturnToLot,
};
pub use selection::available_in_fifo_order;
