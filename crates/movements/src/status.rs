//! Kinds, statuses and the transition table for movement orders.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockyard_core::DomainError;

/// Which way stock moves when an order is fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Goods enter the warehouse and open new lots.
    Inbound,
    /// Goods leave the warehouse from operator-selected lots.
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    SupplierImport,
    InternalExport,
    ImportOrder,
}

impl MovementKind {
    pub fn direction(self) -> Direction {
        match self {
            MovementKind::SupplierImport | MovementKind::ImportOrder => Direction::Inbound,
            MovementKind::InternalExport => Direction::Outbound,
        }
    }

    /// Status reached when the order is fulfilled.
    pub fn fulfilled_status(self) -> MovementStatus {
        match self.direction() {
            Direction::Inbound => MovementStatus::Imported,
            Direction::Outbound => MovementStatus::Exported,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::SupplierImport => "SUPPLIER_IMPORT",
            MovementKind::InternalExport => "INTERNAL_EXPORT",
            MovementKind::ImportOrder => "IMPORT_ORDER",
        }
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    /// Accepts any casing ("supplier_import", "SUPPLIER_IMPORT").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUPPLIER_IMPORT" => Ok(MovementKind::SupplierImport),
            "INTERNAL_EXPORT" => Ok(MovementKind::InternalExport),
            "IMPORT_ORDER" => Ok(MovementKind::ImportOrder),
            other => Err(DomainError::validation(format!("unknown movement kind '{other}'"))),
        }
    }
}

/// Canonical movement order status.
///
/// Screens historically used both lowercase and uppercase spellings; there is
/// only one status set, and parsing accepts either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Imported,
    Exported,
    Returned,
}

impl MovementStatus {
    pub const ALL: [MovementStatus; 7] = [
        MovementStatus::Pending,
        MovementStatus::Approved,
        MovementStatus::Rejected,
        MovementStatus::Cancelled,
        MovementStatus::Imported,
        MovementStatus::Exported,
        MovementStatus::Returned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MovementStatus::Pending => "PENDING",
            MovementStatus::Approved => "APPROVED",
            MovementStatus::Rejected => "REJECTED",
            MovementStatus::Cancelled => "CANCELLED",
            MovementStatus::Imported => "IMPORTED",
            MovementStatus::Exported => "EXPORTED",
            MovementStatus::Returned => "RETURNED",
        }
    }

    pub fn is_fulfilled(self) -> bool {
        matches!(self, MovementStatus::Imported | MovementStatus::Exported)
    }

    /// Whether `action` is legal from this status.
    pub fn allows(self, action: MovementAction) -> bool {
        use MovementAction::*;
        use MovementStatus::*;

        match (self, action) {
            (Pending, Approve | Confirm | Cancel | Reject) => true,
            (Approved, Confirm | Reject) => true,
            (Imported | Exported, MarkReturned) => true,
            _ => false,
        }
    }

    pub fn legal_actions(self) -> Vec<MovementAction> {
        MovementAction::ALL
            .into_iter()
            .filter(|a| self.allows(*a))
            .collect()
    }
}

impl FromStr for MovementStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        MovementStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == upper)
            .ok_or_else(|| DomainError::validation(format!("unknown movement status '{s}'")))
    }
}

impl core::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-triggered transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementAction {
    Approve,
    Confirm,
    Cancel,
    Reject,
    MarkReturned,
}

impl MovementAction {
    pub const ALL: [MovementAction; 5] = [
        MovementAction::Approve,
        MovementAction::Confirm,
        MovementAction::Cancel,
        MovementAction::Reject,
        MovementAction::MarkReturned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MovementAction::Approve => "approve",
            MovementAction::Confirm => "confirm",
            MovementAction::Cancel => "cancel",
            MovementAction::Reject => "reject",
            MovementAction::MarkReturned => "mark returned",
        }
    }
}
