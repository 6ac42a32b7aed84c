//! Human-readable document codes (`PN-20240301-0007`).

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;

use stockyard_movements::MovementKind;

use crate::config::CodePrefixes;

/// What a code is being generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Movement(MovementKind),
    InventoryCheck,
}

/// Issues unique codes of the form `{prefix}-{YYYYMMDD}-{seq:04}`.
///
/// The sequence is process-wide and never resets, so codes stay unique even
/// when the date rolls over mid-run. Uniqueness across restarts is enforced by
/// the store.
#[derive(Debug)]
pub struct CodeGenerator {
    prefixes: CodePrefixes,
    next: AtomicU64,
}

impl CodeGenerator {
    pub fn new(prefixes: CodePrefixes) -> Self {
        Self {
            prefixes,
            next: AtomicU64::new(1),
        }
    }

    pub fn prefix(&self, kind: CodeKind) -> &str {
        match kind {
            CodeKind::Movement(MovementKind::SupplierImport) => &self.prefixes.import,
            CodeKind::Movement(MovementKind::InternalExport) => &self.prefixes.export,
            CodeKind::Movement(MovementKind::ImportOrder) => &self.prefixes.order,
            CodeKind::InventoryCheck => &self.prefixes.check,
        }
    }

    pub fn next(&self, kind: CodeKind, date: NaiveDate) -> String {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{seq:04}", self.prefix(kind), date.format("%Y%m%d"))
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(CodePrefixes::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_carry_prefix_date_and_sequence() {
        let codes = CodeGenerator::default();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        assert_eq!(
            codes.next(CodeKind::Movement(MovementKind::SupplierImport), day),
            "PN-20240301-0001"
        );
        assert_eq!(codes.next(CodeKind::InventoryCheck, day), "KK-20240301-0002");
    }

    #[test]
    fn every_movement_kind_has_its_own_prefix() {
        let codes = CodeGenerator::default();
        assert_eq!(codes.prefix(CodeKind::Movement(MovementKind::InternalExport)), "PX");
        assert_eq!(codes.prefix(CodeKind::Movement(MovementKind::ImportOrder)), "DH");
    }
}
