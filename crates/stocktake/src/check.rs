use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockyard_core::{Aggregate, AggregateRoot, DomainError, WarehouseId, aggregate_id};
use stockyard_events::Event;
use stockyard_products::ProductId;

aggregate_id!(
    /// Inventory check identifier.
    InventoryCheckId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pending,
    Approved,
    Rejected,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pending => "PENDING",
            CheckStatus::Approved => "APPROVED",
            CheckStatus::Rejected => "REJECTED",
        }
    }
}

impl FromStr for CheckStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(CheckStatus::Pending),
            "APPROVED" => Ok(CheckStatus::Approved),
            "REJECTED" => Ok(CheckStatus::Rejected),
            _ => Err(DomainError::validation(format!("unknown check status '{s}'"))),
        }
    }
}

/// System quantity of one product at the moment the check was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub product_id: ProductId,
    pub system_qty: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckLine {
    pub product_id: ProductId,
    pub system_qty: i64,
    pub actual_qty: Option<i64>,
    pub note: Option<String>,
}

impl CheckLine {
    /// `actual_qty - system_qty`, or `None` while uncounted.
    ///
    /// Always derived; negative values mean shrinkage.
    pub fn difference(&self) -> Option<i64> {
        self.actual_qty.map(|actual| actual - self.system_qty)
    }

    pub fn is_counted(&self) -> bool {
        self.actual_qty.is_some()
    }
}

/// Aggregate root: InventoryCheck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryCheck {
    id: InventoryCheckId,
    code: String,
    reason: String,
    warehouse_id: Option<WarehouseId>,
    lines: Vec<CheckLine>,
    status: CheckStatus,
    rejection_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl InventoryCheck {
    pub fn empty(id: InventoryCheckId) -> Self {
        Self {
            id,
            code: String::new(),
            reason: String::new(),
            warehouse_id: None,
            lines: Vec::new(),
            status: CheckStatus::Pending,
            rejection_reason: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InventoryCheckId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn warehouse_id(&self) -> Option<WarehouseId> {
        self.warehouse_id
    }

    pub fn lines(&self) -> &[CheckLine] {
        &self.lines
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CheckLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for InventoryCheck {
    type Id = InventoryCheckId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateCheck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCheck {
    pub check_id: InventoryCheckId,
    pub code: String,
    pub reason: String,
    pub warehouse_id: WarehouseId,
    pub snapshot: Vec<SystemSnapshot>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordActual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordActual {
    pub check_id: InventoryCheckId,
    pub product_id: ProductId,
    pub actual_qty: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveCheck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveCheck {
    pub check_id: InventoryCheckId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectCheck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectCheck {
    pub check_id: InventoryCheckId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCheckCommand {
    CreateCheck(CreateCheck),
    RecordActual(RecordActual),
    ApproveCheck(ApproveCheck),
    RejectCheck(RejectCheck),
}

/// Event: CheckCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckCreated {
    pub check_id: InventoryCheckId,
    pub code: String,
    pub reason: String,
    pub warehouse_id: WarehouseId,
    pub snapshot: Vec<SystemSnapshot>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ActualRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualRecorded {
    pub check_id: InventoryCheckId,
    pub product_id: ProductId,
    pub actual_qty: i64,
    pub difference: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Stock correction produced by an approved check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAdjustment {
    pub product_id: ProductId,
    pub difference: i64,
}

/// Event: CheckApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckApproved {
    pub check_id: InventoryCheckId,
    /// One entry per line, in line order (zero differences included).
    pub adjustments: Vec<CheckAdjustment>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CheckRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRejected {
    pub check_id: InventoryCheckId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCheckEvent {
    CheckCreated(CheckCreated),
    ActualRecorded(ActualRecorded),
    CheckApproved(CheckApproved),
    CheckRejected(CheckRejected),
}

impl Event for InventoryCheckEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryCheckEvent::CheckCreated(_) => "stocktake.check.created",
            InventoryCheckEvent::ActualRecorded(_) => "stocktake.check.actual_recorded",
            InventoryCheckEvent::CheckApproved(_) => "stocktake.check.approved",
            InventoryCheckEvent::CheckRejected(_) => "stocktake.check.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryCheckEvent::CheckCreated(e) => e.occurred_at,
            InventoryCheckEvent::ActualRecorded(e) => e.occurred_at,
            InventoryCheckEvent::CheckApproved(e) => e.occurred_at,
            InventoryCheckEvent::CheckRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryCheck {
    type Command = InventoryCheckCommand;
    type Event = InventoryCheckEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryCheckEvent::CheckCreated(e) => {
                self.id = e.check_id;
                self.code = e.code.clone();
                self.reason = e.reason.clone();
                self.warehouse_id = Some(e.warehouse_id);
                self.lines = e
                    .snapshot
                    .iter()
                    .map(|s| CheckLine {
                        product_id: s.product_id,
                        system_qty: s.system_qty,
                        actual_qty: None,
                        note: None,
                    })
                    .collect();
                self.status = CheckStatus::Pending;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            InventoryCheckEvent::ActualRecorded(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == e.product_id) {
                    line.actual_qty = Some(e.actual_qty);
                    line.note = e.note.clone();
                }
            }
            InventoryCheckEvent::CheckApproved(_) => {
                self.status = CheckStatus::Approved;
            }
            InventoryCheckEvent::CheckRejected(e) => {
                self.status = CheckStatus::Rejected;
                self.rejection_reason = e.reason.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCheckCommand::CreateCheck(cmd) => self.handle_create(cmd),
            InventoryCheckCommand::RecordActual(cmd) => self.handle_record_actual(cmd),
            InventoryCheckCommand::ApproveCheck(cmd) => self.handle_approve(cmd),
            InventoryCheckCommand::RejectCheck(cmd) => self.handle_reject(cmd),
        }
    }
}

impl InventoryCheck {
    fn ensure_check_id(&self, check_id: InventoryCheckId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("inventory check {check_id}")));
        }
        if self.id != check_id {
            return Err(DomainError::invariant("check_id mismatch"));
        }
        Ok(())
    }

    fn ensure_pending(&self, action: &'static str) -> Result<(), DomainError> {
        if self.status == CheckStatus::Pending {
            return Ok(());
        }
        Err(DomainError::InvalidTransition {
            entity: "inventory check",
            id: self.id.0,
            from: self.status.as_str(),
            action,
        })
    }

    fn handle_create(&self, cmd: &CreateCheck) -> Result<Vec<InventoryCheckEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("inventory check already exists"));
        }
        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("check code cannot be empty"));
        }
        if cmd.snapshot.is_empty() {
            return Err(DomainError::validation("inventory check needs at least one product"));
        }
        for (i, s) in cmd.snapshot.iter().enumerate() {
            if cmd.snapshot[..i].iter().any(|p| p.product_id == s.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} listed twice",
                    s.product_id
                )));
            }
            if s.system_qty < 0 {
                return Err(DomainError::invariant(format!(
                    "negative system quantity for product {}",
                    s.product_id
                )));
            }
        }

        Ok(vec![InventoryCheckEvent::CheckCreated(CheckCreated {
            check_id: cmd.check_id,
            code: cmd.code.clone(),
            reason: cmd.reason.clone(),
            warehouse_id: cmd.warehouse_id,
            snapshot: cmd.snapshot.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_actual(
        &self,
        cmd: &RecordActual,
    ) -> Result<Vec<InventoryCheckEvent>, DomainError> {
        self.ensure_check_id(cmd.check_id)?;
        self.ensure_pending("record a count on")?;

        let (line_index, line) = self
            .lines
            .iter()
            .enumerate()
            .find(|(_, l)| l.product_id == cmd.product_id)
            .ok_or(DomainError::UnknownLineItem {
                id: self.id.0,
                product_id: cmd.product_id.0,
            })?;
        if cmd.actual_qty < 0 {
            return Err(DomainError::InvalidQuantity {
                line_index,
                quantity: cmd.actual_qty,
            });
        }

        Ok(vec![InventoryCheckEvent::ActualRecorded(ActualRecorded {
            check_id: cmd.check_id,
            product_id: cmd.product_id,
            actual_qty: cmd.actual_qty,
            difference: cmd.actual_qty - line.system_qty,
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveCheck) -> Result<Vec<InventoryCheckEvent>, DomainError> {
        self.ensure_check_id(cmd.check_id)?;
        self.ensure_pending("approve")?;

        let missing: Vec<_> = self
            .lines
            .iter()
            .filter(|l| !l.is_counted())
            .map(|l| l.product_id.0)
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::IncompleteCheck {
                check_id: self.id.0,
                missing,
            });
        }

        let adjustments = self
            .lines
            .iter()
            .filter_map(|l| {
                l.difference().map(|difference| CheckAdjustment {
                    product_id: l.product_id,
                    difference,
                })
            })
            .collect();

        Ok(vec![InventoryCheckEvent::CheckApproved(CheckApproved {
            check_id: cmd.check_id,
            adjustments,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectCheck) -> Result<Vec<InventoryCheckEvent>, DomainError> {
        self.ensure_check_id(cmd.check_id)?;
        self.ensure_pending("reject")?;

        Ok(vec![InventoryCheckEvent::CheckRejected(CheckRejected {
            check_id: cmd.check_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
