use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{Aggregate, AggregateRoot, DomainError, DomainResult, TableId};
use larder_events::Event;

/// Table status.
///
/// `Available ↔ Reserved ↔ Occupied`; only an available table can be taken
/// out of service, and it comes back as available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Reserved,
    Occupied,
    OutOfService,
}

impl TableStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TableStatus::Available => "available",
            TableStatus::Reserved => "reserved",
            TableStatus::Occupied => "occupied",
            TableStatus::OutOfService => "out_of_service",
        }
    }
}

/// Aggregate root: Table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    id: TableId,
    number: u32,
    seats: u32,
    status: TableStatus,
    version: u64,
    created: bool,
}

impl Table {
    pub fn empty(id: TableId) -> Self {
        Self {
            id,
            number: 0,
            seats: 0,
            status: TableStatus::Available,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> TableId {
        self.id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn seats(&self) -> u32 {
        self.seats
    }

    pub fn status(&self) -> TableStatus {
        self.status
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Table {
    type Id = TableId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Reject a table number already used by another table.
pub fn ensure_number_free<'a>(
    existing: impl IntoIterator<Item = &'a Table>,
    number: u32,
) -> DomainResult<()> {
    if existing
        .into_iter()
        .any(|t| t.created && t.number == number)
    {
        return Err(DomainError::conflict(format!("table number {number} is taken")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTable {
    pub table_id: TableId,
    pub number: u32,
    pub seats: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveTable {
    pub table_id: TableId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupyTable {
    pub table_id: TableId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTable {
    pub table_id: TableId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOutOfService {
    pub table_id: TableId,
    pub out_of_service: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableCommand {
    CreateTable(CreateTable),
    ReserveTable(ReserveTable),
    OccupyTable(OccupyTable),
    ReleaseTable(ReleaseTable),
    SetOutOfService(SetOutOfService),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCreated {
    pub table_id: TableId,
    pub number: u32,
    pub seats: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatusChanged {
    pub table_id: TableId,
    pub from: TableStatus,
    pub to: TableStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableEvent {
    TableCreated(TableCreated),
    TableStatusChanged(TableStatusChanged),
}

impl Event for TableEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TableEvent::TableCreated(_) => "dining.table.created",
            TableEvent::TableStatusChanged(_) => "dining.table.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TableEvent::TableCreated(e) => e.occurred_at,
            TableEvent::TableStatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Table {
    type Command = TableCommand;
    type Event = TableEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TableEvent::TableCreated(e) => {
                self.id = e.table_id;
                self.number = e.number;
                self.seats = e.seats;
                self.status = TableStatus::Available;
                self.created = true;
            }
            TableEvent::TableStatusChanged(e) => {
                self.status = e.to;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TableCommand::CreateTable(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("table already exists"));
                }
                if cmd.number == 0 {
                    return Err(DomainError::validation("table number must be positive"));
                }
                if cmd.seats == 0 {
                    return Err(DomainError::validation("a table needs at least one seat"));
                }
                Ok(vec![TableEvent::TableCreated(TableCreated {
                    table_id: cmd.table_id,
                    number: cmd.number,
                    seats: cmd.seats,
                    occurred_at: cmd.occurred_at,
                })])
            }
            TableCommand::ReserveTable(cmd) => self.transition(
                cmd.table_id,
                &[TableStatus::Available],
                TableStatus::Reserved,
                cmd.occurred_at,
            ),
            TableCommand::OccupyTable(cmd) => self.transition(
                cmd.table_id,
                &[TableStatus::Available, TableStatus::Reserved],
                TableStatus::Occupied,
                cmd.occurred_at,
            ),
            TableCommand::ReleaseTable(cmd) => self.transition(
                cmd.table_id,
                &[TableStatus::Reserved, TableStatus::Occupied],
                TableStatus::Available,
                cmd.occurred_at,
            ),
            TableCommand::SetOutOfService(cmd) if cmd.out_of_service => self.transition(
                cmd.table_id,
                &[TableStatus::Available],
                TableStatus::OutOfService,
                cmd.occurred_at,
            ),
            TableCommand::SetOutOfService(cmd) => self.transition(
                cmd.table_id,
                &[TableStatus::OutOfService],
                TableStatus::Available,
                cmd.occurred_at,
            ),
        }
    }
}

impl Table {
    fn transition(
        &self,
        table_id: TableId,
        allowed_from: &[TableStatus],
        to: TableStatus,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<TableEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("table {table_id}")));
        }
        if self.id != table_id {
            return Err(DomainError::invariant("table_id mismatch"));
        }
        if !allowed_from.contains(&self.status) {
            return Err(DomainError::invariant(format!(
                "table {} cannot go from {} to {}",
                self.number,
                self.status.as_str(),
                to.as_str()
            )));
        }

        Ok(vec![TableEvent::TableStatusChanged(TableStatusChanged {
            table_id,
            from: self.status,
            to,
            occurred_at,
        })])
    }
}
