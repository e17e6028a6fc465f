use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{Aggregate, AggregateRoot, DomainError, DomainResult, ReservationId, TableId, UserId};
use larder_events::Event;

use crate::table::{OccupyTable, Table, TableCommand};

/// Reservation status lifecycle: `Pending → Confirmed → Seated | Cancelled | NoShow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Seated,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    pub fn is_final(self) -> bool {
        matches!(
            self,
            ReservationStatus::Seated | ReservationStatus::Cancelled | ReservationStatus::NoShow
        )
    }
}

/// Aggregate root: Reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    id: ReservationId,
    user_id: Option<UserId>,
    table_id: Option<TableId>,
    reserved_for: Option<DateTime<Utc>>,
    party_size: u32,
    status: ReservationStatus,
    version: u64,
    created: bool,
}

impl Reservation {
    pub fn empty(id: ReservationId) -> Self {
        Self {
            id,
            user_id: None,
            table_id: None,
            reserved_for: None,
            party_size: 0,
            status: ReservationStatus::Pending,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ReservationId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn table_id(&self) -> Option<TableId> {
        self.table_id
    }

    pub fn reserved_for(&self) -> Option<DateTime<Utc>> {
        self.reserved_for
    }

    pub fn party_size(&self) -> u32 {
        self.party_size
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Reservation {
    type Id = ReservationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateReservation.
///
/// `table_seats` is the table's capacity when the caller has the table at
/// hand; the party must fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReservation {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub table_id: TableId,
    pub reserved_for: DateTime<Utc>,
    pub party_size: u32,
    pub table_seats: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmReservation {
    pub reservation_id: ReservationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatReservation {
    pub reservation_id: ReservationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReservation {
    pub reservation_id: ReservationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkNoShow {
    pub reservation_id: ReservationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationCommand {
    CreateReservation(CreateReservation),
    ConfirmReservation(ConfirmReservation),
    SeatReservation(SeatReservation),
    CancelReservation(CancelReservation),
    MarkNoShow(MarkNoShow),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationCreated {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub table_id: TableId,
    pub reserved_for: DateTime<Utc>,
    pub party_size: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationConfirmed {
    pub reservation_id: ReservationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSeated {
    pub reservation_id: ReservationId,
    pub table_id: TableId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationCancelled {
    pub reservation_id: ReservationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationNoShow {
    pub reservation_id: ReservationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationEvent {
    ReservationCreated(ReservationCreated),
    ReservationConfirmed(ReservationConfirmed),
    ReservationSeated(ReservationSeated),
    ReservationCancelled(ReservationCancelled),
    ReservationNoShow(ReservationNoShow),
}

impl Event for ReservationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReservationEvent::ReservationCreated(_) => "dining.reservation.created",
            ReservationEvent::ReservationConfirmed(_) => "dining.reservation.confirmed",
            ReservationEvent::ReservationSeated(_) => "dining.reservation.seated",
            ReservationEvent::ReservationCancelled(_) => "dining.reservation.cancelled",
            ReservationEvent::ReservationNoShow(_) => "dining.reservation.no_show",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReservationEvent::ReservationCreated(e) => e.occurred_at,
            ReservationEvent::ReservationConfirmed(e) => e.occurred_at,
            ReservationEvent::ReservationSeated(e) => e.occurred_at,
            ReservationEvent::ReservationCancelled(e) => e.occurred_at,
            ReservationEvent::ReservationNoShow(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Reservation {
    type Command = ReservationCommand;
    type Event = ReservationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReservationEvent::ReservationCreated(e) => {
                self.id = e.reservation_id;
                self.user_id = Some(e.user_id);
                self.table_id = Some(e.table_id);
                self.reserved_for = Some(e.reserved_for);
                self.party_size = e.party_size;
                self.status = ReservationStatus::Pending;
                self.created = true;
            }
            ReservationEvent::ReservationConfirmed(_) => {
                self.status = ReservationStatus::Confirmed;
            }
            ReservationEvent::ReservationSeated(_) => {
                self.status = ReservationStatus::Seated;
            }
            ReservationEvent::ReservationCancelled(_) => {
                self.status = ReservationStatus::Cancelled;
            }
            ReservationEvent::ReservationNoShow(_) => {
                self.status = ReservationStatus::NoShow;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ReservationCommand::CreateReservation(cmd) => self.handle_create(cmd),
            ReservationCommand::ConfirmReservation(cmd) => {
                self.ensure_status(cmd.reservation_id, &[ReservationStatus::Pending], "confirmed")?;
                Ok(vec![ReservationEvent::ReservationConfirmed(ReservationConfirmed {
                    reservation_id: cmd.reservation_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ReservationCommand::SeatReservation(cmd) => {
                self.ensure_status(cmd.reservation_id, &[ReservationStatus::Confirmed], "seated")?;
                let table_id = self
                    .table_id
                    .ok_or_else(|| DomainError::invariant("reservation has no table"))?;
                Ok(vec![ReservationEvent::ReservationSeated(ReservationSeated {
                    reservation_id: cmd.reservation_id,
                    table_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ReservationCommand::CancelReservation(cmd) => {
                self.ensure_status(
                    cmd.reservation_id,
                    &[ReservationStatus::Pending, ReservationStatus::Confirmed],
                    "cancelled",
                )?;
                Ok(vec![ReservationEvent::ReservationCancelled(ReservationCancelled {
                    reservation_id: cmd.reservation_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ReservationCommand::MarkNoShow(cmd) => {
                self.ensure_status(cmd.reservation_id, &[ReservationStatus::Confirmed], "marked no-show")?;
                Ok(vec![ReservationEvent::ReservationNoShow(ReservationNoShow {
                    reservation_id: cmd.reservation_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Reservation {
    fn handle_create(&self, cmd: &CreateReservation) -> Result<Vec<ReservationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("reservation already exists"));
        }
        if cmd.party_size == 0 {
            return Err(DomainError::validation("party size must be at least 1"));
        }
        if let Some(seats) = cmd.table_seats {
            if cmd.party_size > seats {
                return Err(DomainError::validation(format!(
                    "party of {} does not fit a table for {seats}",
                    cmd.party_size
                )));
            }
        }

        Ok(vec![ReservationEvent::ReservationCreated(ReservationCreated {
            reservation_id: cmd.reservation_id,
            user_id: cmd.user_id,
            table_id: cmd.table_id,
            reserved_for: cmd.reserved_for,
            party_size: cmd.party_size,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn ensure_status(
        &self,
        reservation_id: ReservationId,
        allowed: &[ReservationStatus],
        action: &str,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("reservation {reservation_id}")));
        }
        if self.id != reservation_id {
            return Err(DomainError::invariant("reservation_id mismatch"));
        }
        if !allowed.contains(&self.status) {
            return Err(DomainError::invariant(format!(
                "reservation in status {:?} cannot be {action}",
                self.status
            )));
        }
        Ok(())
    }
}

/// Seat a confirmed reservation and occupy its table together.
///
/// Both decisions are made before either aggregate changes.
pub fn seat(reservation: &mut Reservation, table: &mut Table, at: DateTime<Utc>) -> DomainResult<()> {
    if reservation.table_id != Some(table.id_typed()) {
        return Err(DomainError::invariant("reservation is for a different table"));
    }

    let seated = reservation.handle(&ReservationCommand::SeatReservation(SeatReservation {
        reservation_id: reservation.id_typed(),
        occurred_at: at,
    }))?;
    let occupied = table.handle(&TableCommand::OccupyTable(OccupyTable {
        table_id: table.id_typed(),
        occurred_at: at,
    }))?;

    for e in &seated {
        reservation.apply(e);
    }
    for e in &occupied {
        table.apply(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CreateTable, SetOutOfService, TableStatus};

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_table(seats: u32) -> Table {
        let table_id = TableId::new();
        let mut table = Table::empty(table_id);
        table
            .execute(&TableCommand::CreateTable(CreateTable {
                table_id,
                number: 7,
                seats,
                occurred_at: test_time(),
            }))
            .unwrap();
        table
    }

    fn create(table: &Table, party_size: u32) -> (Reservation, CreateReservation) {
        let reservation_id = ReservationId::new();
        let cmd = CreateReservation {
            reservation_id,
            user_id: UserId::new(),
            table_id: table.id_typed(),
            reserved_for: test_time(),
            party_size,
            table_seats: Some(table.seats()),
            occurred_at: test_time(),
        };
        (Reservation::empty(reservation_id), cmd)
    }

    fn test_confirmed(table: &Table) -> Reservation {
        let (mut r, cmd) = create(table, 2);
        r.execute(&ReservationCommand::CreateReservation(cmd)).unwrap();
        r.execute(&ReservationCommand::ConfirmReservation(ConfirmReservation {
            reservation_id: r.id_typed(),
            occurred_at: test_time(),
        }))
        .unwrap();
        r
    }

    #[test]
    fn party_must_fit_the_table() {
        let table = test_table(4);

        let (r, cmd) = create(&table, 5);
        let err = r.handle(&ReservationCommand::CreateReservation(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let (r, cmd) = create(&table, 0);
        assert!(r.handle(&ReservationCommand::CreateReservation(cmd)).is_err());

        let (r, cmd) = create(&table, 4);
        assert!(r.handle(&ReservationCommand::CreateReservation(cmd)).is_ok());
    }

    #[test]
    fn pending_reservation_cannot_be_seated() {
        let table = test_table(4);
        let (mut r, cmd) = create(&table, 2);
        r.execute(&ReservationCommand::CreateReservation(cmd)).unwrap();

        let err = r
            .handle(&ReservationCommand::SeatReservation(SeatReservation {
                reservation_id: r.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn seating_occupies_the_table() {
        let mut table = test_table(4);
        let mut r = test_confirmed(&table);

        seat(&mut r, &mut table, test_time()).unwrap();

        assert_eq!(r.status(), ReservationStatus::Seated);
        assert_eq!(table.status(), TableStatus::Occupied);
    }

    #[test]
    fn seating_is_all_or_nothing() {
        let mut table = test_table(4);
        let mut r = test_confirmed(&table);
        table
            .execute(&TableCommand::SetOutOfService(SetOutOfService {
                table_id: table.id_typed(),
                out_of_service: true,
                occurred_at: test_time(),
            }))
            .unwrap();
        let before = r.clone();

        assert!(seat(&mut r, &mut table, test_time()).is_err());
        assert_eq!(r, before);
        assert_eq!(table.status(), TableStatus::OutOfService);
    }

    #[test]
    fn final_states_are_terminal() {
        let table = test_table(4);
        let mut r = test_confirmed(&table);
        r.execute(&ReservationCommand::MarkNoShow(MarkNoShow {
            reservation_id: r.id_typed(),
            occurred_at: test_time(),
        }))
        .unwrap();
        assert!(r.status().is_final());

        let err = r
            .handle(&ReservationCommand::CancelReservation(CancelReservation {
                reservation_id: r.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
