//! Dining room: tables and reservations.

pub mod reservation;
pub mod table;

pub use reservation::{
    CancelReservation, ConfirmReservation, CreateReservation, MarkNoShow, Reservation,
    ReservationCancelled, ReservationCommand, ReservationConfirmed, ReservationCreated,
    ReservationEvent, ReservationNoShow, ReservationSeated, ReservationStatus, SeatReservation, seat,
};
pub use table::{
    CreateTable, OccupyTable, ReleaseTable, ReserveTable, SetOutOfService, Table, TableCommand,
    TableCreated, TableEvent, TableStatus, TableStatusChanged, ensure_number_free,
};
