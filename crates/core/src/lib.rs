//! `larder-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the shared error model, aggregate traits and the `Quantity`
//! value object used for every stock amount.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod quantity;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{IngredientId, LotId, MenuItemId, OrderId, ReservationId, TableId, UserId};
pub use quantity::Quantity;
pub use value_object::ValueObject;
