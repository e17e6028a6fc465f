//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values
/// (`Quantity`, `RecipeComponent`, `LotDraw`). Entities, by contrast, are
/// compared by identifier (`Ingredient`, `StockLot`, `User`).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
