//! Orders domain module (event-sourced).
//!
//! Business rules for guest orders: attaching lines, submission (which the
//! application follows with ingredient deduction), fulfilment and
//! cancellation. Deterministic domain logic only.

pub mod order;

pub use order::{
    AddLine, CancelOrder, CreateOrder, DetachUser, FulfillOrder, LineAdded, LineRemoved, Order,
    OrderCancelled, OrderCommand, OrderCreated, OrderEvent, OrderFulfilled, OrderLine,
    OrderStatus, OrderSubmitted, RemoveLine, SubmitOrder, UserDetached,
};
