use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{Aggregate, AggregateRoot, DomainError, MenuItemId, OrderId, TableId, UserId};
use larder_events::Event;

/// Order status lifecycle.
///
/// `Created` covers both the empty order and the order with lines attached;
/// lines can only change while the order is `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Submitted,
    Fulfilled,
    Cancelled,
}

/// Order line: menu item and portion count. Owned by its order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
}

/// Aggregate root: Order.
///
/// The order exclusively owns its lines. The user reference is weak: it can
/// be cleared (`DetachUser`) when the user is deleted, and the order remains
/// as history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    table_id: Option<TableId>,
    user_id: Option<UserId>,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    next_line_no: u32,
    placed_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            table_id: None,
            user_id: None,
            status: OrderStatus::Created,
            lines: Vec::new(),
            next_line_no: 1,
            placed_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn table_id(&self) -> Option<TableId> {
        self.table_id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, OrderStatus::Created)
    }

    /// `(menu item, portions)` pairs, the input of recipe expansion.
    pub fn portions(&self) -> impl Iterator<Item = (MenuItemId, u32)> + '_ {
        self.lines.iter().map(|l| (l.menu_item_id, l.quantity))
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub order_id: OrderId,
    pub table_id: TableId,
    pub user_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub order_id: OrderId,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLine {
    pub order_id: OrderId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FulfillOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DetachUser (the referenced user was deleted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachUser {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    CreateOrder(CreateOrder),
    AddLine(AddLine),
    RemoveLine(RemoveLine),
    SubmitOrder(SubmitOrder),
    FulfillOrder(FulfillOrder),
    CancelOrder(CancelOrder),
    DetachUser(DetachUser),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub table_id: TableId,
    pub user_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub order_id: OrderId,
    pub line_no: u32,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemoved {
    pub order_id: OrderId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderFulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFulfilled {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UserDetached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetached {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderCreated(OrderCreated),
    LineAdded(LineAdded),
    LineRemoved(LineRemoved),
    OrderSubmitted(OrderSubmitted),
    OrderFulfilled(OrderFulfilled),
    OrderCancelled(OrderCancelled),
    UserDetached(UserDetached),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "orders.order.created",
            OrderEvent::LineAdded(_) => "orders.order.line_added",
            OrderEvent::LineRemoved(_) => "orders.order.line_removed",
            OrderEvent::OrderSubmitted(_) => "orders.order.submitted",
            OrderEvent::OrderFulfilled(_) => "orders.order.fulfilled",
            OrderEvent::OrderCancelled(_) => "orders.order.cancelled",
            OrderEvent::UserDetached(_) => "orders.order.user_detached",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(e) => e.occurred_at,
            OrderEvent::LineAdded(e) => e.occurred_at,
            OrderEvent::LineRemoved(e) => e.occurred_at,
            OrderEvent::OrderSubmitted(e) => e.occurred_at,
            OrderEvent::OrderFulfilled(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
            OrderEvent::UserDetached(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.table_id = Some(e.table_id);
                self.user_id = e.user_id;
                self.status = OrderStatus::Created;
                self.lines.clear();
                self.next_line_no = 1;
                self.placed_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::LineAdded(e) => {
                self.lines.push(OrderLine {
                    line_no: e.line_no,
                    menu_item_id: e.menu_item_id,
                    quantity: e.quantity,
                });
                self.next_line_no = e.line_no + 1;
            }
            OrderEvent::LineRemoved(e) => {
                self.lines.retain(|l| l.line_no != e.line_no);
            }
            OrderEvent::OrderSubmitted(_) => {
                self.status = OrderStatus::Submitted;
            }
            OrderEvent::OrderFulfilled(_) => {
                self.status = OrderStatus::Fulfilled;
            }
            OrderEvent::OrderCancelled(_) => {
                self.status = OrderStatus::Cancelled;
            }
            OrderEvent::UserDetached(_) => {
                self.user_id = None;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::CreateOrder(cmd) => self.handle_create(cmd),
            OrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            OrderCommand::RemoveLine(cmd) => self.handle_remove_line(cmd),
            OrderCommand::SubmitOrder(cmd) => self.handle_submit(cmd),
            OrderCommand::FulfillOrder(cmd) => self.handle_fulfill(cmd),
            OrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
            OrderCommand::DetachUser(cmd) => self.handle_detach_user(cmd),
        }
    }
}

impl Order {
    fn ensure_existing(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify order once it is submitted",
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }

        Ok(vec![OrderEvent::OrderCreated(OrderCreated {
            order_id: cmd.order_id,
            table_id: cmd.table_id,
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;
        self.ensure_modifiable()?;

        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        Ok(vec![OrderEvent::LineAdded(LineAdded {
            order_id: cmd.order_id,
            line_no: self.next_line_no,
            menu_item_id: cmd.menu_item_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line(&self, cmd: &RemoveLine) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;
        self.ensure_modifiable()?;

        if !self.lines.iter().any(|l| l.line_no == cmd.line_no) {
            return Err(DomainError::not_found(format!("line {}", cmd.line_no)));
        }

        Ok(vec![OrderEvent::LineRemoved(LineRemoved {
            order_id: cmd.order_id,
            line_no: cmd.line_no,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;

        if self.status != OrderStatus::Created {
            return Err(DomainError::invariant("only new orders can be submitted"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot submit order without lines"));
        }

        Ok(vec![OrderEvent::OrderSubmitted(OrderSubmitted {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_fulfill(&self, cmd: &FulfillOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;

        if self.status != OrderStatus::Submitted {
            return Err(DomainError::invariant("only submitted orders can be fulfilled"));
        }

        Ok(vec![OrderEvent::OrderFulfilled(OrderFulfilled {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;

        if !matches!(self.status, OrderStatus::Created | OrderStatus::Submitted) {
            return Err(DomainError::invariant(
                "cannot cancel an order that is fulfilled or cancelled",
            ));
        }

        Ok(vec![OrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            reason: cmd.reason.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_detach_user(&self, cmd: &DetachUser) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_existing(cmd.order_id)?;

        if self.user_id != Some(cmd.user_id) {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::UserDetached(UserDetached {
            order_id: cmd.order_id,
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
