// ============================================================================
// Shop Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Not enough stock for item {item_id}: requested {requested}, available {available}")]
    NotEnoughStock {
        item_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Member not found: {0}")]
    UnknownMember(i64),

    #[error("Item not found: {0}")]
    UnknownItem(i64),

    #[error("Order not found: {0}")]
    UnknownOrder(i64),

    #[error("Order {0} is already delivered and cannot be canceled")]
    AlreadyDelivered(i64),
}
