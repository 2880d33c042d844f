// ============================================================================
// Domain Layer - Shop Entities
// ============================================================================
//
// Plain relational entities read by the query layer:
// - Value objects (Address, OrderStatus, DeliveryStatus)
// - Entities (Member, Delivery, Item, Order, OrderItem)
// - Search criteria (OrderSearch)
// - Errors (DomainError)
//
// Associations are foreign-key ids. An Order owns its items; Member and
// Delivery are referenced, never embedded, so nothing points back.
//
// ============================================================================

pub mod value_objects;
pub mod entities;
pub mod search;
pub mod errors;

pub use value_objects::*;
pub use entities::*;
pub use search::*;
pub use errors::*;
