// ============================================================================
// Service Layer - query services with their own session scope
// ============================================================================

pub mod dto;
pub mod order_query_service;

pub use dto::{OrderDto, OrderItemDto};
pub use order_query_service::{OrderQueryService, ServiceResponse};
