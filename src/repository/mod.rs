// ============================================================================
// Repositories - one fetch strategy per method
// ============================================================================
//
// Every repository borrows the request's Session, so all of its queries are
// counted and bounded by the session's lifetime.
//
// ============================================================================

pub mod query_dto;
pub mod order_repository;
pub mod order_query_repository;
pub mod order_simple_query_repository;

pub use query_dto::*;
pub use order_repository::OrderRepository;
pub use order_query_repository::OrderQueryRepository;
pub use order_simple_query_repository::OrderSimpleQueryRepository;
