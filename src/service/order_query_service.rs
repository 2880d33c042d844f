use std::sync::Arc;

use super::dto::OrderDto;
use crate::repository::OrderRepository;
use crate::session::{Fetch, Session};
use crate::store::{OrderStore, QueryError};

/// Outcome of a service call plus the queries it issued, failed or not
#[derive(Debug)]
pub struct ServiceResponse<T> {
    pub result: Result<T, QueryError>,
    pub query_log: Vec<&'static str>,
}

// ============================================================================
// Order Query Service
// ============================================================================
//
// Owns its session: it is opened, used for loading and DTO conversion, and
// closed before anything is returned. Callers only ever see DTOs, so no
// association can be touched after the session ends.
//
// ============================================================================

pub struct OrderQueryService {
    store: Arc<dyn OrderStore>,
}

impl OrderQueryService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Collection fetch join converted to DTOs inside the service scope
    pub async fn orders_v3(&self) -> ServiceResponse<Vec<OrderDto>> {
        let mut session = Session::new(self.store.clone());

        let result = async {
            let orders = OrderRepository::new(&mut session).find_all_with_item().await?;
            let graphs = session.resolve_all(&orders, Fetch::Full).await?;
            Ok::<_, QueryError>(graphs.iter().map(OrderDto::from).collect::<Vec<_>>())
        }
        .await;

        session.close();

        ServiceResponse {
            result,
            query_log: session.query_log().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::FailingStore;
    use crate::domain::OrderSearch;
    use crate::store::{Dataset, InMemoryStore};
    use chrono::NaiveDate;

    fn store() -> Arc<dyn OrderStore> {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
        Arc::new(InMemoryStore::new(Dataset::sample(date).unwrap()))
    }

    #[tokio::test]
    async fn test_orders_v3_converts_inside_the_scope() {
        let service = OrderQueryService::new(store());

        let response = service.orders_v3().await;
        let dtos = response.result.unwrap();

        assert_eq!(dtos.len(), 2);
        assert_eq!(dtos[1].order_items[1].item_name, "SPRING2 BOOK");
        assert_eq!(response.query_log, vec!["orders.with_items"]);
    }

    #[tokio::test]
    async fn test_failed_call_still_reports_its_queries() {
        let service = OrderQueryService::new(Arc::new(FailingStore));

        let response = service.orders_v3().await;

        assert!(matches!(response.result, Err(QueryError::Decode { .. })));
        assert_eq!(response.query_log, vec!["orders.with_items"]);
    }

    #[tokio::test]
    async fn test_converting_outside_the_scope_fails() {
        let mut session = Session::new(store());
        let orders = OrderRepository::new(&mut session)
            .find_all_by_search(&OrderSearch::default())
            .await
            .unwrap();
        session.close();

        let err = session.resolve(&orders[0], Fetch::Full).await.unwrap_err();

        assert!(matches!(err, QueryError::LazyInitialization { entity: "Member", .. }));
    }
}
