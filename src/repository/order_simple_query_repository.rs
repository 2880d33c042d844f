use super::query_dto::OrderSimpleQueryDto;
use crate::session::Session;
use crate::store::QueryError;

/// To-one projection: only the columns the simple listing shows
pub struct OrderSimpleQueryRepository<'s> {
    session: &'s mut Session,
}

impl<'s> OrderSimpleQueryRepository<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self { session }
    }

    pub async fn find_order_dtos(&mut self) -> Result<Vec<OrderSimpleQueryDto>, QueryError> {
        let store = self.session.execute("simple_query.orders")?;
        store.find_order_simple_query_dtos().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Address;
    use crate::store::{Dataset, InMemoryStore};
    use chrono::NaiveDate;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_simple_projection_is_one_query() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let mut session = Session::new(Arc::new(InMemoryStore::new(Dataset::sample(date).unwrap())));

        let orders = OrderSimpleQueryRepository::new(&mut session).find_order_dtos().await.unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].name, "userA");
        assert_eq!(orders[0].address, Address::new("Seoul", "1", "1111"));
        assert_eq!(session.query_count(), 1);
    }
}
