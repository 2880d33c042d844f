use serde::Deserialize;

use super::entities::{Member, Order};
use super::value_objects::OrderStatus;

/// Upper bound on rows returned by a search query
pub const SEARCH_RESULT_LIMIT: usize = 1000;

/// Optional filters for the plain order listing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSearch {
    pub member_name: Option<String>,
    pub order_status: Option<OrderStatus>,
}

impl OrderSearch {
    /// Blank member names are treated as absent
    pub fn member_name_filter(&self) -> Option<&str> {
        self.member_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn matches(&self, order: &Order, member: &Member) -> bool {
        if let Some(status) = self.order_status {
            if order.status != status {
                return false;
            }
        }

        match self.member_name_filter() {
            Some(name) => member.name.contains(name),
            None => true,
        }
    }
}
