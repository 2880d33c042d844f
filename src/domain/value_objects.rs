use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Shop Value Objects
// ============================================================================

/// Postal address, embedded by value in Member and Delivery
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub zipcode: String,
}

impl Address {
    pub fn new(city: impl Into<String>, street: impl Into<String>, zipcode: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            street: street.into(),
            zipcode: zipcode.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Ordered,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Ordered => "ORDERED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDERED" => Ok(OrderStatus::Ordered),
            "CANCELED" => Ok(OrderStatus::Canceled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Ready,
    Comp,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Ready => "READY",
            DeliveryStatus::Comp => "COMP",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(DeliveryStatus::Ready),
            "COMP" => Ok(DeliveryStatus::Comp),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_format() {
        assert_eq!(serde_json::to_string(&OrderStatus::Ordered).unwrap(), "\"ORDERED\"");
        assert_eq!(serde_json::to_string(&OrderStatus::Canceled).unwrap(), "\"CANCELED\"");
    }

    #[test]
    fn test_order_status_parses_its_own_text() {
        for status in [OrderStatus::Ordered, OrderStatus::Canceled] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("ORDER".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_delivery_status_wire_format() {
        assert_eq!(serde_json::to_string(&DeliveryStatus::Ready).unwrap(), "\"READY\"");
        assert_eq!("COMP".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Comp);
    }

    #[test]
    fn test_address_equality_is_by_value() {
        let a = Address::new("Seoul", "1", "1111");
        let b = Address::new("Seoul", "1", "1111");
        assert_eq!(a, b);
        assert_ne!(a, Address::new("Jinju", "2", "2222"));
    }
}
