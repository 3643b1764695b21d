//! Order validation
//!
//! Structural checks applied to every decoded order before it is persisted. A batch is
//! filtered order by order: invalid records are dropped and reported, the rest proceed.

use crate::models::Order;
use thiserror::Error;

/// Reasons an order is rejected before persistence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required field '{field}' is empty")]
    MissingField { field: &'static str },

    #[error("delivery phone '{phone}' must not begin with 0")]
    InvalidPhone { phone: String },
}

/// An order that failed validation, with the reason it was dropped
#[derive(Debug, Clone)]
pub struct RejectedOrder {
    pub order_uid: String,
    pub reason: ValidationError,
}

/// Result of filtering a batch
#[derive(Debug, Default)]
pub struct ValidatedBatch {
    pub valid: Vec<Order>,
    pub rejected: Vec<RejectedOrder>,
}

impl ValidatedBatch {
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }
}

/// Validate a single order
pub fn validate_order(order: &Order) -> Result<(), ValidationError> {
    require_non_empty("order_uid", &order.order_uid)?;
    require_non_empty("track_number", &order.track_number)?;
    require_non_empty("customer_id", &order.customer_id)?;

    if order.delivery.phone.starts_with('0') {
        return Err(ValidationError::InvalidPhone {
            phone: order.delivery.phone.clone(),
        });
    }

    Ok(())
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::MissingField { field })
    } else {
        Ok(())
    }
}

/// Split a decoded batch into the orders that may be persisted and the rejected ones.
///
/// Each order is judged independently; input order is preserved in both outputs.
pub fn filter_valid_orders(orders: Vec<Order>) -> ValidatedBatch {
    let mut batch = ValidatedBatch::default();

    for order in orders {
        match validate_order(&order) {
            Ok(()) => batch.valid.push(order),
            Err(reason) => batch.rejected.push(RejectedOrder {
                order_uid: order.order_uid,
                reason,
            }),
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::fixtures::order;

    #[test]
    fn test_valid_order_passes() {
        assert_eq!(validate_order(&order("a1")), Ok(()));
    }

    #[test]
    fn test_empty_items_are_valid() {
        let mut o = order("a1");
        o.items.clear();
        assert!(validate_order(&o).is_ok());
    }

    #[test]
    fn test_empty_phone_is_allowed() {
        let mut o = order("a1");
        o.delivery.phone = String::new();
        assert!(validate_order(&o).is_ok());
    }

    #[test]
    fn test_each_rule_rejects() {
        let mut no_uid = order("");
        no_uid.order_uid = String::new();
        assert_eq!(
            validate_order(&no_uid),
            Err(ValidationError::MissingField { field: "order_uid" })
        );

        let mut no_track = order("a2");
        no_track.track_number = String::new();
        assert_eq!(
            validate_order(&no_track),
            Err(ValidationError::MissingField {
                field: "track_number"
            })
        );

        let mut no_customer = order("a3");
        no_customer.customer_id = String::new();
        assert_eq!(
            validate_order(&no_customer),
            Err(ValidationError::MissingField {
                field: "customer_id"
            })
        );

        let mut bad_phone = order("a4");
        bad_phone.delivery.phone = "012345678".to_string();
        assert!(matches!(
            validate_order(&bad_phone),
            Err(ValidationError::InvalidPhone { .. })
        ));
    }

    #[test]
    fn test_filter_keeps_only_valid_in_order() {
        let mut bad = order("bad");
        bad.customer_id = String::new();

        let batch = filter_valid_orders(vec![order("first"), bad, order("second")]);

        let kept: Vec<_> = batch.valid.iter().map(|o| o.order_uid.as_str()).collect();
        assert_eq!(kept, vec!["first", "second"]);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].order_uid, "bad");
    }

    #[test]
    fn test_filter_all_invalid_is_empty() {
        let mut bad = order("bad");
        bad.track_number = String::new();
        let batch = filter_valid_orders(vec![bad]);
        assert!(batch.is_empty());
        assert_eq!(batch.rejected.len(), 1);
    }
}
