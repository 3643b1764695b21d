#![allow(dead_code)]

use super::builders::OrderBuilder;
use orders_core::models::Order;
use proptest::prelude::*;

/// Order ids drawn from a small alphabet so sequences contain repeats
pub fn order_uid_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}"
}

/// Sequences of cache writes
pub fn write_sequence_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(order_uid_strategy(), 0..60)
}

/// Ways an order can be broken; `None` leaves it valid
#[derive(Debug, Clone, Copy)]
pub enum Defect {
    EmptyUid,
    EmptyTrackNumber,
    EmptyCustomerId,
    LeadingZeroPhone,
}

pub fn defect_strategy() -> impl Strategy<Value = Option<Defect>> {
    prop_oneof![
        Just(None),
        Just(Some(Defect::EmptyUid)),
        Just(Some(Defect::EmptyTrackNumber)),
        Just(Some(Defect::EmptyCustomerId)),
        Just(Some(Defect::LeadingZeroPhone)),
    ]
}

pub fn apply_defect(uid: &str, defect: Option<Defect>) -> Order {
    let builder = OrderBuilder::new(uid);
    match defect {
        None => builder.build(),
        Some(Defect::EmptyUid) => {
            let mut order = builder.build();
            order.order_uid.clear();
            order
        }
        Some(Defect::EmptyTrackNumber) => builder.with_track_number("").build(),
        Some(Defect::EmptyCustomerId) => builder.with_customer_id("").build(),
        Some(Defect::LeadingZeroPhone) => builder.with_phone("0123456").build(),
    }
}
