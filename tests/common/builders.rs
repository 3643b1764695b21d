//! Order builders for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use orders_core::models::{Delivery, Item, Order, Payment};

/// Builder for valid orders with targeted overrides
pub struct OrderBuilder {
    order: Order,
}

impl OrderBuilder {
    pub fn new(order_uid: &str) -> Self {
        Self {
            order: Order {
                order_uid: order_uid.to_string(),
                track_number: "WBILMTESTTRACK".to_string(),
                entry: "WBIL".to_string(),
                delivery: Delivery {
                    name: "Test Testov".to_string(),
                    phone: "+9720000000".to_string(),
                    zip: "2639809".to_string(),
                    city: "Kiryat Mozkin".to_string(),
                    address: "Ploshad Mira 15".to_string(),
                    region: "Kraiot".to_string(),
                    email: "test@gmail.com".to_string(),
                },
                payment: Payment {
                    transaction: order_uid.to_string(),
                    request_id: String::new(),
                    currency: "USD".to_string(),
                    provider: "wbpay".to_string(),
                    amount: 1817,
                    payment_dt: 1_637_907_727,
                    bank: "alpha".to_string(),
                    delivery_cost: 1500,
                    goods_total: 317,
                    custom_fee: 0,
                },
                items: vec![item(order_uid, 0)],
                locale: "en".to_string(),
                internal_signature: String::new(),
                customer_id: "test".to_string(),
                delivery_service: "meest".to_string(),
                shardkey: "9".to_string(),
                sm_id: 99,
                date_created: base_time(),
                oof_shard: "1".to_string(),
            },
        }
    }

    pub fn with_track_number(mut self, track_number: &str) -> Self {
        self.order.track_number = track_number.to_string();
        self
    }

    pub fn with_customer_id(mut self, customer_id: &str) -> Self {
        self.order.customer_id = customer_id.to_string();
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.order.delivery.phone = phone.to_string();
        self
    }

    pub fn with_items(mut self, count: usize) -> Self {
        let uid = self.order.order_uid.clone();
        self.order.items = (0..count).map(|i| item(&uid, i)).collect();
        self
    }

    pub fn created_at(mut self, date_created: DateTime<Utc>) -> Self {
        self.order.date_created = date_created;
        self
    }

    pub fn build(self) -> Order {
        self.order
    }
}

/// Whole-second timestamp so values survive a round trip through PostgreSQL
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19)
        .single()
        .unwrap_or_else(Utc::now)
}

fn item(order_uid: &str, position: usize) -> Item {
    Item {
        chrt_id: 9_934_930 + position as i64,
        track_number: "WBILMTESTTRACK".to_string(),
        price: 453,
        rid: format!("{order_uid}-rid-{position}"),
        name: "Mascaras".to_string(),
        sale: 30,
        size: "0".to_string(),
        total_price: 317,
        nm_id: 2_389_212,
        brand: "Vivienne Sabo".to_string(),
        status: 202,
    }
}

/// `count` valid orders `order-0 .. order-{count-1}`, one minute apart
pub fn sample_orders(count: usize) -> Vec<Order> {
    (0..count)
        .map(|i| {
            OrderBuilder::new(&format!("order-{i}"))
                .created_at(base_time() + Duration::minutes(i as i64))
                .build()
        })
        .collect()
}
