use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Order aggregate as carried on the wire, stored in the database and cached.
///
/// `order_uid` is the identity used by both the cache and the durable store.
/// Absent fields decode to their zero value so that a single incomplete order
/// is rejected by validation instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    #[serde(deserialize_with = "null_as_empty")]
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i32,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

/// Recipient and destination of an order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// Payment details, amounts in minor currency units
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i32,
    /// Unix timestamp (seconds)
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i32,
    pub goods_total: i32,
    pub custom_fee: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i32,
    pub rid: String,
    pub name: String,
    pub sale: i32,
    pub size: String,
    pub total_price: i32,
    pub nm_id: i64,
    pub brand: String,
    pub status: i32,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            order_uid: String::new(),
            track_number: String::new(),
            entry: String::new(),
            delivery: Delivery::default(),
            payment: Payment::default(),
            items: Vec::new(),
            locale: String::new(),
            internal_signature: String::new(),
            customer_id: String::new(),
            delivery_service: String::new(),
            shardkey: String::new(),
            sm_id: 0,
            date_created: DateTime::<Utc>::UNIX_EPOCH,
            oof_shard: String::new(),
        }
    }
}

/// `"items": null` is how producers encode an empty item list
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Item>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Item>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Order {
    /// Decode a stream payload: a JSON array of orders
    pub fn decode_batch(payload: &[u8]) -> Result<Vec<Order>, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Encode a batch of orders as a stream payload
    pub fn encode_batch(orders: &[Order]) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(orders)
    }
}
