//! In-process order store for tests and development

use super::errors::{RepositoryError, RepositoryResult};
use super::traits::{InsertOutcome, OrderStore};
use crate::models::Order;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    /// order_uid -> (persistence sequence, order)
    orders: DashMap<String, (u64, Order)>,
    next_seq: AtomicU64,
    closed: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn ensure_open(&self) -> RepositoryResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(RepositoryError::Closed)
        } else {
            Ok(())
        }
    }

    fn sorted(&self) -> Vec<(u64, Order)> {
        let mut rows: Vec<(u64, Order)> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, order: &Order) -> RepositoryResult<InsertOutcome> {
        self.ensure_open()?;

        match self.orders.entry(order.order_uid.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyPresent),
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                slot.insert((seq, order.clone()));
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn find_order(&self, order_uid: &str) -> RepositoryResult<Option<Order>> {
        self.ensure_open()?;
        Ok(self.orders.get(order_uid).map(|entry| entry.value().1.clone()))
    }

    async fn list_orders(&self) -> RepositoryResult<Vec<Order>> {
        self.ensure_open()?;
        Ok(self.sorted().into_iter().map(|(_, order)| order).collect())
    }

    async fn latest_orders(&self, limit: usize) -> RepositoryResult<Vec<Order>> {
        self.ensure_open()?;
        Ok(self
            .sorted()
            .into_iter()
            .rev()
            .take(limit)
            .map(|(_, order)| order)
            .collect())
    }

    async fn close(&self) -> RepositoryResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
