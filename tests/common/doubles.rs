//! Test doubles wrapping the in-process backends with injectable failures

#![allow(dead_code)]

use async_trait::async_trait;
use orders_core::cache::{CacheError, CacheResult, OrdersCache};
use orders_core::messaging::{
    InMemoryStream, MessageConsumer, MessagingError, MessagingResult, StreamMessage,
};
use orders_core::models::Order;
use orders_core::repository::{
    InMemoryOrderStore, InsertOutcome, OrderStore, RepositoryError, RepositoryResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Consumer whose commits fail while `fail_commits` is set
pub struct FailingCommitConsumer {
    pub inner: Arc<InMemoryStream>,
    pub fail_commits: AtomicBool,
}

impl FailingCommitConsumer {
    pub fn new(inner: Arc<InMemoryStream>) -> Self {
        Self {
            inner,
            fail_commits: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl MessageConsumer for FailingCommitConsumer {
    async fn fetch_message(&self) -> MessagingResult<StreamMessage> {
        self.inner.fetch_message().await
    }

    async fn commit_message(&self, message: &StreamMessage) -> MessagingResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(MessagingError::queue_operation(
                "orders",
                "delete",
                "connection reset",
            ));
        }
        self.inner.commit_message(message).await
    }

    async fn dead_letter_message(&self, message: &StreamMessage) -> MessagingResult<()> {
        self.inner.dead_letter_message(message).await
    }

    async fn close(&self) -> MessagingResult<()> {
        MessageConsumer::close(self.inner.as_ref()).await
    }
}

/// Store whose inserts fail while `fail_inserts` is set; close can be made to fail
pub struct FlakyStore {
    pub inner: InMemoryOrderStore,
    pub fail_inserts: AtomicBool,
    pub fail_close: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryOrderStore::new(),
            fail_inserts: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl OrderStore for FlakyStore {
    async fn insert_order(&self, order: &Order) -> RepositoryResult<InsertOutcome> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database {
                operation: "insert_order".to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.inner.insert_order(order).await
    }

    async fn find_order(&self, order_uid: &str) -> RepositoryResult<Option<Order>> {
        self.inner.find_order(order_uid).await
    }

    async fn list_orders(&self) -> RepositoryResult<Vec<Order>> {
        self.inner.list_orders().await
    }

    async fn latest_orders(&self, limit: usize) -> RepositoryResult<Vec<Order>> {
        self.inner.latest_orders(limit).await
    }

    async fn close(&self) -> RepositoryResult<()> {
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database {
                operation: "close".to_string(),
                message: "pool busy".to_string(),
            });
        }
        self.inner.close().await
    }
}

/// Cache that accepts nothing and fails to close
pub struct BrokenCache;

#[async_trait]
impl OrdersCache for BrokenCache {
    async fn update_cache(&self, _order: &Order) -> CacheResult<()> {
        Err(CacheError::ConnectionError("refused".to_string()))
    }

    async fn get_from_cache(&self, order_uid: &str) -> CacheResult<Order> {
        Err(CacheError::NotFound(order_uid.to_string()))
    }

    async fn cached_count(&self) -> CacheResult<usize> {
        Ok(0)
    }

    async fn close(&self) -> CacheResult<()> {
        Err(CacheError::ConnectionError("reset by peer".to_string()))
    }

    fn capacity(&self) -> usize {
        10
    }

    fn provider_name(&self) -> &'static str {
        "broken"
    }
}
