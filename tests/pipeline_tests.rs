mod common;

use common::{sample_orders, FailingCommitConsumer, FlakyStore, OrderBuilder};
use orders_core::cache::InMemoryOrdersCache;
use orders_core::config::IngestionConfig;
use orders_core::ingestion::{IngestionPipeline, PipelineError, PipelineState, PipelineStatsSnapshot};
use orders_core::messaging::{InMemoryStream, MessageConsumer, MessageProducer};
use orders_core::models::Order;
use orders_core::repository::{CachedOrdersRepository, OrderStore, OrdersRepository};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

async fn wait_for_stats<F>(pipeline: &IngestionPipeline, predicate: F) -> PipelineStatsSnapshot
where
    F: Fn(&PipelineStatsSnapshot) -> bool,
{
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = pipeline.stats().snapshot();
            if predicate(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    result.expect("pipeline did not reach the expected stats in time")
}

fn spawn(pipeline: &Arc<IngestionPipeline>) -> tokio::task::JoinHandle<Result<(), PipelineError>> {
    let pipeline = pipeline.clone();
    tokio::spawn(async move { pipeline.run().await })
}

#[tokio::test]
async fn test_batches_persisted_and_acknowledged() {
    let stream = Arc::new(InMemoryStream::default());
    let store = Arc::new(FlakyStore::new());
    let repository = Arc::new(CachedOrdersRepository::new(
        store.clone(),
        Arc::new(InMemoryOrdersCache::new(10)),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        stream.clone(),
        repository.clone(),
        IngestionConfig::default(),
    ));
    let task = spawn(&pipeline);

    let orders = sample_orders(4);
    stream.write_message(&Order::encode_batch(&orders[..2]).unwrap()).await.unwrap();
    stream.write_message(&Order::encode_batch(&orders[2..]).unwrap()).await.unwrap();

    let stats = wait_for_stats(&pipeline, |s| s.messages_committed == 2).await;
    assert_eq!(stats.orders_persisted, 4);
    assert_eq!(stream.pending_count(), 0);
    assert_eq!(repository.get_all_orders().await.unwrap(), orders);

    MessageConsumer::close(stream.as_ref()).await.unwrap();
    assert!(task.await.unwrap().is_ok());
    assert_eq!(pipeline.state(), PipelineState::Stopped);
}

#[tokio::test]
async fn test_partial_batch_keeps_valid_orders() {
    let stream = Arc::new(InMemoryStream::default());
    let store = Arc::new(FlakyStore::new());
    let repository = Arc::new(CachedOrdersRepository::new(
        store.clone(),
        Arc::new(InMemoryOrdersCache::new(10)),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        stream.clone(),
        repository,
        IngestionConfig::default(),
    ));
    let task = spawn(&pipeline);

    let batch = vec![
        OrderBuilder::new("ok").build(),
        OrderBuilder::new("no-track").with_track_number("").build(),
        OrderBuilder::new("zero-phone").with_phone("0501234567").build(),
    ];
    stream.write_message(&Order::encode_batch(&batch).unwrap()).await.unwrap();

    let stats = wait_for_stats(&pipeline, |s| s.messages_committed == 1).await;
    assert_eq!(stats.orders_persisted, 1);
    assert_eq!(stats.orders_rejected, 2);
    assert!(store.find_order("ok").await.unwrap().is_some());
    assert!(store.find_order("no-track").await.unwrap().is_none());

    MessageConsumer::close(stream.as_ref()).await.unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_incomplete_order_does_not_sink_its_batch() {
    let stream = Arc::new(InMemoryStream::default());
    let store = Arc::new(FlakyStore::new());
    let repository = Arc::new(CachedOrdersRepository::new(
        store.clone(),
        Arc::new(InMemoryOrdersCache::new(10)),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        stream.clone(),
        repository,
        IngestionConfig::default(),
    ));
    let task = spawn(&pipeline);

    let mut batch = serde_json::to_value(vec![
        OrderBuilder::new("complete").build(),
        OrderBuilder::new("no-customer").build(),
        OrderBuilder::new("null-items").build(),
    ])
    .unwrap();
    batch[1].as_object_mut().unwrap().remove("customer_id");
    batch[2]["items"] = serde_json::Value::Null;
    stream
        .write_message(&serde_json::to_vec(&batch).unwrap())
        .await
        .unwrap();

    let stats = wait_for_stats(&pipeline, |s| s.messages_committed == 1).await;
    assert_eq!(stats.messages_dead_lettered, 0);
    assert_eq!(stats.orders_persisted, 2);
    assert_eq!(stats.orders_rejected, 1);
    assert!(store.find_order("complete").await.unwrap().is_some());
    assert!(store.find_order("no-customer").await.unwrap().is_none());
    let null_items = store.find_order("null-items").await.unwrap().unwrap();
    assert!(null_items.items.is_empty());

    MessageConsumer::close(stream.as_ref()).await.unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_undecodable_and_all_invalid_messages_are_dead_lettered() {
    let stream = Arc::new(InMemoryStream::default());
    let repository = Arc::new(CachedOrdersRepository::new(
        Arc::new(FlakyStore::new()),
        Arc::new(InMemoryOrdersCache::new(10)),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        stream.clone(),
        repository,
        IngestionConfig::default(),
    ));
    let task = spawn(&pipeline);

    stream.write_message(b"definitely not json").await.unwrap();
    let invalid = vec![OrderBuilder::new("bad").with_customer_id("").build()];
    stream.write_message(&Order::encode_batch(&invalid).unwrap()).await.unwrap();

    let stats = wait_for_stats(&pipeline, |s| s.messages_dead_lettered == 2).await;
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.messages_committed, 0);
    assert_eq!(stream.archived_count(), 2);
    assert_eq!(stream.pending_count(), 0);

    MessageConsumer::close(stream.as_ref()).await.unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_persist_failure_leaves_message_for_redelivery() {
    let stream = Arc::new(InMemoryStream::new(Duration::from_secs(1)));
    let store = Arc::new(FlakyStore::new());
    store.fail_inserts.store(true, Ordering::SeqCst);
    let repository = Arc::new(CachedOrdersRepository::new(
        store.clone(),
        Arc::new(InMemoryOrdersCache::new(10)),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        stream.clone(),
        repository,
        IngestionConfig::default(),
    ));
    let task = spawn(&pipeline);

    stream
        .write_message(&Order::encode_batch(&sample_orders(1)).unwrap())
        .await
        .unwrap();

    wait_for_stats(&pipeline, |s| s.persist_failures == 1).await;
    assert_eq!(stream.pending_count(), 1);

    // store recovers; the message comes back after the visibility timeout
    store.fail_inserts.store(false, Ordering::SeqCst);
    let stats = wait_for_stats(&pipeline, |s| s.messages_committed == 1).await;
    assert_eq!(stats.messages_fetched, 2);
    assert_eq!(stream.pending_count(), 0);
    assert!(store.find_order("order-0").await.unwrap().is_some());

    MessageConsumer::close(stream.as_ref()).await.unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_commit_failure_is_fatal() {
    let stream = Arc::new(InMemoryStream::default());
    let consumer = Arc::new(FailingCommitConsumer::new(stream.clone()));
    let store = Arc::new(FlakyStore::new());
    let repository = Arc::new(CachedOrdersRepository::new(
        store.clone(),
        Arc::new(InMemoryOrdersCache::new(10)),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        consumer,
        repository,
        IngestionConfig::default(),
    ));
    let task = spawn(&pipeline);

    stream
        .write_message(&Order::encode_batch(&sample_orders(1)).unwrap())
        .await
        .unwrap();

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(pipeline.state(), PipelineState::Stopped);
    // persisted before the commit failed
    assert!(store.find_order("order-0").await.unwrap().is_some());
}

#[tokio::test]
async fn test_close_while_fetching_stops_pipeline() {
    let stream = Arc::new(InMemoryStream::default());
    let repository: Arc<dyn OrdersRepository> = Arc::new(CachedOrdersRepository::new(
        Arc::new(FlakyStore::new()),
        Arc::new(InMemoryOrdersCache::new(10)),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        stream.clone(),
        repository,
        IngestionConfig::default(),
    ));
    let mut state = pipeline.subscribe_state();
    let task = spawn(&pipeline);

    state.wait_for(|s| *s == PipelineState::Fetching).await.unwrap();
    MessageConsumer::close(stream.as_ref()).await.unwrap();

    task.await.unwrap().unwrap();
    assert!(pipeline.state().is_stopped());
    assert_eq!(pipeline.stats().snapshot().messages_fetched, 0);
}
