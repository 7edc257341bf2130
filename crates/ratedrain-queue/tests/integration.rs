//! Integration tests for ratedrain-queue.

use ratedrain_queue::{channel, QueueConfig, QueueError, TrySendError};
use std::time::Duration;
use tokio_stream::StreamExt;

fn small(capacity: usize) -> QueueConfig {
    QueueConfig::new(capacity).expect("non-zero capacity")
}

#[tokio::test]
async fn test_basic_send_receive() {
    let (tx, rx) = channel::<u64>(QueueConfig::default());

    tx.send(1).await.expect("send failed");
    tx.send(2).await.expect("send failed");
    tx.send(3).await.expect("send failed");

    rx.close();

    let mut received = Vec::new();
    while let Some(item) = rx.recv().await {
        received.push(item);
    }

    assert_eq!(received, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_try_send_preserves_item_on_full() {
    let (tx, _rx) = channel::<u64>(small(4));

    for i in 0..4 {
        tx.try_send(i).expect("should succeed");
    }

    let result = tx.try_send(100);
    assert!(matches!(result, Err(TrySendError::Full(100))));
    assert_eq!(tx.len(), 4);
}

#[tokio::test]
async fn test_send_waits_for_space() {
    let (tx, rx) = channel::<u64>(small(1));
    tx.send(1).await.expect("send failed");

    let producer = {
        let tx = tx.clone();
        tokio::spawn(async move { tx.send(2).await })
    };

    // The second send cannot complete while the single slot is taken.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!producer.is_finished());
    assert_eq!(rx.len(), 1);

    assert_eq!(rx.recv().await, Some(1));
    producer.await.expect("join").expect("send after space freed");
    assert_eq!(rx.recv().await, Some(2));
}

#[tokio::test]
async fn test_close_wakes_blocked_senders() {
    let (tx, rx) = channel::<u64>(small(1));
    tx.send(1).await.expect("send failed");

    let blocked = {
        let tx = tx.clone();
        tokio::spawn(async move { tx.send(2).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(rx.close());
    let result = tokio::time::timeout(Duration::from_secs(1), blocked)
        .await
        .expect("blocked sender must be woken")
        .expect("join");
    assert_eq!(result, Err(QueueError::Closed));
}

#[tokio::test]
async fn test_closed_queue_rejects_and_drains() {
    let (tx, rx) = channel::<u64>(QueueConfig::default());
    tx.send(7).await.expect("send failed");
    tx.send(8).await.expect("send failed");

    let signal = rx.close_signal();
    assert!(signal.close());
    assert!(!signal.close(), "second close is a no-op");

    assert_eq!(tx.send(9).await, Err(QueueError::Closed));
    assert!(matches!(tx.try_send(9), Err(TrySendError::Closed(9))));
    assert!(tx.is_closed());

    // Buffered items survive the close.
    assert_eq!(rx.recv().await, Some(7));
    assert_eq!(rx.recv().await, Some(8));
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_recv_wakes_on_close() {
    let (_tx, rx) = channel::<u64>(QueueConfig::default());
    let signal = rx.close_signal();

    let consumer = tokio::spawn(async move { rx.recv().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    signal.close();

    let item = tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .expect("receiver must observe close")
        .expect("join");
    assert_eq!(item, None);
}

#[tokio::test]
async fn test_discard_remaining() {
    let (tx, rx) = channel::<u64>(small(8));
    for i in 0..5 {
        tx.try_send(i).expect("room");
    }
    rx.close();

    assert_eq!(rx.discard_remaining(), 5);
    assert!(rx.is_empty());
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_recv_is_cancel_safe() {
    let (tx, rx) = channel::<u64>(QueueConfig::default());

    // A recv that loses the race must not swallow the item.
    let raced = tokio::time::timeout(Duration::from_millis(5), rx.recv()).await;
    assert!(raced.is_err());

    tx.send(11).await.expect("send failed");
    assert_eq!(rx.recv().await, Some(11));
}

#[tokio::test]
async fn test_stream_adapter() {
    let (tx, rx) = channel::<u64>(QueueConfig::default());
    for i in 0..3 {
        tx.send(i).await.expect("send failed");
    }
    rx.close();

    let collected: Vec<u64> = rx.into_stream().collect().await;
    assert_eq!(collected, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_fifo_ordering_with_backpressure() {
    let (tx, rx) = channel::<u64>(small(4));

    let producer = tokio::spawn(async move {
        for i in 0..100 {
            tx.send(i).await.expect("send failed");
        }
        tx
    });

    let mut prev = None;
    for _ in 0..100 {
        let item = rx.recv().await.expect("item");
        assert!(rx.len() <= rx.capacity());
        if let Some(p) = prev {
            assert!(item > p, "FIFO violation: {} came after {}", item, p);
        }
        prev = Some(item);
    }

    producer.await.expect("join");
    assert_eq!(prev, Some(99));
}
