//! Integration tests for the dispatch loop.

mod helpers;

use helpers::mock_handler::{event, RecordingHandler};
use statewatch::app::Dispatcher;
use statewatch::source;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[tokio::test]
async fn test_events_are_handled_in_order() {
    // Arrange
    let handler = RecordingHandler::new();
    let (events_tx, events_rx) = mpsc::channel(10);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = Dispatcher::new(Arc::new(handler.clone()));

    for name in ["first", "second", "third"] {
        events_tx.send(event(name)).await.unwrap();
    }
    drop(events_tx);

    // Act
    let handled = dispatcher.run(events_rx, shutdown_rx).await;

    // Assert
    assert_eq!(handled, 3);
    assert_eq!(handler.seen(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_failed_delivery_does_not_stop_dispatch() {
    let handler = RecordingHandler::failing_on(&["bad"]);
    let (events_tx, events_rx) = mpsc::channel(10);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    for name in ["ok-1", "bad", "ok-2"] {
        events_tx.send(event(name)).await.unwrap();
    }
    drop(events_tx);

    let handled = Dispatcher::new(Arc::new(handler.clone()))
        .run(events_rx, shutdown_rx)
        .await;

    assert_eq!(handled, 3);
    assert_eq!(handler.seen(), vec!["ok-1", "bad", "ok-2"]);
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_delivery_finish() {
    // Arrange
    let handler = RecordingHandler::with_delay(Duration::from_millis(200));
    let (events_tx, events_rx) = mpsc::channel(10);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatch_task = tokio::spawn(
        Dispatcher::new(Arc::new(handler.clone())).run(events_rx, shutdown_rx),
    );

    events_tx.send(event("slow")).await.unwrap();
    events_tx.send(event("queued")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Act
    shutdown_tx.send(true).unwrap();
    let handled = tokio::time::timeout(Duration::from_secs(5), dispatch_task)
        .await
        .expect("dispatcher did not shut down")
        .unwrap();

    // Assert
    assert_eq!(handled, 1);
    assert_eq!(handler.seen(), vec!["slow"]);
}

#[tokio::test]
async fn test_source_feeds_dispatcher() {
    let input: &'static [u8] = br#"{"kind":"Deployment","name":"api","namespace":"prod","reason":"update","status":"Warning"}
{"kind":"Namespace","name":"prod","reason":"delete","status":"Danger"}
"#;
    let handler = RecordingHandler::new();
    let (events_tx, events_rx) = mpsc::channel(10);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = tokio::spawn(source::read_events(input, events_tx));
    let handled = Dispatcher::new(Arc::new(handler.clone()))
        .run(events_rx, shutdown_rx)
        .await;

    assert_eq!(reader.await.unwrap().unwrap(), 2);
    assert_eq!(handled, 2);
    assert_eq!(handler.seen(), vec!["api", "prod"]);
}
