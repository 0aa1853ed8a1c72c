// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for ZMQ socket owners over loopback TCP

use botcontrol_transports::blocking;
use botcontrol_transports::prelude::*;
use crossbeam::channel;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Time for a SUB connection to attach before anything is published
const SUBSCRIBE_SETTLE: Duration = Duration::from_millis(300);

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn server_on(port: u16, delay: Duration) -> ZmqReplyServer {
    init_test_logging();
    let config = ServerConfig::new(Endpoint::tcp("127.0.0.1", port)).with_response_delay(delay);
    ZmqReplyServer::new(config).unwrap()
}

fn client_on(port: u16, capacity: usize) -> ZmqClient {
    init_test_logging();
    let config = ClientConfig::new(Endpoint::tcp("127.0.0.1", port)).with_queue_capacity(capacity);
    ZmqClient::new(config).unwrap()
}

fn subscriber_on(port: u16, topics: &[&str]) -> ZmqSubscriber {
    init_test_logging();
    let config = SubscriberConfig::new(Endpoint::tcp("127.0.0.1", port))
        .with_topics(topics.iter().copied())
        .with_loop_delay(Duration::ZERO);
    ZmqSubscriber::new(config).unwrap()
}

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Concurrent synchronous callers each get the reply to their own request
#[test]
fn test_concurrent_sync_requests_get_matching_replies() {
    let server = server_on(32000, Duration::ZERO);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    server.set_handler(move |request| {
        log.lock().push(request.to_string());
        format!("re:{}", request)
    });
    server.start().unwrap();

    let client = Arc::new(client_on(32000, 10));
    client.start().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let request = format!("req-{}", i);
                let reply = client.service_request_sync(request.clone());
                assert_eq!(reply, Some(format!("re:{}", request)));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(seen.lock().len(), 8);
    assert_eq!(client.outstanding(), 0);

    client.terminate();
    server.terminate();
    assert!(client.is_released());
    assert!(server.is_released());
}

/// Requests reach the server in submission order
#[test]
fn test_requests_serviced_in_fifo_order() {
    let server = server_on(32001, Duration::ZERO);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    server.set_handler(move |request| {
        log.lock().push(request.to_string());
        request.to_uppercase()
    });
    server.start().unwrap();

    let client = client_on(32001, 10);
    let records: Vec<_> = ["a", "b", "c", "d"]
        .iter()
        .map(|payload| client.service_request_async(*payload))
        .collect();
    client.start().unwrap();

    for record in &records {
        let reply = record.wait_timeout(Duration::from_secs(5));
        assert_eq!(reply, Some(record.payload().to_uppercase()));
    }
    assert_eq!(*seen.lock(), vec!["a", "b", "c", "d"]);

    client.terminate();
    server.terminate();
}

/// A single-slot request is dropped while another request is in flight
#[test]
fn test_single_slot_drops_while_in_flight() {
    let server = server_on(32002, Duration::from_millis(400));
    server.start().unwrap();

    let client = Arc::new(client_on(32002, 10));
    client.start().unwrap();

    let first = {
        let client = Arc::clone(&client);
        thread::spawn(move || client.service_request_single_sync("first"))
    };
    thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    assert_eq!(client.service_request_single_sync("second"), None);
    assert!(start.elapsed() < Duration::from_millis(200));

    assert_eq!(first.join().unwrap().as_deref(), Some("first"));

    // Slot is free again
    assert_eq!(client.submit("third", false).as_deref(), Some("third"));

    client.terminate();
    server.terminate();
}

/// The handler's result comes back no earlier than the response delay
#[test]
fn test_reply_uses_handler_after_delay() {
    let server = server_on(32003, Duration::from_millis(200));
    server.set_handler(|request| format!("{}-PONG", request));
    server.start().unwrap();

    let client = client_on(32003, 10);
    client.start().unwrap();

    let start = Instant::now();
    let reply = client.submit("PING", true);
    assert_eq!(reply.as_deref(), Some("PING-PONG"));
    assert!(start.elapsed() >= Duration::from_millis(200));

    client.terminate();
    server.terminate();
}

/// Without a handler the server echoes
#[test]
fn test_server_echoes_without_handler() {
    let server = server_on(32004, Duration::ZERO);
    server.start().unwrap();

    let client = client_on(32004, 10);
    client.start().unwrap();
    assert_eq!(client.service_request_sync("PING").as_deref(), Some("PING"));

    server.set_handler(|_| "changed".to_string());
    assert_eq!(client.service_request_sync("PING").as_deref(), Some("changed"));

    client.terminate();
    server.terminate();
}

/// Terminating a server parked in recv finishes promptly and is idempotent
#[test]
fn test_terminate_unblocks_server_in_recv() {
    let server = server_on(32005, Duration::ZERO);
    server.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(server.is_running());

    let start = Instant::now();
    server.terminate();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(server.is_terminated());
    assert!(server.is_released());
    assert!(!server.is_running());

    server.terminate();
    assert!(server.is_released());
}

/// Only subscribed topics reach the listener
#[test]
fn test_subscriber_filters_by_topic() {
    let publisher = ZmqPublisher::with_address("127.0.0.1", 32006).unwrap();
    publisher.start().unwrap();

    let subscriber = subscriber_on(32006, &["turret_pitch"]);
    let (tx, rx) = channel::unbounded();
    subscriber.set_listener(move |topic, payload| {
        let _ = tx.send((topic.to_string(), payload.to_string()));
    });
    subscriber.start().unwrap();
    thread::sleep(SUBSCRIBE_SETTLE);

    publisher.publish("ir", "1,0,1").unwrap();
    publisher.publish("turret_pitch", "42.5").unwrap();

    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)),
        Ok(("turret_pitch".to_string(), "42.5".to_string()))
    );
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());

    subscriber.terminate();
    publisher.terminate();
    assert!(subscriber.is_released());
    assert!(publisher.is_released());
}

/// Topic changes after start are rejected and the pre-start filter stays active
#[test]
fn test_set_topics_after_start_keeps_initial_filter() {
    let publisher = ZmqPublisher::with_address("127.0.0.1", 32007).unwrap();
    publisher.start().unwrap();

    let subscriber = subscriber_on(32007, &["turret_pitch"]);
    let (tx, rx) = channel::unbounded();
    subscriber.set_listener(move |topic, _payload| {
        let _ = tx.send(topic.to_string());
    });
    subscriber.start().unwrap();
    assert!(matches!(
        subscriber.set_topics(["ir"]),
        Err(TransportError::AlreadyRunning)
    ));
    thread::sleep(SUBSCRIBE_SETTLE);

    publisher.publish("ir", "1,0,1").unwrap();
    publisher.publish("turret_pitch", "10").unwrap();

    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)),
        Ok("turret_pitch".to_string())
    );
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());

    subscriber.terminate();
    publisher.terminate();
}

/// An empty topic list receives everything, in publish order
#[test]
fn test_empty_topics_receive_everything() {
    let publisher = ZmqPublisher::with_address("127.0.0.1", 32008).unwrap();
    publisher.start().unwrap();

    let subscriber = subscriber_on(32008, &[]);
    let (tx, rx) = channel::unbounded();
    subscriber.set_listener(move |topic, payload| {
        let _ = tx.send(format!("{}={}", topic, payload));
    });
    subscriber.start().unwrap();
    thread::sleep(SUBSCRIBE_SETTLE);

    publisher.publish("ir", "1,0,1").unwrap();
    publisher.publish("turret_yaw", "90").unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok("ir=1,0,1".to_string()));
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok("turret_yaw=90".to_string()));

    subscriber.terminate();
    publisher.terminate();
}

/// Messages without a topic separator are dropped, later ones still arrive
#[test]
fn test_malformed_messages_are_skipped() {
    let context = zmq::Context::new();
    let raw = context.socket(zmq::PUB).unwrap();
    raw.set_linger(0).unwrap();
    raw.bind("tcp://127.0.0.1:32009").unwrap();

    let subscriber = subscriber_on(32009, &[]);
    let (tx, rx) = channel::unbounded();
    subscriber.set_listener(move |topic, payload| {
        let _ = tx.send((topic.to_string(), payload.to_string()));
    });
    subscriber.start().unwrap();
    thread::sleep(SUBSCRIBE_SETTLE);

    raw.send("garbage", 0).unwrap();
    raw.send("ir 1,0,1", 0).unwrap();

    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2)),
        Ok(("ir".to_string(), "1,0,1".to_string()))
    );
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    subscriber.terminate();
}

/// A full queue blocks producers until the loop drains it
#[test]
fn test_full_queue_blocks_producer() {
    let server = server_on(32010, Duration::ZERO);
    server.start().unwrap();

    // Not started yet: nothing drains the queue
    let client = Arc::new(client_on(32010, 2));
    let first = client.service_request_async("one");
    let second = client.service_request_async("two");

    let (done_tx, done_rx) = channel::bounded(1);
    let producer = {
        let client = Arc::clone(&client);
        thread::spawn(move || {
            let reply = client.service_request_sync("three");
            let _ = done_tx.send(());
            reply
        })
    };

    assert!(done_rx.recv_timeout(Duration::from_millis(300)).is_err());

    client.start().unwrap();
    assert_eq!(producer.join().unwrap().as_deref(), Some("three"));
    assert_eq!(first.wait_timeout(Duration::from_secs(2)).as_deref(), Some("one"));
    assert_eq!(second.wait_timeout(Duration::from_secs(2)).as_deref(), Some("two"));

    client.terminate();
    server.terminate();
}

/// A thread that may not block gets control back before teardown completes
#[test]
fn test_terminate_from_nonblocking_thread() {
    let server = Arc::new(server_on(32011, Duration::ZERO));
    server.start().unwrap();
    thread::sleep(Duration::from_millis(50));

    let remote = Arc::clone(&server);
    thread::spawn(move || {
        blocking::mark_current_thread_nonblocking();
        remote.terminate();
    })
    .join()
    .unwrap();

    assert!(server.is_terminated());
    assert!(wait_until(Duration::from_secs(5), || server.is_released()));
}

/// A handler may terminate its own server
#[test]
fn test_handler_can_terminate_its_server() {
    let server = server_on(32012, Duration::from_millis(50));
    let terminator = server.terminator();
    server.set_handler(move |request| {
        if request == "quit" {
            terminator.terminate();
        }
        "bye".to_string()
    });
    server.start().unwrap();

    let client = client_on(32012, 10);
    client.start().unwrap();
    let record = client.service_request_async("quit");

    assert!(wait_until(Duration::from_secs(5), || server.is_released()));
    assert!(server.is_terminated());
    // Interrupted during the response delay, so no reply was sent
    assert_eq!(record.wait_timeout(Duration::from_millis(200)), None);

    client.terminate();
    assert!(client.is_released());
}

/// A client blocked waiting on an absent server terminates promptly
#[test]
fn test_client_terminate_while_waiting_for_reply() {
    let client = client_on(32014, 10);
    client.start().unwrap();
    let record = client.service_request_async("PING");
    thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    client.terminate();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(client.is_released());
    assert!(!record.is_serviced());

    // Terminated clients reject without blocking
    assert_eq!(client.service_request_sync("PING"), None);
}

/// Dropping without terminate still releases the socket
#[test]
fn test_drop_releases_bound_port() {
    let server = server_on(32015, Duration::ZERO);
    server.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    drop(server);

    let server = server_on(32015, Duration::ZERO);
    server.start().unwrap();

    let client = client_on(32015, 10);
    client.start().unwrap();
    assert_eq!(client.service_request_sync("again").as_deref(), Some("again"));

    client.terminate();
    server.terminate();
}
