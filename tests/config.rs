//! Registry behavior under concurrency, and process-wide initialization.

mod common;

use common::{registry_for, spawn_pong_server};
use redis_worker::{
    initialize, Command, Registry, WorkerClient, Workspace, DEFAULT_PORT, DEFAULT_TIMEOUT,
};
use std::sync::Arc;

#[tokio::test]
async fn reconfigure_then_ping() {
    let addr = spawn_pong_server().await;

    let registry = Arc::new(Registry::default());
    registry.reconfigure(addr.ip(), i32::from(addr.port()), 1_000);

    let mut client = WorkerClient::new(registry);
    let mut ws = Workspace::new();
    let result = client.execute(&mut ws, &Command::new("PING")).await.unwrap();
    assert_eq!(result.as_deref(), Some(&b"PONG"[..]));
}

#[tokio::test]
async fn initialize_is_idempotent_and_defaulted() {
    let first = initialize();
    let second = initialize();
    assert!(Arc::ptr_eq(&first, &second));

    let config = first.current();
    assert_eq!(config.host(), "127.0.0.1");
    assert_eq!(config.port(), DEFAULT_PORT);
    assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
}

#[tokio::test]
async fn reconfigure_races_with_inflight_commands() {
    let addr = spawn_pong_server().await;
    let registry = registry_for(addr);

    // Republishing the config (same address, varying timeout) while workers
    // hammer the server: every in-flight call keeps the snapshot it started
    // with and must complete normally.
    let reconfigurer = {
        let registry = registry.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                registry.reconfigure(addr.ip(), i32::from(addr.port()), 500 + i64::from(i));
                tokio::task::yield_now().await;
            }
        })
    };

    let mut workers = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        workers.push(tokio::spawn(async move {
            let mut client = WorkerClient::new(registry);
            let mut ws = Workspace::new();
            let ping = Command::new("PING");
            for _ in 0..50 {
                let result = client.execute(&mut ws, &ping).await.unwrap();
                assert_eq!(result.as_deref(), Some(&b"PONG"[..]));
            }
        }));
    }

    reconfigurer.await.unwrap();
    for worker in workers {
        worker.await.unwrap();
    }
}
