use std::time::Duration;

use crate::net::{Runtime, connect_tcp};

#[tokio::test]
async fn test_tcp_connect_invalid() {
    let result = connect_tcp("invalid:99999", Duration::from_secs(1)).await;
    assert!(matches!(result, Ok(Err(_))));
}

#[tokio::test]
async fn test_tcp_connect_refused() {
    // Bind then drop to find a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = connect_tcp(&addr, Duration::from_secs(1)).await;
    assert!(matches!(result, Ok(Err(_))));
}

#[tokio::test]
async fn test_runtime_helpers() {
    let start = Runtime::now();
    Runtime::sleep(Duration::from_millis(10)).await;
    assert!(start.elapsed() >= Duration::from_millis(10));

    let result = Runtime::timeout(Duration::from_secs(1), async { 42 }).await;
    assert_eq!(result.unwrap(), 42);

    let result = Runtime::timeout(
        Duration::from_millis(10),
        Runtime::sleep(Duration::from_secs(1)),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_spawn() {
    let handle = Runtime::spawn(async { 42 });
    assert_eq!(handle.await.unwrap(), 42);
}
