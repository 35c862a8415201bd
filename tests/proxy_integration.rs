//! End-to-end scenarios against a stub origin, mirroring the spec's S1–S5
//! round-trip scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use capstone_proxy::Cache;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Spawns a proxy that accepts connections on an ephemeral port for the
/// lifetime of the test, sharing one cache across every accepted client.
async fn spawn_proxy() -> (std::net::SocketAddr, Cache) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cache = Cache::new();
    let cache_for_task = cache.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, peer)) = listener.accept().await else {
                return;
            };
            let cache = cache_for_task.clone();
            tokio::spawn(async move {
                capstone_proxy::handle_connection(stream, peer, cache).await;
            });
        }
    });
    (addr, cache)
}

/// Spawns a stub origin that serves `response` for every connection it
/// accepts, counting how many connections it has seen.
async fn spawn_stub_origin(response: &'static [u8]) -> (std::net::SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                // Drain the request so the proxy's write doesn't block.
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response).await;
            });
        }
    });
    (addr, hits)
}

async fn send_request(proxy_addr: std::net::SocketAddr, request: &str) -> Vec<u8> {
    let mut client = TcpStream::connect(proxy_addr).await.unwrap();
    client.write_all(request.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn s1_miss_then_hit() {
    let body = b"HTTP/1.0 200 OK\r\nContent-Length: 3\r\n\r\nabc";
    let (origin_addr, origin_hits) = spawn_stub_origin(body).await;
    let (proxy_addr, _cache) = spawn_proxy().await;

    let request = format!(
        "GET http://{}/x HTTP/1.0\r\n\r\n",
        origin_addr
    );

    let first = send_request(proxy_addr, &request).await;
    assert_eq!(first, body);
    assert_eq!(origin_hits.load(Ordering::SeqCst), 1);

    let second = send_request(proxy_addr, &request).await;
    assert_eq!(second, body);
    assert_eq!(origin_hits.load(Ordering::SeqCst), 1, "second request should be served from cache");
}

#[tokio::test]
async fn s3_oversize_response_is_forwarded_but_not_cached() {
    let mut body = Vec::from(&b"HTTP/1.0 200 OK\r\nContent-Length: 204800\r\n\r\n"[..]);
    body.extend(std::iter::repeat(b'x').take(200 * 1024));
    let body: &'static [u8] = Box::leak(body.into_boxed_slice());
    let (origin_addr, origin_hits) = spawn_stub_origin(body).await;
    let (proxy_addr, _cache) = spawn_proxy().await;

    let request = format!("GET http://{}/big HTTP/1.0\r\n\r\n", origin_addr);

    let first = send_request(proxy_addr, &request).await;
    assert_eq!(first.len(), body.len());
    assert_eq!(origin_hits.load(Ordering::SeqCst), 1);

    let second = send_request(proxy_addr, &request).await;
    assert_eq!(second.len(), body.len());
    assert_eq!(
        origin_hits.load(Ordering::SeqCst),
        2,
        "oversize response must not be cached"
    );
}

#[tokio::test]
async fn s4_non_get_method_gets_501_and_no_origin_connection() {
    let (_origin_addr, origin_hits) = spawn_stub_origin(b"unused").await;
    let (proxy_addr, _cache) = spawn_proxy().await;

    let response = send_request(proxy_addr, "POST / HTTP/1.0\r\n\r\n").await;
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.0 501 Not Implemented\r\n"));
    assert_eq!(origin_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn s5_malformed_request_gets_400() {
    let (proxy_addr, _cache) = spawn_proxy().await;
    let response = send_request(proxy_addr, "GARBAGE\r\n\r\n").await;
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.0 400 Bad Request\r\n"));
}

#[tokio::test]
async fn s6_concurrent_requests_for_the_same_uri_converge() {
    let body = b"HTTP/1.0 200 OK\r\nContent-Length: 5\r\n\r\nhello";
    let (origin_addr, origin_hits) = spawn_stub_origin(body).await;
    let (proxy_addr, cache) = spawn_proxy().await;

    let request = format!("GET http://{}/shared HTTP/1.0\r\n\r\n", origin_addr);

    let mut handles = Vec::new();
    for _ in 0..32 {
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            send_request(proxy_addr, &request).await
        }));
    }
    for handle in handles {
        let got = handle.await.unwrap();
        assert_eq!(got, body);
    }

    let hits = origin_hits.load(Ordering::SeqCst);
    assert!((1..=32).contains(&hits));
    assert!(!cache.is_empty().await);
}
