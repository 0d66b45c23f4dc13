//! Vendor resolution against a local stand-in for the lookup service.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use lanwatch_core::types::UNKNOWN_DEVICE;
use lanwatch_discover::config::VendorConfig;
use lanwatch_discover::vendor::VendorResolver;

#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

async fn vendor_by_mac(
    State(hits): State<Hits>,
    Path(mac): Path<String>,
) -> (StatusCode, String) {
    hits.0.fetch_add(1, Ordering::SeqCst);
    match &mac[..8] {
        "50:C7:BF" => (StatusCode::OK, "TP-LINK TECHNOLOGIES CO.,LTD.\n".to_string()),
        "B8:27:EB" => (StatusCode::OK, "Raspberry Pi Foundation".to_string()),
        "DE:AD:00" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, "Too Late Inc.".to_string())
        }
        "00:00:00" => (StatusCode::OK, "   ".to_string()),
        _ => (
            StatusCode::NOT_FOUND,
            r#"{"errors":{"detail":"Not Found"}}"#.to_string(),
        ),
    }
}

async fn spawn_lookup_service() -> (SocketAddr, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/{mac}", get(vendor_by_mac))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

fn resolver(addr: SocketAddr, timeout_ms: u64) -> VendorResolver {
    VendorResolver::new(&VendorConfig {
        endpoint: format!("http://{addr}/"),
        timeout_ms,
        ..Default::default()
    })
}

#[tokio::test]
async fn known_vendor_gets_brand_label() {
    let (addr, _) = spawn_lookup_service().await;
    let r = resolver(addr, 1000);

    assert_eq!(
        r.resolve("50:c7:bf:11:22:33").await,
        "TP-Link Router (TP-LINK TECHNOLOGIES CO.,LTD.)"
    );
    assert_eq!(
        r.resolve("B8-27-EB-01-02-03").await,
        "Raspberry Pi (Raspberry Pi Foundation)"
    );
}

#[tokio::test]
async fn not_found_is_unknown() {
    let (addr, _) = spawn_lookup_service().await;
    let r = resolver(addr, 1000);
    assert_eq!(r.resolve("12:34:56:78:9A:BC").await, UNKNOWN_DEVICE);
}

#[tokio::test]
async fn empty_body_is_unknown() {
    let (addr, _) = spawn_lookup_service().await;
    let r = resolver(addr, 1000);
    assert_eq!(r.resolve("00:00:00:11:22:33").await, UNKNOWN_DEVICE);
}

#[tokio::test]
async fn slow_lookup_times_out_to_unknown() {
    let (addr, _) = spawn_lookup_service().await;
    let r = resolver(addr, 150);

    let started = std::time::Instant::now();
    assert_eq!(r.resolve("DE:AD:00:00:00:01").await, UNKNOWN_DEVICE);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn lookups_are_cached_per_prefix() {
    let (addr, hits) = spawn_lookup_service().await;
    let r = resolver(addr, 1000);

    let first = r.resolve("50:C7:BF:00:00:01").await;
    let second = r.resolve("50:C7:BF:00:00:02").await;
    assert_eq!(first, second);
    assert_eq!(hits.0.load(Ordering::SeqCst), 1);

    // Failures are not cached.
    r.resolve("12:34:56:78:9A:BC").await;
    r.resolve("12:34:56:78:9A:BC").await;
    assert_eq!(hits.0.load(Ordering::SeqCst), 3);
}
