//! Concurrent load through the gateway.

use std::time::{Duration, Instant};

use spa_gateway::config::{GatewayConfig, RouteConfig, UpstreamConfig};

mod common;

#[tokio::test]
async fn test_concurrent_requests() {
    let backend = common::start_mock_backend("Hello from backend").await;

    let mut config = GatewayConfig::default();
    config
        .upstreams
        .push(UpstreamConfig::new("backend", "127.0.0.1", backend.port()));
    config.routes.push(RouteConfig::prefix("/", "backend"));
    let gateway = common::start_gateway(config).await;

    let client = common::client();
    let total_requests = 200;
    let concurrency = 20;
    let start = Instant::now();

    let mut handles = Vec::new();
    for worker in 0..concurrency {
        let client = client.clone();
        let base = gateway.url("/load");
        handles.push(tokio::spawn(async move {
            let mut ok = 0;
            for i in 0..total_requests / concurrency {
                let res = client
                    .get(format!("{base}/{worker}/{i}"))
                    .send()
                    .await
                    .unwrap();
                if res.status() == 200 && res.text().await.unwrap() == "Hello from backend" {
                    ok += 1;
                }
            }
            ok
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        succeeded += handle.await.unwrap();
    }
    let elapsed = start.elapsed();

    println!(
        "{} requests in {:?} ({:.0} req/s)",
        total_requests,
        elapsed,
        total_requests as f64 / elapsed.as_secs_f64()
    );
    assert_eq!(succeeded, total_requests);
    assert!(elapsed < Duration::from_secs(30));
}
