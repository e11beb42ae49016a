//! Load testing for the relay.

use std::net::SocketAddr;
use std::time::Instant;

use origin_relay::config::RelayConfig;

mod common;

#[tokio::test]
async fn test_load_performance() {
    let origin_addr: SocketAddr = "127.0.0.1:28501".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:28502".parse().unwrap();

    let image = vec![0x42u8; 64 * 1024];
    common::start_mock_origin(
        origin_addr,
        common::MockResponse::ok(Some("image/jpeg"), image.clone()),
    )
    .await;
    let (shutdown, in_flight) = common::start_relay(relay_addr, RelayConfig::default()).await;

    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task_id in 0..concurrency {
        let client = client.clone();
        let expected_len = image.len();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for n in 0..requests_per_task {
                let url = format!("http://{relay_addr}/plain/http://{origin_addr}/img-{task_id}-{n}.jpg");
                let req_start = Instant::now();
                let Ok(res) = client.get(&url).send().await else {
                    continue;
                };
                if !res.status().is_success() {
                    continue;
                }
                if res.bytes().await.is_ok_and(|b| b.len() == expected_len) {
                    latencies.push(req_start.elapsed());
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    if all_latencies.is_empty() {
        panic!("No successful requests recorded");
    }

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("Success Rate:   {}/{}", all_latencies.len(), total_requests);
    println!("-------------------------\n");

    assert_eq!(all_latencies.len(), total_requests);
    assert!(common::wait_idle(&in_flight).await);
    shutdown.trigger();
}
