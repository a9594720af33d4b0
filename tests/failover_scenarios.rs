//! End-to-end failover behavior through the manager facade.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use rpc_failover::config::{EndpointConfig, FailoverConfig, HealthCheckConfig, SelectionMode};
use rpc_failover::failover::AttemptFailure;
use rpc_failover::health::{EndpointStatus, Probe};
use rpc_failover::{Endpoint, FailoverError, OperationError, RpcManager};

mod common;

/// Probe reporting failure for every endpoint in `down`.
#[derive(Default)]
struct ScriptedProbe {
    down: Mutex<HashSet<String>>,
}

impl ScriptedProbe {
    fn set_down(&self, name: &str, down: bool) {
        let mut set = self.down.lock().unwrap();
        if down {
            set.insert(name.to_string());
        } else {
            set.remove(name);
        }
    }
}

impl Probe for ScriptedProbe {
    fn probe<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<(), OperationError>> {
        let down = self.down.lock().unwrap().contains(endpoint.name());
        Box::pin(async move {
            if down {
                Err(OperationError::transient("probe failed"))
            } else {
                Ok(())
            }
        })
    }
}

fn endpoint(name: &str, priority: i64) -> EndpointConfig {
    EndpointConfig::new(
        name,
        format!("https://{}.example", name),
        format!("wss://{}.example", name),
    )
    .with_priority(priority)
}

fn manager_with(
    selection: SelectionMode,
    endpoints: Vec<EndpointConfig>,
) -> (RpcManager, Arc<ScriptedProbe>) {
    let probe = Arc::new(ScriptedProbe::default());
    let manager = RpcManager::with_probe(
        HealthCheckConfig::default(),
        FailoverConfig {
            selection,
            ..FailoverConfig::default()
        },
        probe.clone(),
    );
    manager.register_all(endpoints).unwrap();
    (manager, probe)
}

async fn served_by(manager: &RpcManager) -> String {
    manager
        .execute("get_slot", |ep| async move { Ok::<_, OperationError>(ep.name().to_string()) })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_highest_priority_endpoint_serves_first() {
    let (manager, _) = manager_with(
        SelectionMode::Sticky,
        vec![endpoint("p25", 25), endpoint("p100", 100), endpoint("p50", 50)],
    );

    assert_eq!(served_by(&manager).await, "p100");
    assert_eq!(manager.summary().current_endpoint.as_deref(), Some("p100"));
}

#[tokio::test]
async fn test_sticky_endpoint_survives_primary_recovery() {
    let (manager, probe) = manager_with(
        SelectionMode::Sticky,
        vec![endpoint("p100", 100), endpoint("p50", 50), endpoint("p25", 25)],
    );

    assert_eq!(served_by(&manager).await, "p100");
    assert_eq!(manager.summary().failover_count, 0);

    // The primary goes down between calls.
    let p100 = manager.registry().get("p100").unwrap();
    for _ in 0..3 {
        p100.record_failure(EndpointStatus::Failed);
    }
    assert_eq!(served_by(&manager).await, "p50");
    assert_eq!(manager.summary().failover_count, 1);

    // It comes back, but the working endpoint stays current.
    probe.set_down("p100", false);
    manager.probe_all().await;
    assert!(p100.is_available());

    assert_eq!(served_by(&manager).await, "p50");
    assert_eq!(served_by(&manager).await, "p50");

    let summary = manager.summary();
    assert_eq!(summary.current_endpoint.as_deref(), Some("p50"));
    assert_eq!(summary.failover_count, 1);
    assert_eq!(summary.available_endpoints, 3);
}

#[tokio::test]
async fn test_prefer_highest_returns_to_recovered_primary() {
    let (manager, probe) = manager_with(
        SelectionMode::PreferHighest,
        vec![endpoint("p100", 100), endpoint("p50", 50)],
    );

    probe.set_down("p100", true);
    for _ in 0..3 {
        manager.probe_all().await;
    }
    assert_eq!(served_by(&manager).await, "p50");

    probe.set_down("p100", false);
    manager.probe_all().await;
    assert_eq!(served_by(&manager).await, "p100");
}

#[tokio::test]
async fn test_failing_endpoint_excluded_until_probe_success() {
    let (manager, probe) = manager_with(
        SelectionMode::Sticky,
        vec![endpoint("a", 10), endpoint("b", 5)],
    );

    for _ in 0..3 {
        // Forget the sticky endpoint so every call starts at "a".
        manager.policy().reset();
        let served = manager
            .execute("get_slot", |ep| async move {
                if ep.name() == "a" {
                    Err(OperationError::from_message("connection reset by peer"))
                } else {
                    Ok(ep.name().to_string())
                }
            })
            .await
            .unwrap();
        assert_eq!(served, "b");
    }

    let a = manager.registry().get("a").unwrap();
    assert!(!a.is_available());
    assert_eq!(a.health().consecutive_failures, 3);

    manager.policy().reset();
    assert_eq!(served_by(&manager).await, "b");

    // A failing probe keeps it excluded; a passing one restores it.
    probe.set_down("a", true);
    manager.probe_all().await;
    assert!(!a.is_available());

    probe.set_down("a", false);
    manager.probe_all().await;
    assert!(a.is_available());
    manager.policy().reset();
    assert_eq!(served_by(&manager).await, "a");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_endpoint_excluded_for_exact_cooldown() {
    let (manager, _) = manager_with(
        SelectionMode::Sticky,
        vec![
            endpoint("primary", 10).with_cooldown(Duration::from_secs(10)),
            endpoint("backup", 5),
        ],
    );

    let served = manager
        .execute("get_slot", |ep| async move {
            if ep.name() == "primary" {
                Err(OperationError::from_message("HTTP 429 Too Many Requests"))
            } else {
                Ok(ep.name().to_string())
            }
        })
        .await
        .unwrap();
    assert_eq!(served, "backup");

    let primary = manager.registry().get("primary").unwrap();
    assert_eq!(primary.health().consecutive_failures, 0);
    assert!(!primary.is_available());

    tokio::time::advance(Duration::from_millis(9_999)).await;
    assert!(!primary.is_available());

    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(primary.is_available());
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_hint_overrides_cooldown() {
    let (manager, _) = manager_with(
        SelectionMode::Sticky,
        vec![endpoint("primary", 10), endpoint("backup", 5)],
    );

    manager
        .execute("get_slot", |ep| async move {
            if ep.name() == "primary" {
                Err(OperationError::RateLimited {
                    message: "slow down".to_string(),
                    retry_after: Some(Duration::from_secs(3)),
                })
            } else {
                Ok(())
            }
        })
        .await
        .unwrap();

    let primary = manager.registry().get("primary").unwrap();
    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(primary.is_available());
}

#[tokio::test]
async fn test_exhaustion_tries_each_endpoint_exactly_once() {
    let (manager, _) = manager_with(
        SelectionMode::Sticky,
        vec![endpoint("a", 3), endpoint("b", 2), endpoint("c", 1)],
    );

    let calls: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
    let seen = calls.clone();
    let err = manager
        .execute("get_slot", move |ep| {
            *seen.lock().unwrap().entry(ep.name().to_string()).or_default() += 1;
            async { Err::<(), _>(OperationError::transient("upstream unavailable")) }
        })
        .await
        .unwrap_err();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls.values().all(|&count| count == 1));

    match err {
        FailoverError::NoAvailableEndpoint { operation, attempts } => {
            assert_eq!(operation, "get_slot");
            let names: Vec<&str> = attempts.iter().map(|a| a.endpoint.as_str()).collect();
            assert_eq!(names, vec!["a", "b", "c"]);
            assert!(attempts
                .iter()
                .all(|a| matches!(a.failure, AttemptFailure::Failed(OperationError::Transient(_)))));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(manager.summary().failover_count, 3);
}

#[tokio::test]
async fn test_fatal_error_is_not_retried() {
    let (manager, _) = manager_with(
        SelectionMode::Sticky,
        vec![endpoint("a", 2), endpoint("b", 1)],
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let err = manager
        .execute("send_transaction", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(OperationError::fatal("transaction signature verification failure")) }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, FailoverError::Operation { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let summary = manager.summary();
    assert_eq!(summary.fatal_error_count, 1);
    assert_eq!(summary.available_endpoints, 2);
    assert!(summary.endpoints.iter().all(|s| s.consecutive_failures == 0));
}

#[tokio::test]
async fn test_executes_real_json_rpc_calls_with_failover() {
    let broken = common::start_mock_backend(common::MockResponse::status(503)).await;
    let healthy = common::start_mock_backend(common::rpc_result()).await;

    let (manager, _) = manager_with(
        SelectionMode::Sticky,
        vec![
            common::endpoint_for("broken", broken).with_priority(10),
            common::endpoint_for("healthy", healthy).with_priority(5),
        ],
    );
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let slot = manager
        .execute("get_slot", |ep| {
            let client = client.clone();
            async move {
                let body: serde_json::Value = client
                    .post(ep.http_url())
                    .json(&serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "getSlot"}))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok::<_, OperationError>(body["result"]["context"]["slot"].as_u64().unwrap_or_default())
            }
        })
        .await
        .unwrap();

    assert_eq!(slot, 1);
    let broken = manager.registry().get("broken").unwrap().health();
    assert_eq!(broken.consecutive_failures, 1);
    assert_eq!(manager.summary().current_endpoint.as_deref(), Some("healthy"));
}
