use mcp_pool_sim::config::{ServerConfig, SimulationProfile};
use mcp_pool_sim::error::{Error, Result};
use mcp_pool_sim::server::{ConnectionState, PoolObserver, ServerStatus, SimulatorOptions};
use mcp_pool_sim::{ImportReport, PoolManager};
use mockall::mock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mock! {
    pub Observer {}

    impl PoolObserver for Observer {
        fn server_changed(&self, status: &ServerStatus);
        fn statuses_changed(&self, statuses: Vec<ServerStatus>);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Server(String),
    Pool(Vec<String>),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl PoolObserver for Recorder {
    fn server_changed(&self, status: &ServerStatus) {
        self.events.lock().unwrap().push(Event::Server(status.id.clone()));
    }

    fn statuses_changed(&self, statuses: Vec<ServerStatus>) {
        let ids = statuses.into_iter().map(|status| status.id).collect();
        self.events.lock().unwrap().push(Event::Pool(ids));
    }
}

// Helper function to create a pool whose connects always succeed
fn reliable_pool() -> PoolManager {
    PoolManager::with_options(SimulatorOptions {
        profile: SimulationProfile {
            connect_failure_rate: 0.0,
            ..SimulationProfile::default()
        },
        seed: Some(1),
        ..SimulatorOptions::default()
    })
    .unwrap()
}

fn server(id: &str) -> ServerConfig {
    ServerConfig::new(id, format!("Server {}", id), format!("ws://localhost/{}", id))
}

#[tokio::test(start_paused = true)]
async fn test_connect_all_settles_every_server() {
    let pool = PoolManager::new();
    pool.add_server("s1", server("s1")).unwrap();

    let results = pool.connect_all().await;

    assert_eq!(results.len(), 1);
    let state = results[0].1.as_ref().unwrap();
    assert!(matches!(state, ConnectionState::Connected | ConnectionState::Error));

    let statuses = pool.get_all_statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].id, "s1");
    assert_eq!(statuses[0].status, *state);
}

#[tokio::test(start_paused = true)]
async fn test_connect_all_runs_concurrently() {
    let pool = reliable_pool();
    for i in 0..5 {
        let id = format!("s{}", i);
        pool.add_server(id.clone(), server(&id)).unwrap();
    }

    let started = tokio::time::Instant::now();
    let results = pool.connect_all().await;

    // each attempt takes at least a second; serial connects would need five
    assert!(started.elapsed() < Duration::from_millis(3000));
    assert!(
        results
            .iter()
            .all(|(_, result)| matches!(result, Ok(ConnectionState::Connected)))
    );

    let summary = pool.summary();
    assert_eq!(summary.total_servers, 5);
    assert_eq!(summary.connected, 5);
    assert!(summary.active_connections >= 5);
}

#[tokio::test(start_paused = true)]
async fn test_connect_all_tolerates_failures() {
    let pool = PoolManager::with_options(SimulatorOptions {
        profile: SimulationProfile {
            connect_failure_rate: 1.0,
            ..SimulationProfile::default()
        },
        ..SimulatorOptions::default()
    })
    .unwrap();
    pool.add_server("a", server("a")).unwrap();
    pool.add_server("b", server("b")).unwrap();

    let results = pool.connect_all().await;

    assert_eq!(results.len(), 2);
    assert!(
        results
            .iter()
            .all(|(_, result)| matches!(result, Ok(ConnectionState::Error)))
    );
    assert_eq!(pool.summary().errored, 2);
}

#[tokio::test(start_paused = true)]
async fn test_connect_all_reports_already_connected() {
    let pool = reliable_pool();
    pool.add_server("a", server("a")).unwrap();
    pool.connect_all().await;

    let results = pool.connect_all().await;

    assert!(matches!(&results[0], (id, Err(Error::AlreadyConnected(_))) if id == "a"));
    assert_eq!(pool.get_server("a").unwrap().state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_all() {
    let pool = reliable_pool();
    pool.add_server("a", server("a")).unwrap();
    pool.add_server("b", server("b")).unwrap();
    pool.connect_all().await;

    pool.disconnect_all().await;

    for id in pool.server_ids() {
        let simulator = pool.get_server(&id).unwrap();
        assert_eq!(simulator.state(), ConnectionState::Disconnected);
        assert!(!simulator.has_active_timers());
    }
    let summary = pool.summary();
    assert_eq!(summary.disconnected, 2);
    assert_eq!(summary.active_connections + summary.idle_connections, 0);
}

#[test]
fn test_import_rejects_missing_fields() {
    let pool = PoolManager::new();

    let report = pool.import_configurations(r#"{"id":"a"}"#);

    assert_eq!(
        report,
        ImportReport {
            success: 0,
            errors: vec!["Configuration 1: Missing required fields".to_string()],
        }
    );
    assert!(pool.is_empty());
}

#[test]
fn test_import_rejects_invalid_json() {
    let pool = PoolManager::new();

    let report = pool.import_configurations("not json");

    assert_eq!(report.success, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Invalid JSON: "));
    assert!(pool.is_empty());
}

#[test]
fn test_import_keeps_valid_entries() {
    let pool = PoolManager::new();

    let report = pool.import_configurations(
        r#"[
            {"id": "a", "name": "A", "endpoint": "ws://a"},
            {"id": "b", "name": "", "endpoint": "ws://b"},
            {"id": "c", "name": "C", "endpoint": "ws://c", "authMethod": "api-key"}
        ]"#,
    );

    assert_eq!(report.success, 2);
    assert_eq!(report.errors, vec!["Configuration 2: Missing required fields"]);
    assert_eq!(pool.server_ids(), vec!["a", "c"]);
    let c = pool.get_server("c").unwrap();
    assert_eq!(c.config().auth_method.as_deref(), Some("api-key"));
}

#[test]
fn test_export_then_import_round_trip() -> Result<()> {
    let source = PoolManager::new();
    let mut docs = server("docs").with_description("Document store");
    docs.extra.insert("region".to_string(), "eu-west-1".into());
    source.add_server("docs", docs.clone()).unwrap();
    source.add_server("search", server("search").with_auth_method("bearer")).unwrap();

    let exported = source.export_all_configurations()?;

    let document: serde_json::Value = serde_json::from_str(&exported)?;
    assert_eq!(document["totalServers"], 2);
    assert_eq!(document["version"], "1.0");
    assert_eq!(document["configurations"][0]["id"], "docs");
    assert!(document["configurations"][0]["exportedAt"].is_string());

    let target = PoolManager::new();
    let report = target.import_configurations(&exported);

    assert_eq!(report.success, 2);
    assert!(report.errors.is_empty());
    assert_eq!(target.server_ids(), vec!["docs", "search"]);
    assert_eq!(target.get_server("docs").unwrap().config(), &docs);
    assert_eq!(
        target.get_server("search").unwrap().config().auth_method.as_deref(),
        Some("bearer")
    );

    // importing the same document again replaces rather than duplicates
    let report = target.import_configurations(&exported);
    assert_eq!(report.success, 2);
    assert_eq!(target.len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_add_server_replaces_existing() {
    let pool = reliable_pool();
    let first = pool.add_server("a", server("a")).unwrap();
    first.connect().await.unwrap();
    assert!(first.has_active_timers());

    let second = pool.add_server("a", server("a").with_description("replacement")).unwrap();

    assert_eq!(pool.len(), 1);
    assert_eq!(first.state(), ConnectionState::Disconnected);
    assert!(!first.has_active_timers());
    assert_eq!(second.state(), ConnectionState::Disconnected);
    assert_eq!(
        pool.get_server("a").unwrap().config().description.as_deref(),
        Some("replacement")
    );
}

#[test]
fn test_add_server_uses_pool_key_as_id() {
    let pool = PoolManager::new();

    let simulator = pool.add_server("key", server("other")).unwrap();

    assert_eq!(simulator.id(), "key");
    assert_eq!(pool.get_all_statuses()[0].id, "key");
    assert!(pool.get_server("other").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_remove_server() {
    let pool = reliable_pool();
    let recorder = Arc::new(Recorder::default());
    let simulator = pool.add_server("a", server("a")).unwrap();
    simulator.connect().await.unwrap();
    pool.set_shared_observer(recorder.clone());

    assert!(pool.remove_server("a").await);

    assert!(pool.is_empty());
    assert_eq!(simulator.state(), ConnectionState::Disconnected);
    assert!(!simulator.has_active_timers());
    assert_eq!(recorder.events().last(), Some(&Event::Pool(vec![])));

    // no further notifications once the server is gone
    let seen = recorder.events().len();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(recorder.events().len(), seen);
}

#[tokio::test]
async fn test_remove_unknown_server_is_silent() {
    let pool = PoolManager::new();
    pool.add_server("a", server("a")).unwrap();

    let mut observer = MockObserver::new();
    observer.expect_server_changed().never();
    observer.expect_statuses_changed().never();
    pool.set_observer(observer);

    assert!(!pool.remove_server("missing").await);
    assert_eq!(pool.len(), 1);
}

#[test]
fn test_membership_change_notifies_pool_only() {
    let pool = PoolManager::new();

    let mut observer = MockObserver::new();
    observer.expect_server_changed().never();
    observer
        .expect_statuses_changed()
        .withf(|statuses: &Vec<ServerStatus>| statuses.len() == 1 && statuses[0].id == "a")
        .times(1)
        .return_const(());
    pool.set_observer(observer);

    pool.add_server("a", server("a")).unwrap();

    // dropping the pool drops the mock, which checks the call count
    drop(pool);
}

#[tokio::test(start_paused = true)]
async fn test_server_event_precedes_pool_event() {
    let pool = reliable_pool();
    let recorder = Arc::new(Recorder::default());
    pool.set_shared_observer(recorder.clone());

    pool.add_server("b", server("b")).unwrap();
    pool.add_server("a", server("a")).unwrap();
    pool.connect_all().await;

    let events = recorder.events();
    assert_eq!(events[0], Event::Pool(vec!["b".to_string()]));
    assert_eq!(
        events[1],
        Event::Pool(vec!["a".to_string(), "b".to_string()])
    );

    let mut server_events = 0;
    for (i, event) in events.iter().enumerate() {
        if let Event::Server(_) = event {
            server_events += 1;
            assert!(
                matches!(events.get(i + 1), Some(Event::Pool(ids)) if ids.len() == 2),
                "server event at {} not followed by a pool event",
                i
            );
        }
    }
    // connecting and connected for both servers
    assert!(server_events >= 4);
}

#[tokio::test(start_paused = true)]
async fn test_clear_observer_stops_notifications() {
    let pool = reliable_pool();
    let recorder = Arc::new(Recorder::default());
    pool.set_shared_observer(recorder.clone());
    pool.add_server("a", server("a")).unwrap();

    pool.clear_observer();
    pool.connect_all().await;

    assert_eq!(recorder.events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connection_through_pool() {
    let pool = PoolManager::with_options(SimulatorOptions {
        profile: SimulationProfile {
            test_success_rate: 1.0,
            ..SimulationProfile::default()
        },
        ..SimulatorOptions::default()
    })
    .unwrap();
    pool.add_server("a", server("a")).unwrap();

    assert!(pool.test_connection("a").await.unwrap());
    assert_eq!(pool.get_server("a").unwrap().state(), ConnectionState::Disconnected);

    let missing = pool.test_connection("missing").await;
    assert!(matches!(missing, Err(Error::ServerNotFound(id)) if id == "missing"));
}

#[tokio::test(start_paused = true)]
async fn test_seeded_pools_are_reproducible() {
    let config = r#"{
        "servers": [
            {"id": "a", "name": "A", "endpoint": "ws://a"},
            {"id": "b", "name": "B", "endpoint": "ws://b"}
        ],
        "simulation": {"poolDriftIntervalMs": 3333},
        "seed": 9
    }"#;
    let first = PoolManager::from_config_str(config).unwrap();
    let second = PoolManager::from_config_str(config).unwrap();

    let (left, right) = tokio::join!(first.connect_all(), second.connect_all());
    let states = |results: Vec<(String, Result<ConnectionState>)>| {
        results
            .into_iter()
            .map(|(id, result)| (id, result.ok()))
            .collect::<Vec<_>>()
    };
    assert_eq!(states(left), states(right));

    tokio::time::sleep(Duration::from_millis(4500)).await;

    for (a, b) in first.get_all_statuses().iter().zip(second.get_all_statuses()) {
        assert_eq!(a.status, b.status);
        assert_eq!(a.metrics.total_requests, b.metrics.total_requests);
        assert_eq!(a.connection_pool, b.connection_pool);
    }
}

#[test]
fn test_reserved_extra_fields_cannot_enter_the_pool() {
    let pool = PoolManager::new();
    let recorder = Arc::new(Recorder::default());
    pool.set_shared_observer(recorder.clone());

    let mut config = server("a");
    config.extra.insert("version".to_string(), "2.3".into());
    let result = pool.add_server("a", config);

    assert!(matches!(result, Err(Error::ConfigInvalid(msg)) if msg.contains("'version'")));
    assert!(pool.is_empty());
    assert!(recorder.events().is_empty());
}

#[test]
fn test_export_never_repeats_keys() -> Result<()> {
    let pool = PoolManager::new();
    let mut config = server("a");
    config.extra.insert("release".to_string(), "2.3".into());
    pool.add_server("a", config.clone())?;

    let exported = pool.export_all_configurations()?;
    let entry = exported
        .split("\"configurations\"")
        .nth(1)
        .and_then(|rest| rest.split('}').next())
        .unwrap_or_default();
    assert_eq!(entry.matches("\"version\"").count(), 1);
    assert_eq!(entry.matches("\"exportedAt\"").count(), 1);

    let target = PoolManager::new();
    assert_eq!(target.import_configurations(&exported).success, 1);
    assert_eq!(target.get_server("a").unwrap().config(), &config);
    Ok(())
}

#[test]
fn test_pool_rejects_invalid_profile() {
    let result = PoolManager::with_options(SimulatorOptions {
        profile: SimulationProfile {
            request_error_rate: -0.1,
            ..SimulationProfile::default()
        },
        ..SimulatorOptions::default()
    });

    assert!(matches!(result, Err(Error::ConfigInvalid(msg)) if msg.contains("requestErrorRate")));
}
