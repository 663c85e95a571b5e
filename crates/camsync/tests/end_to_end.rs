//! Full stack against mock CMSV8 and sink servers, with the JSON file cache.

use std::collections::HashMap;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use camsync::{build, Config, CycleOutcome, PersistOutcome};
use camsync_store::{CacheStore, JsonFileStore};

async fn mock_platform() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/808gps/StandardApiAction_login.action"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 0,
            "JSESSIONID": "e2e-token"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/808gps/StandardApiAction_getDeviceOlStatus.action"))
        .and(query_param("devIdno", "DVR01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 0,
            "onlines": [{"did": "DVR01", "online": 1}]
        })))
        .mount(&server)
        .await;

    server
}

fn config(platform: &MockServer, sink: &MockServer, dir: &std::path::Path) -> Config {
    let map_path = dir.join("cameras.json");
    std::fs::write(
        &map_path,
        r#"{"DVR01": [{"name": "Front  Door", "channel": 0}, {"name": "Yard", "channel": "1"}]}"#,
    )
    .unwrap();

    let host = platform.address().to_string();
    let endpoint = format!("{}/run", sink.uri());
    let cache = dir.join("state/last_sent.json");
    let vars: HashMap<&str, String> = HashMap::from([
        ("IP_DEVICES", host),
        ("USERNAME", "admin".to_string()),
        ("PASSWORD", "secret".to_string()),
        ("ENDPOINT_URL", endpoint),
        ("CAMERA_MAP_PATH", map_path.display().to_string()),
        ("PERSIST_CACHE_PATH", cache.display().to_string()),
        ("SLEEP_BETWEEN_BATCH", "0".to_string()),
        ("INITIAL_BACKOFF", "0".to_string()),
    ]);
    Config::from_lookup(|k| vars.get(k).cloned()).unwrap()
}

#[tokio::test]
async fn test_cycle_end_to_end() {
    let platform = mock_platform().await;
    let sink = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&sink)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config(&platform, &sink, dir.path());
    let camera_map = config.load_camera_map().unwrap();
    let mut sync_loop = build(&config, camera_map).await.unwrap();

    let report = sync_loop.run_cycle(camsync::now_millis()).await;
    assert!(matches!(report.outcome, CycleOutcome::Sent { delivered: 2, .. }));
    assert_eq!(report.persist, PersistOutcome::Saved);

    let requests = sink.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let port = 6604;
    assert_eq!(
        body,
        json!({"set_urls": [
            {
                "name": "Front Door",
                "url": format!("rtmp://{}:{port}/3/3?AVType=1&jsession=e2e-token&DevIDNO=DVR01&Channel=0&Stream=1", config.cms.host)
            },
            {
                "name": "Yard",
                "url": format!("rtmp://{}:{port}/3/3?AVType=1&jsession=e2e-token&DevIDNO=DVR01&Channel=1&Stream=1", config.cms.host)
            }
        ]})
    );

    let persisted = JsonFileStore::new(&config.cache_path).load().await;
    assert_eq!(persisted.len(), 2);
    assert!(persisted.contains_key("Front Door"));

    // Second pass: same snapshot, nothing to send (the mock expects exactly one POST).
    let report = sync_loop.run_cycle(camsync::now_millis()).await;
    assert_eq!(report.outcome, CycleOutcome::NoChanges { endpoints: 2 });
}

#[tokio::test]
async fn test_dry_run_never_posts() {
    let platform = mock_platform().await;
    let sink = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&sink)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&platform, &sink, dir.path());
    config.send.dry_run = true;
    let camera_map = config.load_camera_map().unwrap();
    let mut sync_loop = build(&config, camera_map).await.unwrap();

    let report = sync_loop.run_cycle(camsync::now_millis()).await;
    assert!(matches!(report.outcome, CycleOutcome::Sent { delivered: 2, .. }));
}
