//! Control protocol over HTTP.

mod common;

use common::*;
use serde_json::{json, Value};

const CONFIG: &str = r#"{
    "kernel": {"cachingStrategy": "cache-first"},
    "routes": {"/legacy": {"file": "/new"}}
}"#;

async fn control(kernel: &TestKernel, body: Value) -> (u16, Value) {
    let res = reqwest::Client::new()
        .post(kernel.url("/__kernel/control"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_status_reports_running_kernel() {
    let origin = start_programmable_backend(|_, path| match path {
        CONFIG_PATH => (200, CONFIG.to_string()),
        _ => (200, "ok".to_string()),
    })
    .await;
    let kernel = start_kernel(settings_for(origin)).await;

    let (status, body) = control(&kernel, json!({"type": "KERNEL_STATUS"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["active"], true);
    assert_eq!(body["config"]["kernel"]["cachingStrategy"], "cache-first");
    assert_eq!(body["config"]["routes"]["/legacy"]["file"], "/new");
    assert_eq!(body["cache"], format!("intercept-kernel-v{}", env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_clear_cache_empties_namespace() {
    let hits = HitCounter::default();
    let counter = hits.clone();
    let origin = start_programmable_backend(move |_, path| {
        counter.record(path);
        match path {
            CONFIG_PATH => (200, CONFIG.to_string()),
            _ => (200, "asset".to_string()),
        }
    })
    .await;
    let kernel = start_kernel(settings_for(origin)).await;

    reqwest::get(kernel.url("/asset.png")).await.unwrap();
    reqwest::get(kernel.url("/asset.png")).await.unwrap();
    assert_eq!(hits.get("/asset.png"), 1);
    assert_eq!(kernel.kernel.status().cache_entries, 1);

    let (status, body) = control(&kernel, json!({"type": "CLEAR_CACHE"})).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(kernel.kernel.status().cache_entries, 0);

    reqwest::get(kernel.url("/asset.png")).await.unwrap();
    assert_eq!(hits.get("/asset.png"), 2);
}

#[tokio::test]
async fn test_reload_from_file_and_unknown_type() {
    let path = write_config_file(CONFIG);
    let mut settings = settings_for(dead_origin().await);
    settings.kernel.config_file = Some(path.to_string_lossy().into_owned());
    let kernel = start_kernel(settings).await;
    assert_eq!(kernel.kernel.config().config.routes.len(), 1);

    std::fs::write(&path, r#"{"kernel": {"cachingStrategy": "network-first"}}"#).unwrap();
    let (status, body) = control(&kernel, json!({"type": "RELOAD_CONFIG"})).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": true}));
    assert!(kernel.kernel.config().config.routes.is_empty());

    let (status, body) = control(&kernel, json!({"type": "REBOOT"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unknown control message type: REBOOT");

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_config_file_edit_triggers_reload() {
    let path = write_config_file(CONFIG);
    let mut settings = settings_for(dead_origin().await);
    settings.kernel.config_file = Some(path.to_string_lossy().into_owned());
    let kernel = start_kernel(settings).await;

    std::fs::write(&path, r#"{"routes": {"/a": {"file": "/b"}, "/c": {"file": "/d"}}}"#).unwrap();
    let reloaded = eventually(|| kernel.kernel.config().config.routes.len() == 2).await;
    assert!(reloaded);

    let _ = std::fs::remove_file(path);
}
