//! End-to-end tests of the gateway handler against engine stubs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;

use common::{client, start_engine_stub, start_gateway};

#[tokio::test]
async fn proxies_normalized_body_and_returns_upstream_verbatim() {
    // The stub echoes back whatever body the gateway forwarded.
    let engine = start_engine_stub(|method, _path, body| async move {
        if method == "GET" {
            (200, String::new())
        } else {
            (200, String::from_utf8_lossy(&body).to_string())
        }
    })
    .await;
    let gateway = start_gateway(engine, |_| {}).await;

    let response = client()
        .post(format!("http://{}/", gateway.addr))
        .header("content-type", "application/json")
        .body(r#"{"query":"{ findManyUser { id } }"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    let forwarded: serde_json::Value = response.json().await.unwrap();
    assert_eq!(forwarded["query"], "{ findManyUser { id } }");
    assert_eq!(forwarded["variables"], serde_json::json!({}));
    assert_eq!(forwarded["operationName"], serde_json::Value::Null);
}

#[tokio::test]
async fn returns_upstream_result_unchanged() {
    let engine = start_engine_stub(|method, _path, _body| async move {
        if method == "GET" {
            (200, String::new())
        } else {
            (200, r#"{"data":{"findManyUser":[]}}"#.to_string())
        }
    })
    .await;
    let gateway = start_gateway(engine, |_| {}).await;

    let response = client()
        .post(format!("http://{}/", gateway.addr))
        .header("content-type", "application/json")
        .body(r#"{"query":"{ findManyUser { id } }"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), r#"{"data":{"findManyUser":[]}}"#);
}

#[tokio::test]
async fn retries_until_upstream_succeeds() {
    let posts = Arc::new(AtomicU32::new(0));
    let counter = posts.clone();
    let engine = start_engine_stub(move |method, _path, _body| {
        let counter = counter.clone();
        async move {
            if method == "GET" {
                return (200, String::new());
            }
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, "busy".to_string())
            } else {
                (200, r#"{"data":{"ok":true}}"#.to_string())
            }
        }
    })
    .await;
    let gateway = start_gateway(engine, |_| {}).await;

    let response = client()
        .post(format!("http://{}/", gateway.addr))
        .header("content-type", "application/json")
        .body(r#"{"query":"{ ok }"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), r#"{"data":{"ok":true}}"#);
    assert_eq!(posts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_three_attempts_with_opaque_error() {
    let posts = Arc::new(AtomicU32::new(0));
    let counter = posts.clone();
    let engine = start_engine_stub(move |method, _path, _body| {
        let counter = counter.clone();
        async move {
            if method == "GET" {
                return (200, String::new());
            }
            counter.fetch_add(1, Ordering::SeqCst);
            (500, r#"{"errors":["internal"]}"#.to_string())
        }
    })
    .await;
    let gateway = start_gateway(engine, |_| {}).await;

    let response = client()
        .post(format!("http://{}/", gateway.addr))
        .header("content-type", "application/json")
        .body(r#"{"query":"{ ok }"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert!(response.text().await.unwrap().is_empty());
    assert_eq!(posts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn engine_reported_timeout_is_transient() {
    let posts = Arc::new(AtomicU32::new(0));
    let counter = posts.clone();
    let engine = start_engine_stub(move |method, _path, _body| {
        let counter = counter.clone();
        async move {
            if method == "GET" {
                return (200, String::new());
            }
            counter.fetch_add(1, Ordering::SeqCst);
            // A 200 whose body is the engine's timeout shape still retries.
            (200, r#"{"errors":[{"error":"Timed out during query execution"}]}"#.to_string())
        }
    })
    .await;
    let gateway = start_gateway(engine, |_| {}).await;

    let response = client()
        .post(format!("http://{}/", gateway.addr))
        .header("content-type", "application/json")
        .body(r#"{"query":"{ ok }"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(posts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn synthesizes_introspection_from_the_sdl_endpoint() {
    let engine = start_engine_stub(|method, path, _body| async move {
        match (method.as_str(), path.as_str()) {
            ("GET", "/sdl") => (200, "type Query { hello: String }".to_string()),
            ("GET", _) => (200, String::new()),
            _ => (500, String::new()),
        }
    })
    .await;
    let gateway = start_gateway(engine, |_| {}).await;

    let response = client()
        .post(format!("http://{}/", gateway.addr))
        .header("content-type", "application/json")
        .body(r#"{"query":"query IntrospectionQuery { __schema { queryType { name } } }"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let value: serde_json::Value = response.json().await.unwrap();
    assert_eq!(value["data"]["__schema"]["queryType"]["name"], "Query");
    let types = value["data"]["__schema"]["types"].as_array().unwrap();
    assert!(types.iter().any(|t| t["name"] == "Query"));
    assert!(types.iter().any(|t| t["name"] == "String"));
}

#[tokio::test]
async fn playground_is_served_to_non_json_requests() {
    let engine = start_engine_stub(|_method, _path, _body| async move { (200, String::new()) }).await;
    let gateway = start_gateway(engine, |_| {}).await;

    let response = client()
        .get(format!("http://{}/", gateway.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let page = response.text().await.unwrap();
    assert!(page.contains("GraphiQL"));
    assert!(page.contains("url: '/'"));
}

#[tokio::test]
async fn playground_is_disabled_in_production() {
    let engine = start_engine_stub(|method, _path, body| async move {
        if method == "GET" {
            (200, String::new())
        } else {
            (200, String::from_utf8_lossy(&body).to_string())
        }
    })
    .await;
    let gateway = start_gateway(engine, |config| config.production = true).await;

    // No JSON content type, but production proxies it anyway.
    let response = client()
        .post(format!("http://{}/", gateway.addr))
        .body(r#"{"query":"{ ok }"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let forwarded: serde_json::Value = response.json().await.unwrap();
    assert_eq!(forwarded["query"], "{ ok }");
}

#[tokio::test]
async fn health_endpoint_answers_without_touching_the_engine() {
    // An engine that never answers; the health path must not wait on it.
    let engine = start_engine_stub(|_method, _path, _body| async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        (200, String::new())
    })
    .await;
    let gateway = start_gateway(engine, |_| {}).await;

    let response = tokio::time::timeout(
        Duration::from_secs(2),
        client().get(format!("http://{}/health", gateway.addr)).send(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn idle_window_shuts_the_gateway_down() {
    let engine = start_engine_stub(|method, _path, _body| async move {
        if method == "GET" {
            (200, String::new())
        } else {
            (200, r#"{"data":{}}"#.to_string())
        }
    })
    .await;
    let gateway = start_gateway(engine, |config| {
        config.enable_sleep_mode = true;
        config.sleep_after_seconds = 1;
    })
    .await;

    // First request arms the idle timer.
    let response = client()
        .post(format!("http://{}/", gateway.addr))
        .header("content-type", "application/json")
        .body(r#"{"query":"{ ok }"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(!gateway.shutdown.is_triggered());

    tokio::time::sleep(Duration::from_millis(1_400)).await;
    assert!(gateway.shutdown.is_triggered());

    // The listener has closed; new connections fail.
    assert!(client()
        .get(format!("http://{}/health", gateway.addr))
        .send()
        .await
        .is_err());
}
