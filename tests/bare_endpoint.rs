//! End-to-end tests for the `/bare/` endpoint against a real backend.

use std::time::Duration;

use axum::http::StatusCode;

use bare_relay::security::headers::RELAY_USER_AGENT;

mod common;

use common::{
    closed_port, direct_client, encode, start_backend, start_held_backend, start_relay, MockResponse,
};

#[tokio::test]
async fn follows_redirects_and_relays_final_response() {
    let backend = start_backend(|req| match req.path.as_str() {
        "/old" => MockResponse::redirect("/new"),
        "/new" => MockResponse::ok("final").with_header("x-upstream", "yes"),
        _ => MockResponse::status(404, "missing"),
    })
    .await;
    let relay = start_relay(|_, _| {}).await;

    let res = direct_client()
        .get(relay.url(&format!("/bare/{}", encode(&backend.url("/old")))))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-upstream"], "yes");
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.headers()["access-control-allow-headers"], "*");
    assert!(res.headers().get("content-length").is_none());
    assert_eq!(res.text().await.unwrap(), "final");

    let paths: Vec<String> = backend.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/old".to_string(), "/new".to_string()]);
}

#[tokio::test]
async fn sanitizes_request_headers() {
    let backend = start_backend(|_| MockResponse::ok("ok")).await;
    let relay = start_relay(|_, _| {}).await;

    let res = direct_client()
        .get(relay.url(&format!("/bare/{}", encode(&backend.url("/headers")))))
        .header("origin", "http://relay.local")
        .header("referer", "http://relay.local/app")
        .header("x-custom", "kept")
        .header("user-agent", "browser/1.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let seen = &backend.requests()[0];
    assert!(seen.header("origin").is_none());
    assert!(seen.header("referer").is_none());
    assert_eq!(seen.header("x-custom"), Some("kept"));
    assert_eq!(seen.header("user-agent"), Some(RELAY_USER_AGENT));
    assert_eq!(seen.header("host"), Some(backend.addr.to_string().as_str()));
}

#[tokio::test]
async fn relays_upstream_error_status_verbatim() {
    let backend = start_backend(|_| MockResponse::status(503, "busy")).await;
    let relay = start_relay(|_, _| {}).await;

    let res = direct_client()
        .get(relay.url(&format!("/bare/{}", encode(&backend.url("/")))))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "busy");
}

#[tokio::test]
async fn streams_post_body_upstream() {
    let backend = start_backend(|req| MockResponse::ok(format!("{}:{}", req.method, req.body_text()))).await;
    let relay = start_relay(|_, _| {}).await;

    let res = direct_client()
        .post(relay.url(&format!("/bare/{}", encode(&backend.url("/submit")))))
        .body("payload=1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "POST:payload=1");
}

#[tokio::test]
async fn inbound_query_string_is_not_part_of_target() {
    let backend = start_backend(|_| MockResponse::ok("ok")).await;
    let relay = start_relay(|_, _| {}).await;

    let res = direct_client()
        .get(relay.url(&format!("/bare/{}?cache=1", encode(&backend.url("/a?b=1")))))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(backend.requests()[0].path, "/a?b=1");
}

#[tokio::test]
async fn invalid_target_is_400() {
    let relay = start_relay(|_, _| {}).await;
    let client = direct_client();

    for path in ["/bare/not-a-url", "/bare/ftp%3A%2F%2Fexample.com%2F", "/bare/%ZZ"] {
        let res = client.get(relay.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
        assert!(res.text().await.unwrap().starts_with("Invalid target:"));
    }
}

#[tokio::test]
async fn unreachable_target_is_500_and_relay_keeps_serving() {
    let down = closed_port().await;
    let backend = start_backend(|_| MockResponse::ok("alive")).await;
    let relay = start_relay(|_, _| {}).await;
    let client = direct_client();

    let res = client
        .get(relay.url(&format!("/bare/{}", encode(&format!("http://{}/", down)))))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.text().await.unwrap().starts_with("Proxy error: "));

    let res = client
        .get(relay.url(&format!("/bare/{}", encode(&backend.url("/")))))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "alive");
}

#[tokio::test]
async fn other_paths_are_404() {
    let relay = start_relay(|_, _| {}).await;
    let res = direct_client().get(relay.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn relay_generated_request_id_stays_local() {
    let backend = start_backend(|_| MockResponse::ok("ok")).await;
    let relay = start_relay(|_, _| {}).await;
    let client = direct_client();
    let url = relay.url(&format!("/bare/{}", encode(&backend.url("/b"))));

    let res = client.get(&url).send().await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));

    client.get(&url).header("x-request-id", "client-id").send().await.unwrap();

    let seen = backend.requests();
    assert!(seen[0].header("x-request-id").is_none());
    assert_eq!(seen[1].header("x-request-id"), Some("client-id"));
}

#[tokio::test]
async fn body_is_streamed_before_upstream_finishes() {
    let backend = start_held_backend("first-part|", "rest-of-body").await;
    let relay = start_relay(|_, _| {}).await;

    let mut res = direct_client()
        .get(relay.url(&format!("/bare/{}", encode(&backend.url("/slow")))))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The upstream has not sent the rest yet, so the first part must arrive on its own
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while received.len() < "first-part|".len() {
            match res.chunk().await.unwrap() {
                Some(chunk) => received.extend_from_slice(&chunk),
                None => break,
            }
        }
    })
    .await
    .expect("first part was not streamed while upstream was held");
    assert_eq!(received, b"first-part|");

    backend.release.notify_one();
    while let Some(chunk) = res.chunk().await.unwrap() {
        received.extend_from_slice(&chunk);
    }
    assert_eq!(received, b"first-part|rest-of-body");
}

#[tokio::test]
async fn client_disconnect_mid_body_does_not_affect_relay() {
    let held = start_held_backend("partial", "never-read").await;
    let backend = start_backend(|_| MockResponse::ok("next")).await;
    let relay = start_relay(|_, _| {}).await;
    let client = direct_client();

    let mut res = client
        .get(relay.url(&format!("/bare/{}", encode(&held.url("/stream")))))
        .send()
        .await
        .unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), res.chunk())
        .await
        .unwrap()
        .unwrap();
    assert!(first.is_some());
    drop(res);
    held.release.notify_one();

    let res = client
        .get(relay.url(&format!("/bare/{}", encode(&backend.url("/")))))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "next");
}
