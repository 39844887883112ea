use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::response::Html;
use axum::routing::{get, post};
use frames_core::{
    ForwardError, FrameActionProxy, HtmlFrameExtractor, ReqwestUpstreamClient, UpstreamClient,
    UpstreamRequest, UpstreamSettings,
};
use frames_proxy::config::ProxyConfig;
use http::{HeaderMap, Request, StatusCode, header};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use url::Url;

const LANDING_HTML: &str = r#"<!doctype html>
<html><head>
<title>Landing</title>
<meta property="fc:frame" content="vNext" />
<meta property="fc:frame:image" content="/landing.png" />
<meta property="fc:frame:button:1" content="Again" />
</head><body></body></html>"#;

struct MockUpstream {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockUpstream {
    fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{path}", self.addr)).unwrap()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_upstream() -> Option<MockUpstream> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("skipping upstream forwarding test: {err}");
            return None;
        }
    };
    let addr = listener.local_addr().ok()?;

    let app = Router::new()
        .route(
            "/redirect",
            post(|| async { (StatusCode::FOUND, [(header::LOCATION, "/landing")]) }),
        )
        .route("/landing", get(|| async { Html(LANDING_HTML) }))
        .route(
            "/echo",
            post(|axum::Json(body): axum::Json<Value>| async move {
                axum::Json(json!({ "message": body.to_string() }))
            }),
        )
        .route(
            "/agent",
            post(|headers: HeaderMap| async move {
                let agent = headers
                    .get(header::USER_AGENT)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                axum::Json(json!({ "message": agent }))
            }),
        )
        .route("/large", post(|| async { "x".repeat(8 * 1024) }))
        .route(
            "/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                axum::Json(json!({ "message": "late" }))
            }),
        );

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Some(MockUpstream { addr, handle })
}

fn client(timeout: Duration) -> ReqwestUpstreamClient {
    capped_client(timeout, 64 * 1024)
}

fn capped_client(timeout: Duration, max_body_bytes: usize) -> ReqwestUpstreamClient {
    ReqwestUpstreamClient::new(&UpstreamSettings {
        timeout,
        user_agent: "frames-proxy-tests/1".into(),
        max_body_bytes,
    })
    .unwrap()
}

fn payload() -> Value {
    json!({
        "untrustedData": { "fid": 3, "buttonIndex": 2, "inputText": "gm" },
        "trustedData": { "messageBytes": "0a0b" }
    })
}

async fn call(router: Router, post_url: &Url, extra: &str) -> (StatusCode, Value) {
    let uri = format!(
        "/frames?postUrl={}{extra}",
        urlencoding::encode(post_url.as_str())
    );
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload().to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn manual_policy_exposes_found_response() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let response = client(Duration::from_secs(5))
        .post_json(&UpstreamRequest {
            url: upstream.url("/redirect"),
            body: payload(),
            follow_redirects: false,
        })
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header_str("location"), Some("/landing"));
    assert!(!response.redirected);
}

#[tokio::test]
async fn default_policy_follows_redirects() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let response = client(Duration::from_secs(5))
        .post_json(&UpstreamRequest {
            url: upstream.url("/redirect"),
            body: payload(),
            follow_redirects: true,
        })
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.redirected);
    assert!(String::from_utf8_lossy(&response.body).contains("fc:frame:image"));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let request = UpstreamRequest {
        url: upstream.url("/large"),
        body: payload(),
        follow_redirects: true,
    };

    let err = capped_client(Duration::from_secs(5), 1024)
        .post_json(&request)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ForwardError::TooLarge { limit: 1024 }),
        "{err:?}"
    );

    let response = capped_client(Duration::from_secs(5), 8 * 1024)
        .post_json(&request)
        .await
        .unwrap();
    assert_eq!(response.body.len(), 8 * 1024);
}

#[tokio::test]
async fn sends_configured_user_agent() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let response = client(Duration::from_secs(5))
        .post_json(&UpstreamRequest {
            url: upstream.url("/agent"),
            body: payload(),
            follow_redirects: true,
        })
        .await
        .unwrap();

    let body: Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["message"], "frames-proxy-tests/1");
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let err = client(Duration::from_millis(200))
        .post_json(&UpstreamRequest {
            url: upstream.url("/slow"),
            body: payload(),
            follow_redirects: true,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ForwardError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn full_stack_redirect_button() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let router = frames_proxy::build_router(&ProxyConfig::default()).unwrap();
    let (status, body) = call(router, &upstream.url("/redirect"), "&postType=post_redirect").await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(body, json!({ "location": "/landing" }));
}

#[tokio::test]
async fn full_stack_followed_redirect_yields_frame() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let router = frames_proxy::build_router(&ProxyConfig::default()).unwrap();
    let (status, body) = call(router, &upstream.url("/redirect"), "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["frame"]["version"], "vNext");
    assert_eq!(body["frame"]["title"], "Landing");
    assert_eq!(
        body["frame"]["image"],
        upstream.url("/landing.png").as_str()
    );
    assert_eq!(body["frame"]["buttons"][0]["label"], "Again");
    assert_eq!(body["reports"], json!({}));
}

#[tokio::test]
async fn full_stack_forwards_payload_verbatim() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let router = frames_proxy::build_router(&ProxyConfig::default()).unwrap();
    let (status, body) = call(router, &upstream.url("/echo"), "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "message");
    let echoed: Value = serde_json::from_str(body["message"].as_str().unwrap()).unwrap();
    assert_eq!(echoed, payload());
}

#[tokio::test]
async fn full_stack_timeout_maps_to_gateway_timeout() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let proxy = FrameActionProxy::new(
        Arc::new(client(Duration::from_millis(200))),
        Arc::new(HtmlFrameExtractor),
    );
    let router = frames_proxy::http::build_router(&ProxyConfig::default(), proxy);
    let (status, body) = call(router, &upstream.url("/slow"), "").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn full_stack_unreachable_upstream_maps_to_bad_gateway() {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("skipping upstream forwarding test: {err}");
            return;
        }
    };
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let router = frames_proxy::build_router(&ProxyConfig::default()).unwrap();
    let target = Url::parse(&format!("http://{addr}/gone")).unwrap();
    let (status, body) = call(router, &target, "").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn full_stack_oversized_body_maps_to_bad_gateway() {
    let Some(upstream) = spawn_upstream().await else {
        return;
    };
    let proxy = FrameActionProxy::new(
        Arc::new(capped_client(Duration::from_secs(5), 1024)),
        Arc::new(HtmlFrameExtractor),
    );
    let router = frames_proxy::http::build_router(&ProxyConfig::default(), proxy);
    let (status, body) = call(router, &upstream.url("/large"), "").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, Value::Null);
}
