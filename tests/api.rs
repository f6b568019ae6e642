use acme_delegate::account::{Account, CidrList, Registration, TxtRecord};
use acme_delegate::error::Error;
use acme_delegate::store::AccountStore;
use acme_delegate::{api, Config, DynAccountStore, InMemoryStore, SharedConfig};
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const TXT: &str = "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo";
const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const ALLOWED: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));

fn config(use_header: bool, disable_registration: bool) -> SharedConfig {
    let config: Config = serde_json::from_value(json!({
        "domain": "auth.example.org",
        "ns_domain": "ns1.auth.example.org",
        "ns_admin": "admin@example.org",
        "database_path": ":memory:",
        "api_bind_addr": "127.0.0.1:0",
        "api_timeout": 30,
        "disable_registration": disable_registration,
        "use_header": use_header,
        "cors_origins": ["*"],
        "dns_udp_bind_addr": "127.0.0.1:0",
        "dns_tcp_bind_addr": "127.0.0.1:0",
        "dns_tcp_timeout": 5
    }))
    .unwrap();
    Arc::new(config)
}

struct Harness {
    router: Router,
    store: Arc<InMemoryStore>,
}

impl Harness {
    fn new(use_header: bool) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let router = api::router(config(use_header, false), store.clone());
        Harness { router, store }
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        call(&self.router, request).await
    }

    async fn register(&self, body: Value) -> Value {
        let (status, body) = self
            .call(post("/register", &[], body.to_string(), LOCALHOST))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn post(path: &str, headers: &[(&str, &str)], body: impl Into<Body>, peer: IpAddr) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut request = builder.body(body.into()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(peer, 41_000)));
    request
}

fn update_body(subdomain: &str, txt: &str) -> String {
    json!({"subdomain": subdomain, "txt": txt}).to_string()
}

fn credentials(account: &Value) -> [(&str, &str); 2] {
    [
        ("X-Api-User", account["username"].as_str().unwrap()),
        ("X-Api-Key", account["password"].as_str().unwrap()),
    ]
}

#[tokio::test]
async fn health() {
    let harness = Harness::new(false);
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = harness.call(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": "healthy"}));
}

#[tokio::test]
async fn register_responses() {
    let harness = Harness::new(false);

    let (status, account) = harness
        .call(post("/register", &[], Body::empty(), LOCALHOST))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let subdomain = account["subdomain"].as_str().unwrap();
    assert_eq!(
        account["fulldomain"],
        format!("{subdomain}.auth.example.org")
    );
    assert!(Uuid::try_parse(account["username"].as_str().unwrap()).is_ok());
    assert_eq!(account["password"].as_str().unwrap().len(), 40);
    assert_eq!(account["allowfrom"], json!([]));

    let account = harness
        .register(json!({"allowfrom": ["192.0.2.0/24", "[2001:db8::1]/128"]}))
        .await;
    assert_eq!(
        account["allowfrom"],
        json!(["192.0.2.0/24", "2001:db8::1/128"])
    );

    let (status, body) = harness
        .call(post(
            "/register",
            &[],
            json!({"allowfrom": ["192.0.2.0/24", "10/8"]}).to_string(),
            LOCALHOST,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid_allowfrom_cidr"}));

    let (status, body) = harness
        .call(post("/register", &[], "{\"allowfrom\":", LOCALHOST))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "malformed_json_payload"}));
}

#[tokio::test]
async fn registration_can_be_disabled() {
    let router = api::router(config(false, true), Arc::new(InMemoryStore::new()));
    let (status, _) = call(&router, post("/register", &[], Body::empty(), LOCALHOST)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_and_delete_round_trip() {
    let harness = Harness::new(false);
    let account = harness.register(json!({})).await;
    let subdomain = account["subdomain"].as_str().unwrap();
    let creds = credentials(&account);

    let (status, body) = harness
        .call(post("/update", &creds, update_body(subdomain, TXT), LOCALHOST))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"txt": TXT}));
    assert_eq!(harness.store.get_txt(subdomain).await.unwrap(), vec![TXT]);

    let other = "X".repeat(43);
    harness
        .call(post("/update", &creds, update_body(subdomain, &other), LOCALHOST))
        .await;
    assert_eq!(
        harness.store.get_txt(subdomain).await.unwrap(),
        vec![other.as_str(), TXT]
    );

    let (status, body) = harness
        .call(post("/delete", &creds, update_body(subdomain, TXT), LOCALHOST))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"txt": TXT}));
    assert_eq!(harness.store.get_txt(subdomain).await.unwrap(), vec![other]);
}

#[tokio::test]
async fn invalid_payloads() {
    let harness = Harness::new(false);
    let account = harness.register(json!({})).await;
    let subdomain = account["subdomain"].as_str().unwrap();
    let creds = credentials(&account);

    let bad_char = format!("{}!", &TXT[..42]);
    for txt in ["", "short", bad_char.as_str()] {
        let (status, body) = harness
            .call(post("/update", &creds, update_body(subdomain, txt), LOCALHOST))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{txt:?}");
        assert_eq!(body, json!({"error": "bad_txt"}));
    }

    let (status, body) = harness
        .call(post("/update", &creds, "not json", LOCALHOST))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "malformed_json_payload"}));
    assert!(harness.store.get_txt(subdomain).await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_bodies_are_refused_before_authentication() {
    let harness = Harness::new(false);
    let huge = json!({"subdomain": "x".repeat(4 << 20), "txt": TXT}).to_string();

    for path in ["/update", "/delete"] {
        let (status, body) = harness
            .call(post(path, &[], huge.clone(), LOCALHOST))
            .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{path}");
        assert_eq!(body, json!({"error": "payload_too_large"}));
    }
}

#[tokio::test]
async fn rejections_are_uniform() {
    let harness = Harness::new(false);
    let account = harness.register(json!({})).await;
    let restricted = harness.register(json!({"allowfrom": ["10.1.2.3/32"]})).await;
    let subdomain = account["subdomain"].as_str().unwrap();
    let user = account["username"].as_str().unwrap();
    let key = account["password"].as_str().unwrap();
    let unknown_user = Uuid::new_v4().to_string();
    let wrong_key = "A".repeat(40);

    let cases: Vec<(Vec<(&str, &str)>, String, IpAddr)> = vec![
        // Unknown user.
        (
            vec![("X-Api-User", unknown_user.as_str()), ("X-Api-Key", key)],
            update_body(subdomain, TXT),
            LOCALHOST,
        ),
        // Wrong key.
        (
            vec![("X-Api-User", user), ("X-Api-Key", wrong_key.as_str())],
            update_body(subdomain, TXT),
            LOCALHOST,
        ),
        // Malformed identity and key.
        (
            vec![("X-Api-User", "admin"), ("X-Api-Key", "hunter2")],
            update_body(subdomain, TXT),
            LOCALHOST,
        ),
        // No credentials at all.
        (vec![], update_body(subdomain, TXT), LOCALHOST),
        // Someone else's subdomain.
        (
            credentials(&restricted).to_vec(),
            update_body(subdomain, TXT),
            ALLOWED,
        ),
        // Disallowed source address.
        (
            credentials(&restricted).to_vec(),
            update_body(restricted["subdomain"].as_str().unwrap(), TXT),
            LOCALHOST,
        ),
    ];

    for (headers, body, peer) in cases {
        let (status, response) = harness.call(post("/update", &headers, body, peer)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{headers:?}");
        assert_eq!(response, json!({"error": "forbidden"}));
    }
    assert!(harness.store.get_txt(subdomain).await.unwrap().is_empty());
}

#[tokio::test]
async fn peer_address_allow_list() {
    let harness = Harness::new(false);
    let account = harness.register(json!({"allowfrom": ["10.1.2.3/32"]})).await;
    let subdomain = account["subdomain"].as_str().unwrap();
    let creds = credentials(&account);

    // Forwarded headers are ignored unless trusted.
    let mut headers = creds.to_vec();
    headers.push(("X-Forwarded-For", "10.1.2.3"));
    let (status, _) = harness
        .call(post("/update", &headers, update_body(subdomain, TXT), LOCALHOST))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = harness
        .call(post("/update", &creds, update_body(subdomain, TXT), ALLOWED))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forwarded_header_allow_list() {
    let harness = Harness::new(true);
    let account = harness.register(json!({"allowfrom": ["10.1.2.3/32"]})).await;
    let subdomain = account["subdomain"].as_str().unwrap();

    let with_forwarded = |forwarded: &'static str| {
        let mut headers = credentials(&account).to_vec();
        headers.push(("X-Forwarded-For", forwarded));
        post("/update", &headers, update_body(subdomain, TXT), LOCALHOST)
    };

    let (status, _) = harness.call(with_forwarded("10.1.2.3")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = harness.call(with_forwarded("192.0.2.1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "forbidden"}));

    let (status, _) = harness.call(with_forwarded("192.0.2.1, 10.1.2.3")).await;
    assert_eq!(status, StatusCode::OK);

    // Trusting the header means the peer address no longer counts.
    let (status, _) = harness
        .call(post(
            "/update",
            &credentials(&account),
            update_body(subdomain, TXT),
            ALLOWED,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

struct BrokenStore;

#[async_trait::async_trait]
impl AccountStore for BrokenStore {
    async fn register(&self, _: &CidrList) -> Result<Registration, Error> {
        Err(Error::StorePoisoned)
    }
    async fn get_by_username(&self, _: Uuid) -> Result<Option<Account>, Error> {
        Err(Error::StorePoisoned)
    }
    async fn get_txt(&self, _: &str) -> Result<Vec<String>, Error> {
        Err(Error::StorePoisoned)
    }
    async fn add_txt(&self, _: &TxtRecord) -> Result<(), Error> {
        Err(Error::StorePoisoned)
    }
    async fn delete_txt(&self, _: &TxtRecord) -> Result<(), Error> {
        Err(Error::StorePoisoned)
    }
}

#[tokio::test]
async fn store_failures_are_500() {
    let store: DynAccountStore = Arc::new(BrokenStore);
    let router = api::router(config(false, false), store);

    let (status, body) = call(&router, post("/register", &[], Body::empty(), LOCALHOST)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "db_error"}));

    let user = Uuid::new_v4().to_string();
    let key = "A".repeat(40);
    let headers = [("X-Api-User", user.as_str()), ("X-Api-Key", key.as_str())];
    let (status, body) = call(
        &router,
        post("/update", &headers, update_body("sub", TXT), LOCALHOST),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "db_error"}));
}
