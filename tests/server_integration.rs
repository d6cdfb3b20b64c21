//! Integration tests for clipd.
//!
//! These tests start a real server on an ephemeral port and talk to it
//! over HTTP to verify end-to-end behavior.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use clipd::auth::{md5_hex, unix_now, Authenticator, DigestScheme};
use clipd::clipboard::{ClipboardBackend, MemoryClipboard};
use clipd::config::{PayloadFormat, Settings};
use clipd::error::{ClipError, ClipResult};
use clipd::http::{AppState, RequestMetrics};
use clipd::server::{Server, ServerState};

const SECRET: &str = "1234";

/// Test server instance.
struct TestServer {
    addr: SocketAddr,
    clipboard: Arc<MemoryClipboard>,
    state: watch::Receiver<ServerState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<ClipResult<()>>,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let clipboard = Arc::new(MemoryClipboard::with_content("initial"));
        Self::start_with(clipboard.clone(), clipboard, Duration::from_secs(3)).await
    }

    async fn start_with(
        clipboard: Arc<MemoryClipboard>,
        backend: Arc<dyn ClipboardBackend>,
        grace: Duration,
    ) -> Self {
        let app_state = AppState {
            authenticator: Arc::new(Authenticator::new(
                DigestScheme::Md5,
                SECRET.as_bytes(),
                Duration::from_secs(10),
                20,
            )),
            clipboard: backend,
            payload: PayloadFormat::Json,
            max_body_bytes: 1_048_576,
            metrics: Arc::new(RequestMetrics::new()),
        };

        let server = Server::bind_with("127.0.0.1:0".parse().unwrap(), app_state, grace)
            .await
            .expect("Failed to bind server");
        let addr = server.local_addr().unwrap();
        let state = server.subscribe();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(async move {
            let _ = shutdown_rx.await;
        }));

        let mut test_server = Self {
            addr,
            clipboard,
            state,
            shutdown: Some(shutdown_tx),
            handle,
            client: reqwest::Client::new(),
        };
        test_server.wait_for(ServerState::Listening).await;
        test_server
    }

    fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    fn credential(timestamp: i64) -> (String, String) {
        let ts = timestamp.to_string();
        let tag = md5_hex(&format!("{}{}", ts, SECRET));
        (ts, tag)
    }

    async fn get(&self, timestamp: i64) -> (StatusCode, String) {
        let (ts, tag) = Self::credential(timestamp);
        let response = self
            .client
            .get(self.url())
            .header("Timestamp", ts)
            .header("MD5", tag)
            .send()
            .await
            .expect("Request failed");
        let status = response.status();
        (status, response.text().await.unwrap_or_default())
    }

    async fn post(&self, timestamp: i64, body: &str) -> StatusCode {
        let (ts, tag) = Self::credential(timestamp);
        self.client
            .post(self.url())
            .header("Timestamp", ts)
            .header("MD5", tag)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Request failed")
            .status()
    }

    async fn wait_for(&mut self, target: ServerState) {
        tokio::time::timeout(Duration::from_secs(5), self.state.wait_for(|s| *s == target))
            .await
            .expect("Timed out waiting for server state")
            .expect("Server state channel closed");
    }

    async fn stop(mut self) -> ClipResult<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.expect("Server task panicked")
    }
}

/// Backend that blocks for a while before answering.
struct SlowClipboard(Duration);

impl ClipboardBackend for SlowClipboard {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn read(&self) -> Result<String, ClipError> {
        std::thread::sleep(self.0);
        Ok("slow".to_string())
    }

    fn write(&self, _text: &str) -> Result<(), ClipError> {
        std::thread::sleep(self.0);
        Ok(())
    }
}

#[tokio::test]
async fn test_read_and_write_clipboard() {
    let server = TestServer::start().await;
    let now = unix_now();

    let (status, body) = server.get(now).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "initial");

    let status = server.post(now - 1, r#"{"data":"from the network"}"#).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(server.clipboard.read().unwrap(), "from the network");

    let (status, body) = server.get(now - 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "from the network");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_replay_rejected_over_http() {
    let server = TestServer::start().await;
    let now = unix_now();

    assert_eq!(server.get(now).await.0, StatusCode::OK);

    let (status, body) = server.get(now).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "403 Forbidden");

    // Stale credentials fail even though never seen before
    assert_eq!(server.get(now - 11).await.0, StatusCode::FORBIDDEN);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_empty_write_and_unsupported_method() {
    let server = TestServer::start().await;
    let now = unix_now();

    assert_eq!(server.post(now, r#"{"data":""}"#).await, StatusCode::BAD_REQUEST);
    assert_eq!(server.clipboard.read().unwrap(), "initial");

    let (ts, tag) = TestServer::credential(now - 1);
    let status = server
        .client
        .delete(server.url())
        .header("Timestamp", ts)
        .header("MD5", tag)
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_requests_each_accepted_once() {
    let server = Arc::new(TestServer::start().await);
    let now = unix_now();

    // Five distinct timestamps, each sent twice concurrently
    let mut tasks = Vec::new();
    for offset in 0..5 {
        for _ in 0..2 {
            let server = Arc::clone(&server);
            tasks.push(tokio::spawn(async move { server.get(now - offset).await.0 }));
        }
    }

    let mut ok = 0;
    let mut forbidden = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::FORBIDDEN => forbidden += 1,
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(ok, 5);
    assert_eq!(forbidden, 5);

    let server = Arc::try_unwrap(server).ok().expect("server still shared");
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_refuses_new_connections() {
    let mut server = TestServer::start().await;
    let addr = server.addr;
    let mut state = server.state.clone();

    if let Some(tx) = server.shutdown.take() {
        let _ = tx.send(());
    }
    server.wait_for(ServerState::Stopped).await;
    assert_eq!(*state.borrow_and_update(), ServerState::Stopped);
    server.handle.await.unwrap().unwrap();

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_request() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let server = TestServer::start_with(
        clipboard,
        Arc::new(SlowClipboard(Duration::from_millis(300))),
        Duration::from_secs(3),
    )
    .await;
    let url = server.url();
    let client = server.client.clone();
    let (ts, tag) = TestServer::credential(unix_now());

    let request = tokio::spawn(async move {
        client
            .get(url)
            .header("Timestamp", ts)
            .header("MD5", tag)
            .send()
            .await
            .map(|r| r.status())
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    server.stop().await.unwrap();
    assert_eq!(request.await.unwrap().unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn test_shutdown_grace_is_bounded() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let server = TestServer::start_with(
        clipboard,
        Arc::new(SlowClipboard(Duration::from_secs(2))),
        Duration::from_millis(200),
    )
    .await;
    let url = server.url();
    let client = server.client.clone();
    let (ts, tag) = TestServer::credential(unix_now());

    let _request = tokio::spawn(async move {
        let _ = client
            .get(url)
            .header("Timestamp", ts)
            .header("MD5", tag)
            .send()
            .await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    server.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[tokio::test]
async fn test_bind_conflict_is_fatal() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = occupied.local_addr().unwrap();

    let settings = Settings::from_toml_str(&format!(
        r#"
        [server]
        listen_address = "{}"

        [security]
        shared_secret = "{}"

        [clipboard]
        backend = "memory"
        "#,
        addr, SECRET
    ))
    .unwrap();

    let result = Server::bind(&settings).await;
    assert!(matches!(result, Err(ClipError::Server { .. })));
}

#[tokio::test]
async fn test_bind_from_settings_with_secret_file() {
    let dir = tempfile::tempdir().unwrap();
    let secret_path = dir.path().join("secret");
    std::fs::write(&secret_path, "from-file\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o600)).unwrap();
    }

    let config_path = dir.path().join("clipd.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
            [server]
            listen_address = "127.0.0.1:0"

            [security]
            shared_secret_path = "{}"
            digest = "hmac-sha256"

            [clipboard]
            backend = "memory"
            "#,
            secret_path.display()
        ),
    )
    .unwrap();

    let settings = Settings::load(&config_path).unwrap();
    let server = Server::bind(&settings).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run(async move {
        let _ = shutdown_rx.await;
    }));

    let signer = Authenticator::new(
        DigestScheme::HmacSha256,
        b"from-file",
        Duration::from_secs(10),
        1,
    );
    let ts = unix_now().to_string();
    let client = reqwest::Client::new();

    let status = client
        .post(format!("http://{}/", addr))
        .header("Timestamp", &ts)
        .header("Signature", signer.sign(&ts))
        .body("hello")
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The legacy MD5 header is not honored under the keyed scheme
    let ts = (unix_now() - 1).to_string();
    let status = client
        .get(format!("http://{}/", addr))
        .header("Timestamp", &ts)
        .header("MD5", md5_hex(&format!("{}from-file", ts)))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let _ = shutdown_tx.send(());
    handle.await.unwrap().unwrap();
}
