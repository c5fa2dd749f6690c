use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;

/// Path the release feed is served under.
const FEED_PATH: &str = "/releases/latest";

#[derive(Clone)]
enum Route {
    Respond {
        status: StatusCode,
        content_type: &'static str,
        body: Vec<u8>,
    },
    /// Accept the request and never answer.
    Hang,
}

#[derive(Default)]
struct ServerState {
    routes: HashMap<String, Route>,
    hits: HashMap<String, usize>,
}

type SharedState = Arc<Mutex<ServerState>>;

/// In-process HTTP server on `127.0.0.1` with an ephemeral port.
///
/// Every path answers `404` until configured. Routes can be changed while the
/// server runs, and every request is counted per path.
pub struct MockServer {
    addr: SocketAddr,
    state: SharedState,
    handle: JoinHandle<()>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl MockServer {
    /// Bind and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = SharedState::default();
        let app = Router::new().fallback(respond).with_state(Arc::clone(&state));

        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// URL of the release feed served by [`publish_release`](Self::publish_release).
    pub fn feed_url(&self) -> String {
        self.url(FEED_PATH)
    }

    /// Answer `path` with `200` and a JSON body.
    pub fn set_json(&self, path: &str, json: &str) {
        self.set_route(path, StatusCode::OK, "application/json", json.as_bytes().to_vec());
    }

    /// Answer `path` with `200` and raw bytes.
    pub fn set_bytes(&self, path: &str, bytes: Vec<u8>) {
        self.set_route(path, StatusCode::OK, "application/octet-stream", bytes);
    }

    /// Answer `path` with `status` and an empty body.
    pub fn set_status(&self, path: &str, status: StatusCode) {
        self.set_route(path, status, "text/plain", Vec::new());
    }

    /// Never answer requests for `path`.
    pub fn set_hang(&self, path: &str) {
        self.lock().routes.insert(path.to_string(), Route::Hang);
    }

    fn set_route(&self, path: &str, status: StatusCode, content_type: &'static str, body: Vec<u8>) {
        self.lock().routes.insert(
            path.to_string(),
            Route::Respond {
                status,
                content_type,
                body,
            },
        );
    }

    /// Serve a release at [`feed_url`](Self::feed_url) carrying one asset.
    ///
    /// Returns the asset's download path.
    pub fn publish_release(&self, version: &str, asset_name: &str, bytes: Vec<u8>) -> String {
        let download_path = Self::download_path(version, asset_name);
        self.set_bytes(&download_path, bytes);
        self.set_json(FEED_PATH, &self.release_json(version, &[asset_name]));
        download_path
    }

    /// Like [`publish_release`](Self::publish_release), plus an
    /// `<asset>.sha256` artifact with `checksum_body` as its content.
    pub fn publish_release_with_checksum(
        &self,
        version: &str,
        asset_name: &str,
        bytes: Vec<u8>,
        checksum_body: &str,
    ) -> String {
        let checksum_name = format!("{asset_name}.sha256");
        let download_path = Self::download_path(version, asset_name);
        self.set_bytes(&download_path, bytes);
        self.set_bytes(
            &Self::download_path(version, &checksum_name),
            checksum_body.as_bytes().to_vec(),
        );
        self.set_json(FEED_PATH, &self.release_json(version, &[asset_name, &checksum_name]));
        download_path
    }

    fn download_path(version: &str, asset_name: &str) -> String {
        format!("/download/{version}/{asset_name}")
    }

    fn release_json(&self, version: &str, asset_names: &[&str]) -> String {
        let assets: Vec<_> = asset_names
            .iter()
            .map(|name| {
                serde_json::json!({
                    "name": name,
                    "browser_download_url": self.url(&Self::download_path(version, name)),
                })
            })
            .collect();
        serde_json::json!({ "tag_name": version, "assets": assets }).to_string()
    }

    /// Requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.lock().hits.get(path).copied().unwrap_or(0)
    }

    /// Requests received for the release feed.
    pub fn feed_hits(&self) -> usize {
        self.hits(FEED_PATH)
    }

    /// Requests received across all paths.
    pub fn total_hits(&self) -> usize {
        self.lock().hits.values().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

async fn respond(State(state): State<SharedState>, uri: Uri) -> Response {
    let route = {
        let mut state = state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *state.hits.entry(uri.path().to_string()).or_default() += 1;
        state.routes.get(uri.path()).cloned()
    };

    match route {
        Some(Route::Respond {
            status,
            content_type,
            body,
        }) => (status, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        Some(Route::Hang) => std::future::pending::<Response>().await,
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve one request with `body` sent a byte at a time, `delay` apart.
///
/// Returns the URL to request. The server answers any path and accepts a
/// single connection.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub async fn trickle_server(body: Vec<u8>, delay: Duration) -> String {
    let listener =
        tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind trickle server");
    let addr = listener.local_addr().expect("trickle server address");

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for byte in body {
            tokio::time::sleep(delay).await;
            if socket.write_all(&[byte]).await.is_err() || socket.flush().await.is_err() {
                return;
            }
        }
    });

    format!("http://{addr}/slow")
}

/// A URL on `127.0.0.1` where nothing is listening.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub fn unused_local_url(path: &str) -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind probe port");
    let addr = listener.local_addr().expect("probe port address");
    drop(listener);
    format!("http://{addr}{path}")
}
