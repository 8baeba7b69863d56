//! The live viewer: a localhost HTTP service rendering the latest snapshot
//! through the serializers.
//!
//! The crawler publishes snapshots into a [`SnapshotCell`] through its
//! observer hook; the viewer thread only ever reads immutable copies.
//!
//! ```no_run
//! # fn states() -> Vec<statecrawl::State<()>> { vec![] }
//! use statecrawl::{webview::WebView, StateMachineCrawler};
//!
//! let mut crawler = StateMachineCrawler::new((), "InitialState");
//! crawler.register_states(states()).unwrap();
//!
//! let mut viewer = WebView::new();
//! crawler.set_on_state_change_handler(viewer.cell().observer());
//! viewer.start().unwrap();
//! let _outcome = crawler.verify_all_states(None, false);
//! viewer.stop();
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::sync::Notify;

use crate::observer::SnapshotCell;
use crate::serializers;

pub const HOST: &str = "127.0.0.1";
pub const PORT: u16 = 8666;

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><title>statecrawl</title></head>
<body style="margin:0;background:#fff">
<img id="graph" src="/graph.svg" alt="state machine graph">
<script>
setInterval(function () {
    document.getElementById("graph").src = "/graph.svg?" + Date.now();
}, 1000);
</script>
</body>
</html>
"#;

#[derive(Clone)]
struct AppState {
    cell: SnapshotCell,
    shutdown: Arc<Notify>,
}

/// A web service monitoring a crawler at `http://localhost:8666`.
pub struct WebView {
    cell: SnapshotCell,
    shutdown: Arc<Notify>,
    thread: Option<JoinHandle<()>>,
}

impl Default for WebView {
    fn default() -> Self {
        Self::new()
    }
}

impl WebView {
    pub fn new() -> Self {
        Self {
            cell: SnapshotCell::new(),
            shutdown: Arc::new(Notify::new()),
            thread: None,
        }
    }

    /// The cell the crawler should publish snapshots into; wire
    /// `cell().observer()` as the crawler's state change handler.
    pub fn cell(&self) -> SnapshotCell {
        self.cell.clone()
    }

    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        let state = AppState {
            cell: self.cell.clone(),
            shutdown: self.shutdown.clone(),
        };
        let thread = std::thread::Builder::new()
            .name("statecrawl-webview".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        tracing::error!("failed to build the viewer runtime: {err}");
                        return;
                    }
                };
                runtime.block_on(serve(state));
            })?;
        self.thread = Some(thread);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.shutdown.notify_one();
            let _ = thread.join();
        }
    }
}

impl Drop for WebView {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(state: AppState) {
    let shutdown = state.shutdown.clone();
    let app = Router::new()
        .route("/", get(index))
        .route("/kill", get(kill))
        .route("/graph.dot", get(graph_dot))
        .route("/graph.svg", get(graph_svg))
        .route("/graph.txt", get(graph_txt))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind((HOST, PORT)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind the viewer to {HOST}:{PORT}: {err}");
            return;
        }
    };
    tracing::info!("started the server at http://{HOST}:{PORT}");

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.notified().await });
    if let Err(err) = server.await {
        tracing::error!("viewer server error: {err}");
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn kill(State(state): State<AppState>) -> &'static str {
    state.shutdown.notify_one();
    "Killed"
}

async fn graph_dot(State(state): State<AppState>) -> Response {
    render(&state, "dot")
}

async fn graph_svg(State(state): State<AppState>) -> Response {
    render(&state, "svg")
}

async fn graph_txt(State(state): State<AppState>) -> Response {
    render(&state, "txt")
}

fn render(state: &AppState, extension: &str) -> Response {
    let Some(serializer) = serializers::by_extension(extension) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match serializer.serialize(&state.cell.latest()) {
        Ok(bytes) => ([(header::CONTENT_TYPE, serializer.mimetype())], bytes).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")).into_response(),
    }
}
