// In-process fakes for the participant API and the asset store.
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use genpdf::fonts::{FontData, FontFamily};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::participants::Participant;
use crate::state::AppState;

#[derive(Clone, Default)]
pub struct Upstream {
    participants: Arc<Mutex<HashMap<String, Participant>>>,
    background: Arc<Mutex<Option<Vec<u8>>>>,
    lookup_delay: Arc<Mutex<Duration>>,
    pub lookup_hits: Arc<AtomicUsize>,
    pub background_hits: Arc<AtomicUsize>,
}

impl Upstream {
    pub fn with_participant(self, code: &str, name: &str, is_crossed: bool) -> Self {
        self.participants.lock().unwrap().insert(
            code.to_string(),
            Participant {
                unique_code: code.to_string(),
                name: name.to_string(),
                is_crossed,
            },
        );
        self
    }

    pub fn with_background(self, bytes: Vec<u8>) -> Self {
        self.set_background(bytes);
        self
    }

    pub fn with_lookup_delay(self, delay: Duration) -> Self {
        *self.lookup_delay.lock().unwrap() = delay;
        self
    }

    pub fn set_background(&self, bytes: Vec<u8>) {
        *self.background.lock().unwrap() = Some(bytes);
    }

    async fn find(&self, code: &str) -> Option<Participant> {
        self.lookup_hits.fetch_add(1, Ordering::SeqCst);
        let delay = *self.lookup_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.participants.lock().unwrap().get(code).cloned()
    }
}

async fn user(State(upstream): State<Upstream>, Path(code): Path<String>) -> Response {
    match upstream.find(&code).await {
        Some(participant) => Json(participant).into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

async fn wrapped_user(State(upstream): State<Upstream>, Path(code): Path<String>) -> Response {
    match upstream.find(&code).await {
        Some(participant) => Json(serde_json::json!({ "data": participant })).into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

async fn background(State(upstream): State<Upstream>) -> Response {
    upstream.background_hits.fetch_add(1, Ordering::SeqCst);
    let bytes = upstream.background.lock().unwrap().clone();
    match bytes {
        Some(bytes) => ([("content-type", "image/png")], bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub struct UpstreamServer {
    addr: SocketAddr,
}

impl UpstreamServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn background_url(&self) -> String {
        format!("http://{}/background.png", self.addr)
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn spawn_upstream(upstream: Upstream) -> UpstreamServer {
    let app = Router::new()
        .route("/api/user/:code", get(user))
        .route("/wrapped/api/user/:code", get(wrapped_user))
        .route("/background.png", get(background))
        .with_state(upstream);
    UpstreamServer {
        addr: serve(app).await,
    }
}

pub fn test_config(server: &UpstreamServer) -> Config {
    Config {
        api_base_url: server.base_url(),
        background: server.background_url(),
        font_path: None,
        lookup_timeout: Duration::from_secs(5),
        lookup_cache_ttl: Duration::from_secs(60),
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

pub fn test_state(server: &UpstreamServer, font: Option<FontFamily<FontData>>) -> AppState {
    AppState::new(&test_config(server), font).unwrap()
}

/// Spawns the certificate service against the fake upstream; returns its base URL.
pub async fn spawn_app(server: &UpstreamServer, font: Option<FontFamily<FontData>>) -> String {
    let state = Arc::new(test_state(server, font));
    let addr = serve(crate::routes::router(state)).await;
    format!("http://{}", addr)
}

pub fn test_font() -> Option<FontFamily<FontData>> {
    crate::pdf::load_font(None).ok()
}

pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let pixels = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 3) as u8, (y * 5) as u8, 180, if (x + y) % 2 == 0 { 255 } else { 128 }])
    });
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(pixels)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out
}
