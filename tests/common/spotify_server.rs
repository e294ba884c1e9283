//! Fake Spotify Web API
//!
//! Serves the token endpoint, the handful of catalog endpoints the client
//! uses, and album covers, all from fixed data in `constants`. Each test
//! gets its own server on a random port.

use super::constants::*;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pezzottify_grabber::config::SpotifySettings;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

pub const COVER_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg";

#[derive(Default)]
pub struct FakeSpotifyState {
    pub base_url: String,
    pub token_requests: AtomicUsize,
    pub api_requests: AtomicUsize,
    pub cover_requests: AtomicUsize,
    /// Every catalog endpoint answers 429.
    pub rate_limited: AtomicBool,
    /// The token endpoint rejects the client.
    pub reject_credentials: AtomicBool,
}

pub struct FakeSpotifyServer {
    pub base_url: String,
    pub state: Arc<FakeSpotifyState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeSpotifyServer {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = Arc::new(FakeSpotifyState {
            base_url: base_url.clone(),
            ..Default::default()
        });

        let app = Router::new()
            .route("/api/token", post(token))
            .route("/v1/playlists/{id}", get(playlist))
            .route("/v1/playlists/{id}/tracks", get(playlist_tracks))
            .route("/v1/tracks/{id}", get(track))
            .route("/v1/search", get(search))
            .route("/v1/artists", get(artists))
            .route("/v1/audio-features/{id}", get(audio_features))
            .route("/covers/{name}", get(cover))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        Self {
            base_url,
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Client settings pointing at this server.
    pub fn settings(&self) -> SpotifySettings {
        SpotifySettings {
            client_id: Some(CLIENT_ID.to_string()),
            client_secret: Some(CLIENT_SECRET.to_string()),
            api_base_url: format!("{}/v1/", self.base_url),
            auth_url: format!("{}/api/token", self.base_url),
            timeout_sec: 5,
            enrich_genres: true,
        }
    }

    pub fn cover_url(&self, name: &str) -> String {
        format!("{}/covers/{}", self.base_url, name)
    }
}

// ============================================================================
// Handlers
// ============================================================================

type SharedState = State<Arc<FakeSpotifyState>>;

async fn token(State(state): SharedState, headers: HeaderMap) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    let has_basic_auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));

    if !has_basic_auth || state.reject_credentials.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_client", "error_description": "Invalid client"})),
        )
            .into_response();
    }

    let n = state.token_requests.load(Ordering::SeqCst);
    Json(json!({
        "access_token": format!("token-{}", n),
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

/// Counts the request and rejects it if it is unauthenticated or rate limited.
fn guard(state: &FakeSpotifyState, headers: &HeaderMap) -> Result<(), Response> {
    state.api_requests.fetch_add(1, Ordering::SeqCst);
    if state.rate_limited.load(Ordering::SeqCst) {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "7")],
            Json(json!({"error": {"status": 429, "message": "API rate limit exceeded"}})),
        )
            .into_response());
    }
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer token-"));
    if !authorized {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"status": 401, "message": "No token provided"}})),
        )
            .into_response());
    }
    Ok(())
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": {"status": 404, "message": "Resource not found"}})),
    )
        .into_response()
}

fn track_json(base_url: &str, id: &str) -> Option<Value> {
    let (title, artist, artist_id, release_date) = match id {
        TRACK_1_ID => (TRACK_1_TITLE, TRACK_1_ARTIST, TRACK_1_ARTIST_ID, "2004-06-15"),
        TRACK_2_ID => (TRACK_2_TITLE, TRACK_2_ARTIST, TRACK_2_ARTIST_ID, "2003-04-01"),
        TRACK_3_ID => (TRACK_3_TITLE, TRACK_3_ARTIST, TRACK_3_ARTIST_ID, "2007"),
        _ => return None,
    };
    Some(json!({
        "id": id,
        "name": title,
        "duration_ms": 222_000,
        "artists": [{"id": artist_id, "name": artist}],
        "album": {
            "id": format!("album-{}", id),
            "name": format!("{} (Album)", title),
            "release_date": release_date,
            "images": [
                {"url": format!("{}/covers/{}-small.jpg", base_url, id), "width": 64},
                {"url": format!("{}/covers/{}.jpg", base_url, id), "width": 640}
            ]
        }
    }))
}

async fn playlist(
    State(state): SharedState,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = guard(&state, &headers) {
        return response;
    }
    if id != PLAYLIST_ID {
        return not_found();
    }
    Json(json!({"name": PLAYLIST_NAME})).into_response()
}

/// Two pages: tracks 1 and 2 plus a removed and a local item, then track 3.
async fn playlist_tracks(
    State(state): SharedState,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = guard(&state, &headers) {
        return response;
    }
    if id != PLAYLIST_ID {
        return not_found();
    }

    let base = &state.base_url;
    let page = if params.get("offset").map(String::as_str) == Some("4") {
        json!({
            "items": [{"track": track_json(base, TRACK_3_ID), "is_local": false}],
            "next": null
        })
    } else {
        json!({
            "items": [
                {"track": track_json(base, TRACK_1_ID), "is_local": false},
                {"track": null, "is_local": false},
                {"track": {
                    "id": null,
                    "name": "Home Recording",
                    "duration_ms": 1000,
                    "artists": [{"id": null, "name": "Me"}],
                    "album": {"id": null, "name": "", "images": []}
                }, "is_local": true},
                {"track": track_json(base, TRACK_2_ID), "is_local": false}
            ],
            "next": format!("{}/v1/playlists/{}/tracks?offset=4&limit=100", base, id)
        })
    };
    Json(page).into_response()
}

async fn track(State(state): SharedState, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(response) = guard(&state, &headers) {
        return response;
    }
    match track_json(&state.base_url, &id) {
        Some(track) => Json(track).into_response(),
        None => not_found(),
    }
}

async fn search(
    State(state): SharedState,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = guard(&state, &headers) {
        return response;
    }
    let query = params.get("q").cloned().unwrap_or_default();
    let items: Vec<Value> = if query.to_lowercase().contains("seven nation") {
        track_json(&state.base_url, TRACK_2_ID).into_iter().collect()
    } else {
        Vec::new()
    };
    Json(json!({"tracks": {"items": items, "next": null}})).into_response()
}

async fn artists(
    State(state): SharedState,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = guard(&state, &headers) {
        return response;
    }
    let ids = params.get("ids").cloned().unwrap_or_default();
    let artists: Vec<Value> = ids
        .split(',')
        .map(|id| match id {
            TRACK_1_ARTIST_ID => json!({"id": id, "name": TRACK_1_ARTIST, "genres": ["alternative rock", "dance rock"]}),
            TRACK_2_ARTIST_ID => json!({"id": id, "name": TRACK_2_ARTIST, "genres": ["garage rock"]}),
            TRACK_3_ARTIST_ID => json!({"id": id, "name": TRACK_3_ARTIST, "genres": []}),
            _ => Value::Null,
        })
        .collect();
    Json(json!({"artists": artists})).into_response()
}

async fn audio_features(
    State(state): SharedState,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = guard(&state, &headers) {
        return response;
    }
    // Deprecated for new apps; answer for one track only.
    if id != TRACK_1_ID {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"status": 403, "message": "Forbidden"}})),
        )
            .into_response();
    }
    Json(json!({"id": id, "tempo": 148.1, "energy": 0.918})).into_response()
}

async fn cover(State(state): SharedState, Path(name): Path<String>) -> Response {
    state.cover_requests.fetch_add(1, Ordering::SeqCst);
    if name.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    ([(header::CONTENT_TYPE, "image/jpeg")], COVER_BYTES).into_response()
}
