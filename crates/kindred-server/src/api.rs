use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use kindred_core::{friends, identity, matchmaking, moderation, CredentialHasher};
use kindred_shared::{Avatar, RespondAction};
use kindred_store::{Account, Database, PendingRequestView};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::rate_limit::{client_ip, throttle_middleware, IpThrottle};
use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<tokio::sync::Mutex<Database>>,
    pub sessions: Arc<SessionStore>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub throttle: IpThrottle,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/me", get(me))
        .route("/api/quiz", post(quiz))
        .route("/api/match/:attr", get(find_match))
        .route("/api/users/:username", get(user_by_username))
        .route("/api/friend-request/:to_id", post(friend_request))
        .route("/api/friend-requests", get(friend_requests))
        .route("/api/friend-requests/:id/respond", post(respond_request))
        .route("/api/unfriend/:other_id", post(unfriend))
        .route("/api/report", post(report))
        .route("/api/delete", post(delete_account))
        .layer(middleware::from_fn_with_state(
            state.throttle.clone(),
            throttle_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    password: String,
    display_name: Option<String>,
    email: Option<String>,
    personality: Option<String>,
    avatar: Option<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct QuizBody {
    personality: Option<String>,
}

#[derive(Deserialize)]
struct RespondBody {
    action: RespondAction,
}

#[derive(Deserialize)]
struct ReportBody {
    reported_username: String,
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    registration_open: bool,
}

/// The caller's own record, ban state included.
#[derive(Serialize)]
struct ProfileResponse {
    id: Uuid,
    username: String,
    display_name: String,
    email: Option<String>,
    personality: Option<String>,
    avatar: Option<Avatar>,
    deleted: bool,
    banned_until: Option<DateTime<Utc>>,
    ban_count: u32,
    friend_count: u32,
}

impl From<Account> for ProfileResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            display_name: account.display_name,
            email: account.email,
            personality: account.personality,
            avatar: account.avatar,
            deleted: account.deleted,
            banned_until: account.banned_until,
            ban_count: account.ban_count,
            friend_count: account.friend_count,
        }
    }
}

/// What other users get to see.
#[derive(Serialize)]
struct PublicProfile {
    id: Uuid,
    username: String,
    display_name: String,
    personality: Option<String>,
    avatar: Option<Avatar>,
    friend_count: u32,
}

impl From<Account> for PublicProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            display_name: account.display_name,
            personality: account.personality,
            avatar: account.avatar,
            friend_count: account.friend_count,
        }
    }
}

#[derive(Serialize)]
struct MatchResponse {
    user: PublicProfile,
}

// ---------------------------------------------------------------------------
// Auth helper
// ---------------------------------------------------------------------------

/// Resolve the bearer token to an account id, or fail with 401.
async fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Uuid, ApiError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    state
        .sessions
        .resolve(token)
        .await
        .ok_or(ApiError::Unauthorized)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        registration_open: state.config.registration_open,
    })
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<TokenResponse>, ApiError> {
    if !state.config.registration_open {
        return Err(ApiError::Forbidden("registration is closed".to_string()));
    }

    let registration = identity::Registration {
        username: body.username,
        password: body.password,
        display_name: body.display_name,
        email: body.email,
        personality: body.personality,
        avatar: body.avatar,
    };

    let account = {
        let mut db = state.db.lock().await;
        identity::register(&mut db, state.hasher.as_ref(), registration)?
    };

    let token = state.sessions.issue(account.id).await;
    Ok(Json(TokenResponse { token }))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<TokenResponse>, ApiError> {
    let account = {
        let db = state.db.lock().await;
        identity::login(
            &db,
            state.hasher.as_ref(),
            &body.username,
            &body.password,
            Utc::now(),
        )?
    };

    let token = state.sessions.issue(account.id).await;
    Ok(Json(TokenResponse { token }))
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let account_id = authenticate(&headers, &state).await?;
    let db = state.db.lock().await;
    let account = identity::profile(&db, account_id)?;
    Ok(Json(account.into()))
}

async fn quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<QuizBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = authenticate(&headers, &state).await?;
    let db = state.db.lock().await;
    identity::set_personality(&db, account_id, body.personality.as_deref())?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn find_match(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(attr): Path<String>,
) -> Result<Json<MatchResponse>, ApiError> {
    let account_id = authenticate(&headers, &state).await?;
    let db = state.db.lock().await;
    let matched = matchmaking::find_match(&db, account_id, &attr, Utc::now())?;
    Ok(Json(MatchResponse {
        user: matched.into(),
    }))
}

async fn user_by_username(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<PublicProfile>, ApiError> {
    authenticate(&headers, &state).await?;
    let db = state.db.lock().await;
    let account = identity::find_visible(&db, &username)?;
    Ok(Json(account.into()))
}

async fn friend_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(to_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = authenticate(&headers, &state).await?;
    let mut db = state.db.lock().await;
    friends::request_friend(&mut db, account_id, to_id)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn friend_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PendingRequestView>>, ApiError> {
    let account_id = authenticate(&headers, &state).await?;
    let db = state.db.lock().await;
    let incoming = friends::incoming_requests(&db, account_id)?;
    Ok(Json(incoming))
}

async fn respond_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RespondBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = authenticate(&headers, &state).await?;
    let mut db = state.db.lock().await;
    friends::respond(&mut db, id, account_id, body.action)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn unfriend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(other_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = authenticate(&headers, &state).await?;
    let mut db = state.db.lock().await;
    friends::unfriend(&mut db, account_id, other_id)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn report(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<ReportBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = authenticate(&headers, &state).await?;

    // The origin address feeds the report ledger's per-origin dedup; the
    // core treats it as an opaque string.
    let origin = client_ip(&headers, Some(peer.ip()), state.config.trust_proxy)
        .ok_or_else(|| ApiError::BadRequest("could not determine request origin".to_string()))?
        .to_string();

    let mut db = state.db.lock().await;
    moderation::submit_report(
        &mut db,
        account_id,
        &body.reported_username,
        &origin,
        Utc::now(),
    )?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = authenticate(&headers, &state).await?;

    {
        let mut db = state.db.lock().await;
        moderation::self_delete(&mut db, account_id)?;
    }

    let revoked = state.sessions.revoke_account(account_id).await;
    info!(account = %account_id, revoked, "account self-deleted via API");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
