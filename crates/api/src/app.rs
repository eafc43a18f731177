use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use racketfit_core::catalog::{Backends, ReviewStore};
use racketfit_core::domain::preference::{
    BalancePreference, BudgetChoice, LabelError, LevelChoice, OptionCatalog, PlayStyle,
    PreferenceSelection, SelectionPolicy,
};
use racketfit_core::domain::review::{NewReview, Review};
use racketfit_core::engine::{EngineOptions, RecommendationEngine};
use racketfit_core::session::{run_submit, RecommendationSession, SubmitRejected};

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: Arc<Mutex<RecommendationSession>>,
    last_touched: Instant,
}

type SessionMap = HashMap<Uuid, SessionEntry>;

#[derive(Clone)]
pub struct AppState {
    engine: Option<RecommendationEngine>,
    reviews: Option<Arc<dyn ReviewStore>>,
    sessions: Arc<RwLock<SessionMap>>,
    policy: SelectionPolicy,
    /// Sessions untouched for longer than this are dropped on the next `POST /sessions`.
    session_idle: Duration,
}

impl AppState {
    /// `backends` is `None` in degraded mode: sessions still work, catalog and review routes
    /// answer 503.
    pub fn new(backends: Option<Backends>, options: EngineOptions) -> Self {
        let policy = options.policy;
        let (engine, reviews) = match backends {
            Some(b) => (
                Some(RecommendationEngine::new(b.catalog, b.images, options)),
                Some(b.reviews),
            ),
            None => (None, None),
        };
        Self {
            engine,
            reviews,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            policy,
            session_idle: DEFAULT_SESSION_IDLE,
        }
    }

    pub fn with_session_idle(mut self, idle: Duration) -> Self {
        self.session_idle = idle;
        self
    }

    async fn session(&self, id: Uuid) -> Result<Arc<Mutex<RecommendationSession>>, ApiError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("no session {id}")))?;
        entry.last_touched = Instant::now();
        Ok(entry.session.clone())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/options", get(options))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/submit", post(submit))
        .route("/sessions/:id/playstyle", put(set_playstyle))
        .route("/sessions/:id/balance", put(set_balance))
        .route("/sessions/:id/level", put(set_level))
        .route("/sessions/:id/budget", put(set_budget))
        .route("/rackets/:id/reviews", get(list_reviews).post(create_review))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "racket catalog is not configured",
        )
    }

    fn internal(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
struct SessionView {
    id: Uuid,
    #[serde(flatten)]
    session: RecommendationSession,
}

async fn view(id: Uuid, session: &Mutex<RecommendationSession>) -> Json<SessionView> {
    Json(SessionView {
        id,
        session: session.lock().await.clone(),
    })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn options() -> Json<OptionCatalog> {
    Json(OptionCatalog::standard())
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    let id = Uuid::new_v4();
    let session = Arc::new(Mutex::new(RecommendationSession::new(
        PreferenceSelection::initial(state.policy),
    )));
    {
        let mut sessions = state.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| e.last_touched.elapsed() <= state.session_idle);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::info!(expired, "idle sessions dropped");
        }
        sessions.insert(
            id,
            SessionEntry {
                session: session.clone(),
                last_touched: Instant::now(),
            },
        );
    }
    tracing::debug!(%id, "session created");
    (StatusCode::CREATED, view(id, &session).await)
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.session(id).await?;
    Ok(view(id, &session).await)
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.sessions.write().await.remove(&id) {
        Some(_) => {
            tracing::debug!(%id, "session closed");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("no session {id}"),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct FieldUpdate {
    value: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Playstyle,
    Balance,
    Level,
    Budget,
}

async fn set_playstyle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FieldUpdate>,
) -> Result<Json<SessionView>, ApiError> {
    set_field(&state, id, Field::Playstyle, body).await
}

async fn set_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FieldUpdate>,
) -> Result<Json<SessionView>, ApiError> {
    set_field(&state, id, Field::Balance, body).await
}

async fn set_level(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FieldUpdate>,
) -> Result<Json<SessionView>, ApiError> {
    set_field(&state, id, Field::Level, body).await
}

async fn set_budget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FieldUpdate>,
) -> Result<Json<SessionView>, ApiError> {
    set_field(&state, id, Field::Budget, body).await
}

fn invalid_label(e: LabelError) -> ApiError {
    ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

async fn set_field(
    state: &AppState,
    id: Uuid,
    field: Field,
    body: FieldUpdate,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.session(id).await?;
    let value = body.value.filter(|v| !v.trim().is_empty());

    // Parse before locking so a bad label leaves the session untouched.
    match field {
        Field::Playstyle => {
            let parsed = value
                .as_deref()
                .map(PlayStyle::from_label)
                .transpose()
                .map_err(invalid_label)?;
            session.lock().await.set_playstyle(parsed);
        }
        Field::Balance => {
            let parsed = value
                .as_deref()
                .map(BalancePreference::from_label)
                .transpose()
                .map_err(invalid_label)?;
            session.lock().await.set_balance(parsed);
        }
        Field::Level => session
            .lock()
            .await
            .set_level(value.map(LevelChoice::from_label)),
        Field::Budget => session
            .lock()
            .await
            .set_budget(value.map(BudgetChoice::from_label)),
    }

    Ok(view(id, &session).await)
}

async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.session(id).await?;
    let Some(engine) = &state.engine else {
        return Err(ApiError::unavailable());
    };

    match run_submit(session.clone(), engine.clone()).await {
        Ok(_) => Ok(view(id, &session).await),
        Err(e @ SubmitRejected::AlreadyLoading) => {
            Err(ApiError::new(StatusCode::CONFLICT, e.to_string()))
        }
    }
}

async fn list_reviews(
    State(state): State<AppState>,
    Path(racket_id): Path<i64>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let Some(reviews) = &state.reviews else {
        return Err(ApiError::unavailable());
    };
    let out = reviews
        .list_reviews(racket_id)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(out))
}

#[derive(Debug, Deserialize)]
struct ReviewBody {
    #[serde(default)]
    rating: u8,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    reviewer_name: Option<String>,
}

async fn create_review(
    State(state): State<AppState>,
    Path(racket_id): Path<i64>,
    Json(body): Json<ReviewBody>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let Some(reviews) = &state.reviews else {
        return Err(ApiError::unavailable());
    };
    let review = NewReview::new(racket_id, body.rating, body.comment)
        .map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?
        .with_reviewer_name(body.reviewer_name.as_deref());

    let created = reviews
        .create_review(&review)
        .await
        .map_err(ApiError::internal)?;
    tracing::info!(racket_id, rating = created.rating, "review created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use racketfit_core::catalog::images::NoImages;
    use racketfit_core::catalog::memory::InMemoryCatalog;
    use racketfit_core::catalog::{CatalogQuery, RacketCatalog};
    use racketfit_core::domain::racket::Racket;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn racket(id: i64, style: &str, balance: &str, price: f64) -> Racket {
        Racket {
            id,
            brand: "Victor".to_string(),
            model_name: format!("Thruster {id}"),
            style_tag: style.to_string(),
            balance_tag: balance.to_string(),
            player_level: Some("Beginner".to_string()),
            flex: Some("Medium".to_string()),
            price,
            description: None,
            image_path: None,
        }
    }

    fn backends_with(catalog: Arc<dyn RacketCatalog>) -> Backends {
        Backends {
            catalog,
            images: Arc::new(NoImages),
            reviews: Arc::new(InMemoryCatalog::default()),
        }
    }

    fn app(options: EngineOptions) -> Router {
        let catalog = Arc::new(InMemoryCatalog::new(vec![
            racket(1, "Power smash", "Head-heavy", 4500.0),
            racket(2, "All-round", "Even balance", 2000.0),
            racket(3, "All-round", "Head-light", 2500.0),
        ]));
        let backends = Backends {
            catalog: catalog.clone(),
            images: Arc::new(NoImages),
            reviews: catalog,
        };
        router(AppState::new(Some(backends), options))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => req
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = call(app, "POST", "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn healthz_ok() {
        let res = app(EngineOptions::default())
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn options_list_labels() {
        let (status, body) = call(&app(EngineOptions::default()), "GET", "/options", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["playstyles"][0]["value"], "All-round");
        assert_eq!(body["budgets"][2]["value"], "3,000 ขึ้นไป");
    }

    #[tokio::test]
    async fn full_selection_submits_and_ranks() {
        let app = app(EngineOptions::default());
        let id = new_session(&app).await;

        for (field, value) in [
            ("playstyle", "All-round"),
            ("balance", "Even balance"),
            ("level", "Beginner (เพิ่งเริ่มเล่น)"),
            ("budget", "1,500 – 3,000"),
        ] {
            let (status, _) = call(
                &app,
                "PUT",
                &format!("/sessions/{id}/{field}"),
                Some(json!({ "value": value })),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{field}");
        }

        let (status, body) = call(&app, "POST", &format!("/sessions/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_loading"], false);
        assert!(body["error"].is_null());
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], 2);
        assert_eq!(results[0]["match_percentage"], 100);
        assert_eq!(results[0]["match_tier"], "strong");
    }

    #[tokio::test]
    async fn incomplete_selection_returns_no_results() {
        let app = app(EngineOptions::default());
        let id = new_session(&app).await;
        call(
            &app,
            "PUT",
            &format!("/sessions/{id}/playstyle"),
            Some(json!({ "value": "All-round" })),
        )
        .await;

        let (status, body) = call(&app, "POST", &format!("/sessions/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], json!([]));
    }

    #[tokio::test]
    async fn unknown_label_is_rejected_without_changing_the_session() {
        let app = app(EngineOptions::default());
        let id = new_session(&app).await;

        let (status, body) = call(
            &app,
            "PUT",
            &format!("/sessions/{id}/playstyle"),
            Some(json!({ "value": "Trick shot" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("Trick shot"));

        let (_, body) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert!(body["selection"]["playstyle"].is_null());
    }

    #[tokio::test]
    async fn null_clears_a_field() {
        let app = app(EngineOptions {
            policy: SelectionPolicy::Prefilled,
            ..EngineOptions::default()
        });
        let id = new_session(&app).await;

        let (_, body) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(body["selection"]["balance"], "Even balance");

        let (status, body) = call(
            &app,
            "PUT",
            &format!("/sessions/{id}/balance"),
            Some(json!({ "value": null })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["selection"]["balance"].is_null());
    }

    #[tokio::test]
    async fn deleted_session_is_gone() {
        let app = app(EngineOptions::default());
        let id = new_session(&app).await;

        let (status, _) = call(&app, "DELETE", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "DELETE", &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire_on_next_create() {
        let state = AppState::new(
            Some(backends_with(Arc::new(InMemoryCatalog::default()))),
            EngineOptions::default(),
        )
        .with_session_idle(Duration::from_secs(60));
        let app = router(state.clone());

        let idle = new_session(&app).await;
        let active = new_session(&app).await;

        tokio::time::advance(Duration::from_secs(40)).await;
        let (status, _) = call(&app, "GET", &format!("/sessions/{active}"), None).await;
        assert_eq!(status, StatusCode::OK);

        tokio::time::advance(Duration::from_secs(40)).await;
        let fresh = new_session(&app).await;

        assert_eq!(state.sessions.read().await.len(), 2);
        let (status, _) = call(&app, "GET", &format!("/sessions/{idle}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        for id in [active, fresh] {
            let (status, _) = call(&app, "GET", &format!("/sessions/{id}"), None).await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let app = app(EngineOptions::default());
        let (status, _) = call(&app, "GET", &format!("/sessions/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    struct BrokenCatalog;

    #[async_trait::async_trait]
    impl RacketCatalog for BrokenCatalog {
        fn backend_name(&self) -> &'static str {
            "broken"
        }

        async fn query_rackets(&self, _query: &CatalogQuery) -> anyhow::Result<Vec<Racket>> {
            anyhow::bail!("relation \"rackets\" does not exist")
        }
    }

    #[tokio::test]
    async fn catalog_failure_lands_in_session_error() {
        let state = AppState::new(
            Some(backends_with(Arc::new(BrokenCatalog))),
            EngineOptions {
                policy: SelectionPolicy::Prefilled,
                ..EngineOptions::default()
            },
        );
        let app = router(state);
        let id = new_session(&app).await;

        let (status, body) = call(&app, "POST", &format!("/sessions/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], json!([]));
        assert_eq!(body["is_loading"], false);
        assert!(body["error"].as_str().unwrap().contains("does not exist"));
    }

    #[tokio::test]
    async fn submit_while_loading_conflicts() {
        let state = AppState::new(
            Some(backends_with(Arc::new(InMemoryCatalog::default()))),
            EngineOptions::default(),
        );
        let app = router(state.clone());
        let id = new_session(&app).await;
        let uuid: Uuid = id.parse().unwrap();
        state.session(uuid).await.unwrap().lock().await.begin_submit();

        let (status, _) = call(&app, "POST", &format!("/sessions/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn degraded_mode_answers_503() {
        let app = router(AppState::new(None, EngineOptions::default()));
        let id = new_session(&app).await;

        let (status, _) = call(&app, "POST", &format!("/sessions/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = call(&app, "GET", "/rackets/1/reviews", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn reviews_round_trip_newest_first() {
        let app = app(EngineOptions::default());

        let (status, body) = call(
            &app,
            "POST",
            "/rackets/2/reviews",
            Some(json!({ "rating": 4, "comment": "  คุมง่าย  " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["reviewer_name"], "Guest");
        assert_eq!(body["comment"], "คุมง่าย");

        call(
            &app,
            "POST",
            "/rackets/2/reviews",
            Some(json!({ "rating": 5, "comment": "", "reviewer_name": "Ploy" })),
        )
        .await;

        let (status, body) = call(&app, "GET", "/rackets/2/reviews", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["reviewer_name"], "Ploy");
        assert!(list[0]["comment"].is_null());
    }

    #[tokio::test]
    async fn zero_star_review_is_rejected() {
        let app = app(EngineOptions::default());
        let (status, body) = call(
            &app,
            "POST",
            "/rackets/2/reviews",
            Some(json!({ "rating": 0, "comment": "meh" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("star rating"));

        let (_, body) = call(&app, "GET", "/rackets/2/reviews", None).await;
        assert_eq!(body, json!([]));
    }
}
