//! Axum REST API handlers.
//!
//! Every mutating handler runs the same sequence under the store's write
//! lock: load the collections, apply one [`Registry`] operation, persist the
//! collections it marked dirty, and answer with the record plus freshly
//! recomputed statistics. A failed operation writes nothing.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request, State,
    },
    http::{header, request::Parts, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use registry_protocol::{
    Actor, Collection, CreditBatch, EcosystemType, MrvData, MrvStatus, NewMrvData, NewProject,
    NewStakeholder, Notification, Overview, Project, ProjectAction, ProjectStatus, Registry,
    RegistryStatistics, Stakeholder, StakeholderAction,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::errors::{Result, ServiceError};
use crate::export::{self, ExportFormat};
use crate::rate_limit::{self, RateLimit};
use crate::store::JsonStore;

pub struct ApiState {
    pub store: JsonStore,
    pub config: Config,
    write_lock: Mutex<()>,
}

impl ApiState {
    pub fn new(store: JsonStore, config: Config) -> Self {
        Self {
            store,
            config,
            write_lock: Mutex::new(()),
        }
    }

    fn actor(&self, address: &str) -> Actor {
        Actor::new(address.trim(), self.config.role_of(address))
    }

    /// Load → apply → persist, serialised against other writers.
    async fn mutate<T>(
        &self,
        op: impl FnOnce(&mut Registry) -> registry_protocol::Result<T>,
    ) -> Result<(T, RegistryStatistics)> {
        let _guard = self.write_lock.lock().await;
        let mut registry = self.store.load_registry().await?;
        let out = op(&mut registry)?;
        let written = self.store.persist(&mut registry).await?;
        info!("Applied registry mutation ({written} collections written)");
        Ok((out, registry.statistics()))
    }
}

pub fn router(state: Arc<ApiState>, limit: Arc<RateLimit>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/:id", get(get_project))
        .route("/projects/:id/status", put(update_project_status))
        .route("/stakeholders", get(list_stakeholders).post(create_stakeholder))
        .route("/stakeholders/:id", put(update_stakeholder))
        .route("/mrv-data", get(list_mrv).post(create_mrv))
        .route("/mrv-data/:id", get(get_mrv))
        .route("/mrv-data/:id/verify", put(verify_mrv))
        .route("/credits", get(list_credits))
        .route("/notifications", get(list_notifications))
        .route("/analytics/overview", get(analytics_overview))
        .route("/export/:collection", get(export_collection))
        .layer(middleware::from_fn_with_state(limit, rate_limit::enforce))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────

/// `Json` whose rejections become `400` [`ServiceError::BadRequest`] bodies.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ServiceError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query` whose rejections become `400` [`ServiceError::BadRequest`] bodies.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| ServiceError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    fn new(data: Vec<T>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<RegistryStatistics>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub ecosystem_type: Option<EcosystemType>,
    pub owner: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub action: String,
    #[serde(default)]
    pub reason: Option<String>,
    pub admin_address: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StakeholderFilter {
    pub approved: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeholderUpdate {
    pub action: String,
    pub admin_address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MrvFilter {
    pub project_id: Option<String>,
    pub status: Option<MrvStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub status: MrvStatus,
    pub verifier_address: String,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditFilter {
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationFilter {
    pub recipient: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /projects`
pub async fn list_projects(
    State(state): State<Arc<ApiState>>,
    ApiQuery(filter): ApiQuery<ProjectFilter>,
) -> Result<Json<ListResponse<Project>>> {
    let projects: Vec<Project> = state.store.load(Collection::Projects).await?;
    let projects = projects
        .into_iter()
        .filter(|p| filter.status.map_or(true, |s| p.status == s))
        .filter(|p| filter.ecosystem_type.map_or(true, |e| p.ecosystem_type == e))
        .filter(|p| {
            filter
                .owner
                .as_deref()
                .map_or(true, |o| p.owner.eq_ignore_ascii_case(o))
        })
        .collect();
    Ok(Json(ListResponse::new(projects)))
}

/// `GET /projects/:id`
pub async fn get_project(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse<Project>>> {
    let registry = state.store.load_registry().await?;
    let project = registry.project(&id)?.clone();
    Ok(Json(RecordResponse {
        data: project,
        statistics: None,
    }))
}

/// `POST /projects`
pub async fn create_project(
    State(state): State<Arc<ApiState>>,
    ApiJson(input): ApiJson<NewProject>,
) -> Result<(StatusCode, Json<RecordResponse<Project>>)> {
    let (project, statistics) = state.mutate(|r| r.register_project(input)).await?;
    info!("Registered project {} ({})", project.id, project.name);
    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            data: project,
            statistics: Some(statistics),
        }),
    ))
}

/// `PUT /projects/:id/status`
pub async fn update_project_status(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> Result<Json<RecordResponse<Project>>> {
    let action: ProjectAction = body
        .action
        .parse()
        .map_err(|e: registry_protocol::ParseEnumError| ServiceError::BadRequest(e.to_string()))?;
    let actor = state.actor(&body.admin_address);
    let (project, statistics) = state
        .mutate(|r| r.transition_project(&id, action, &actor, body.reason))
        .await?;
    info!("Project {id} → {} by {}", project.status, actor.address);
    Ok(Json(RecordResponse {
        data: project,
        statistics: Some(statistics),
    }))
}

/// `GET /stakeholders`
pub async fn list_stakeholders(
    State(state): State<Arc<ApiState>>,
    ApiQuery(filter): ApiQuery<StakeholderFilter>,
) -> Result<Json<ListResponse<Stakeholder>>> {
    let stakeholders: Vec<Stakeholder> = state.store.load(Collection::Stakeholders).await?;
    let stakeholders = stakeholders
        .into_iter()
        .filter(|s| filter.approved.map_or(true, |a| s.approved == a))
        .collect();
    Ok(Json(ListResponse::new(stakeholders)))
}

/// `POST /stakeholders`
pub async fn create_stakeholder(
    State(state): State<Arc<ApiState>>,
    ApiJson(input): ApiJson<NewStakeholder>,
) -> Result<(StatusCode, Json<RecordResponse<Stakeholder>>)> {
    let (stakeholder, statistics) = state.mutate(|r| r.register_stakeholder(input)).await?;
    info!("Registered stakeholder {}", stakeholder.id);
    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            data: stakeholder,
            statistics: Some(statistics),
        }),
    ))
}

/// `PUT /stakeholders/:id`
pub async fn update_stakeholder(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StakeholderUpdate>,
) -> Result<Json<RecordResponse<Stakeholder>>> {
    let StakeholderAction::Approve = body
        .action
        .parse()
        .map_err(|e: registry_protocol::ParseEnumError| ServiceError::BadRequest(e.to_string()))?;
    let actor = state.actor(&body.admin_address);
    let (stakeholder, statistics) = state
        .mutate(|r| r.approve_stakeholder(&id, &actor))
        .await?;
    info!("Stakeholder {} approved by {}", stakeholder.id, actor.address);
    Ok(Json(RecordResponse {
        data: stakeholder,
        statistics: Some(statistics),
    }))
}

/// `GET /mrv-data`
pub async fn list_mrv(
    State(state): State<Arc<ApiState>>,
    ApiQuery(filter): ApiQuery<MrvFilter>,
) -> Result<Json<ListResponse<MrvData>>> {
    let records: Vec<MrvData> = state.store.load(Collection::MrvData).await?;
    let records = records
        .into_iter()
        .filter(|m| {
            filter
                .project_id
                .as_deref()
                .map_or(true, |p| m.project_id == p)
        })
        .filter(|m| filter.status.map_or(true, |s| m.status == s))
        .collect();
    Ok(Json(ListResponse::new(records)))
}

/// `GET /mrv-data/:id`
pub async fn get_mrv(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse<MrvData>>> {
    let registry = state.store.load_registry().await?;
    let record = registry.mrv(&id)?.clone();
    Ok(Json(RecordResponse {
        data: record,
        statistics: None,
    }))
}

/// `POST /mrv-data`
pub async fn create_mrv(
    State(state): State<Arc<ApiState>>,
    ApiJson(input): ApiJson<NewMrvData>,
) -> Result<(StatusCode, Json<RecordResponse<MrvData>>)> {
    let (record, statistics) = state.mutate(|r| r.submit_mrv(input)).await?;
    info!(
        "MRV data {} submitted for project {}",
        record.id, record.project_id
    );
    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            data: record,
            statistics: Some(statistics),
        }),
    ))
}

/// `PUT /mrv-data/:id/verify`
pub async fn verify_mrv(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> Result<Json<RecordResponse<MrvData>>> {
    let actor = state.actor(&body.verifier_address);
    let (record, statistics) = state
        .mutate(|r| r.review_mrv(&id, body.status, &actor, body.comments))
        .await?;
    info!("MRV data {id} → {} by {}", record.status, actor.address);
    Ok(Json(RecordResponse {
        data: record,
        statistics: Some(statistics),
    }))
}

/// `GET /credits`
pub async fn list_credits(
    State(state): State<Arc<ApiState>>,
    ApiQuery(filter): ApiQuery<CreditFilter>,
) -> Result<Json<ListResponse<CreditBatch>>> {
    let credits: Vec<CreditBatch> = state.store.load(Collection::Credits).await?;
    let credits = credits
        .into_iter()
        .filter(|c| {
            filter
                .project_id
                .as_deref()
                .map_or(true, |p| c.project_id == p)
        })
        .collect();
    Ok(Json(ListResponse::new(credits)))
}

/// `GET /notifications`
pub async fn list_notifications(
    State(state): State<Arc<ApiState>>,
    ApiQuery(filter): ApiQuery<NotificationFilter>,
) -> Result<Json<ListResponse<Notification>>> {
    let notifications: Vec<Notification> = state.store.load(Collection::Notifications).await?;
    let notifications = notifications
        .into_iter()
        .filter(|n| {
            filter
                .recipient
                .as_deref()
                .map_or(true, |r| n.recipient.eq_ignore_ascii_case(r))
        })
        .collect();
    Ok(Json(ListResponse::new(notifications)))
}

/// `GET /analytics/overview`
pub async fn analytics_overview(State(state): State<Arc<ApiState>>) -> Result<Json<Overview>> {
    let registry = state.store.load_registry().await?;
    Ok(Json(registry.overview()))
}

/// `GET /export/:collection?format=csv|json`
pub async fn export_collection(
    State(state): State<Arc<ApiState>>,
    Path(collection): Path<String>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<Response> {
    let format: ExportFormat = query.format.as_deref().unwrap_or("json").parse()?;
    let (body, stem) = match (collection.as_str(), format) {
        ("projects", ExportFormat::Json) => {
            let projects: Vec<Project> = state.store.load(Collection::Projects).await?;
            return Ok(Json(projects).into_response());
        }
        ("stakeholders", ExportFormat::Json) => {
            let stakeholders: Vec<Stakeholder> =
                state.store.load(Collection::Stakeholders).await?;
            return Ok(Json(stakeholders).into_response());
        }
        ("projects", ExportFormat::Csv) => {
            let projects: Vec<Project> = state.store.load(Collection::Projects).await?;
            (export::projects_csv(&projects), "projects")
        }
        ("stakeholders", ExportFormat::Csv) => {
            let stakeholders: Vec<Stakeholder> =
                state.store.load(Collection::Stakeholders).await?;
            (export::stakeholders_csv(&stakeholders), "stakeholders")
        }
        (other, _) => {
            return Err(ServiceError::BadRequest(format!(
                "cannot export '{other}' (expected projects or stakeholders)"
            )))
        }
    };
    let disposition = format!("attachment; filename=\"{stem}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
