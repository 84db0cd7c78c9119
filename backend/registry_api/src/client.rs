//! HTTP client for the registry API.
//!
//! One [`RegistryClient`] per session. Read responses are kept in a
//! [`TtlCache`] under `projects`, `project:<id>` and `analytics`; every
//! mutating call drops the keys its change can affect.

use std::time::Duration;

use registry_protocol::{
    MrvData, MrvStatus, NewMrvData, NewProject, NewStakeholder, Overview, Project, ProjectAction,
    Stakeholder,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::{ListResponse, RecordResponse};
use crate::cache::{TtlCache, DEFAULT_TTL};
use crate::errors::{ErrorResponse, Result, ServiceError};

const PROJECTS_KEY: &str = "projects";
const ANALYTICS_KEY: &str = "analytics";

fn project_key(id: &str) -> String {
    format!("project:{id}")
}

pub struct RegistryClient {
    http: Client,
    base_url: String,
    cache: TtlCache<Value>,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_ttl(base_url, DEFAULT_TTL)
    }

    pub fn with_ttl(base_url: impl Into<String>, ttl: Duration) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: TtlCache::new(ttl),
        })
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    // ─────────────────────────────────────────────────────────
    // Projects
    // ─────────────────────────────────────────────────────────

    pub async fn projects(&self) -> Result<Vec<Project>> {
        let list: ListResponse<Project> = self.cached_get(PROJECTS_KEY, "/projects").await?;
        Ok(list.data)
    }

    pub async fn project(&self, id: &str) -> Result<Project> {
        let record: RecordResponse<Project> = self
            .cached_get(&project_key(id), &format!("/projects/{id}"))
            .await?;
        Ok(record.data)
    }

    pub async fn register_project(&self, input: &NewProject) -> Result<Project> {
        let record: RecordResponse<Project> =
            send(self.http.post(self.url("/projects")).json(input)).await?;
        self.cache.invalidate(PROJECTS_KEY);
        self.cache.invalidate(ANALYTICS_KEY);
        Ok(record.data)
    }

    pub async fn update_project_status(
        &self,
        id: &str,
        action: ProjectAction,
        admin_address: &str,
        reason: Option<&str>,
    ) -> Result<Project> {
        let body = json!({
            "action": action.to_string(),
            "adminAddress": admin_address,
            "reason": reason,
        });
        let record: RecordResponse<Project> = send(
            self.http
                .put(self.url(&format!("/projects/{id}/status")))
                .json(&body),
        )
        .await?;
        self.invalidate_project(id);
        Ok(record.data)
    }

    // ─────────────────────────────────────────────────────────
    // Stakeholders
    // ─────────────────────────────────────────────────────────

    pub async fn register_stakeholder(&self, input: &NewStakeholder) -> Result<Stakeholder> {
        let record: RecordResponse<Stakeholder> =
            send(self.http.post(self.url("/stakeholders")).json(input)).await?;
        self.cache.invalidate(ANALYTICS_KEY);
        Ok(record.data)
    }

    pub async fn approve_stakeholder(&self, id: &str, admin_address: &str) -> Result<Stakeholder> {
        let body = json!({ "action": "approve", "adminAddress": admin_address });
        let record: RecordResponse<Stakeholder> = send(
            self.http
                .put(self.url(&format!("/stakeholders/{id}")))
                .json(&body),
        )
        .await?;
        self.cache.invalidate(ANALYTICS_KEY);
        Ok(record.data)
    }

    // ─────────────────────────────────────────────────────────
    // MRV data
    // ─────────────────────────────────────────────────────────

    pub async fn submit_mrv(&self, input: &NewMrvData) -> Result<MrvData> {
        let record: RecordResponse<MrvData> =
            send(self.http.post(self.url("/mrv-data")).json(input)).await?;
        self.cache.invalidate(ANALYTICS_KEY);
        Ok(record.data)
    }

    /// Verification may credit the project, so its cached copies go too.
    pub async fn verify_mrv(
        &self,
        id: &str,
        status: MrvStatus,
        verifier_address: &str,
        comments: Option<&str>,
    ) -> Result<MrvData> {
        let body = json!({
            "status": status,
            "verifierAddress": verifier_address,
            "comments": comments,
        });
        let record: RecordResponse<MrvData> = send(
            self.http
                .put(self.url(&format!("/mrv-data/{id}/verify")))
                .json(&body),
        )
        .await?;
        self.invalidate_project(&record.data.project_id);
        Ok(record.data)
    }

    // ─────────────────────────────────────────────────────────
    // Analytics
    // ─────────────────────────────────────────────────────────

    pub async fn overview(&self) -> Result<Overview> {
        self.cached_get(ANALYTICS_KEY, "/analytics/overview").await
    }

    // ─────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────

    fn invalidate_project(&self, id: &str) {
        self.cache.invalidate(&project_key(id));
        self.cache.invalidate(PROJECTS_KEY);
        self.cache.invalidate(ANALYTICS_KEY);
    }

    async fn cached_get<T: DeserializeOwned>(&self, key: &str, path: &str) -> Result<T> {
        if let Some(hit) = self.cache.get(key) {
            debug!("Cache hit for {key}");
            return Ok(serde_json::from_value(hit)?);
        }
        let value: Value = send(self.http.get(self.url(path))).await?;
        let out = serde_json::from_value(value.clone())?;
        self.cache.set(key, value);
        Ok(out)
    }
}

/// Send a request; non-2xx responses become [`ServiceError::Api`].
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        return Err(ServiceError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}
