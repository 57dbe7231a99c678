use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use devtrack::apply::{ApplyResult, BulkUpdateRequest};
use devtrack::audit::{
    AuditAction, AuditFilter, AuditLog, AuditPage, AuditStore, ContinuationToken,
};
use devtrack::error::AppError;
use devtrack::import::{export_xlsx, import_units_from_excel};
use devtrack::portfolio::{Development, DevelopmentId, LabeledEnum, PortfolioRepository};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::infra::{
    actor_from_headers, parse_bound, AppState, ImportSessionView, PortfolioService,
};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DevelopmentSummary {
    pub(crate) id: DevelopmentId,
    pub(crate) name: String,
    pub(crate) project_number: String,
    pub(crate) status: &'static str,
    pub(crate) unit_count: usize,
}

impl DevelopmentSummary {
    fn of(development: &Development) -> Self {
        Self {
            id: development.id.clone(),
            name: development.name.clone(),
            project_number: development.project_number.clone(),
            status: development.status.label(),
            unit_count: development.units.len(),
        }
    }
}

/// Exactly one of the fields is honoured, in the order `all`, `rows`, `toggle`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SelectionRequest {
    #[serde(default)]
    pub(crate) all: bool,
    #[serde(default)]
    pub(crate) rows: Option<Vec<usize>>,
    #[serde(default)]
    pub(crate) toggle: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuditQuery {
    pub(crate) from: Option<String>,
    pub(crate) to: Option<String>,
    pub(crate) user_id: Option<String>,
    pub(crate) development_id: Option<String>,
    pub(crate) action: Option<AuditAction>,
    pub(crate) page_size: Option<usize>,
    pub(crate) continuation: Option<String>,
}

impl AuditQuery {
    fn filter(&self) -> Result<AuditFilter, AppError> {
        Ok(AuditFilter {
            from: self
                .from
                .as_deref()
                .map(|raw| parse_bound(raw, false))
                .transpose()?,
            to: self
                .to
                .as_deref()
                .map(|raw| parse_bound(raw, true))
                .transpose()?,
            user_id: non_blank(self.user_id.as_deref()),
            development_id: non_blank(self.development_id.as_deref()).map(DevelopmentId),
            action: self.action,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Router builder exposing portfolio, import, bulk update, and audit endpoints.
pub(crate) fn portfolio_router<P, S>(service: Arc<PortfolioService<P, S>>) -> Router
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    Router::new()
        .route("/api/v1/developments", get(list_developments::<P, S>))
        .route("/api/v1/developments/:id", get(get_development::<P, S>))
        .route(
            "/api/v1/developments/:id/export",
            get(export_development::<P, S>),
        )
        .route("/api/v1/export", get(export_portfolio::<P, S>))
        .route(
            "/api/v1/imports",
            post(create_import::<P, S>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/imports/:id",
            get(get_import::<P, S>).delete(close_import::<P, S>),
        )
        .route(
            "/api/v1/imports/:id/selection",
            put(update_selection::<P, S>),
        )
        .route("/api/v1/imports/:id/apply", post(apply_import::<P, S>))
        .route("/api/v1/bulk-updates", post(bulk_update::<P, S>))
        .route("/api/v1/audit-logs", get(audit_logs::<P, S>))
        .route("/api/v1/audit-logs/export", get(export_audit_logs::<P, S>))
        .with_state(service)
}

pub(crate) fn with_portfolio_routes<P, S>(service: Arc<PortfolioService<P, S>>) -> Router
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    portfolio_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn list_developments<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
) -> Result<Json<Vec<DevelopmentSummary>>, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    let developments = service.repository().developments()?;
    Ok(Json(
        developments.iter().map(DevelopmentSummary::of).collect(),
    ))
}

pub(crate) async fn get_development<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    Path(id): Path<String>,
) -> Result<Json<Development>, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    find_development(&service, id).map(Json)
}

pub(crate) async fn export_development<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    Path(id): Path<String>,
) -> Result<Response, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    let development = find_development(&service, id)?;
    let filename = format!("{}.xlsx", file_stem(&development.project_number));
    xlsx_response(&[development], &filename)
}

pub(crate) async fn export_portfolio<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
) -> Result<Response, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    let developments = service.repository().developments()?;
    xlsx_response(&developments, "portfolio.xlsx")
}

pub(crate) async fn create_import<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<ImportSessionView>), AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    if body.is_empty() {
        return Err(AppError::BadRequest("upload an .xlsx file".to_string()));
    }

    let developments = service.repository().developments()?;
    let preview = import_units_from_excel(&body, &developments, &service.import_options);
    let view = service.sessions.open(preview)?;
    info!(session = %view.id, "import session opened");
    Ok((StatusCode::CREATED, Json(view)))
}

pub(crate) async fn get_import<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    Path(id): Path<String>,
) -> Result<Json<ImportSessionView>, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    service.sessions.view(&id).map(Json)
}

pub(crate) async fn update_selection<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    Path(id): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<ImportSessionView>, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    service
        .sessions
        .with_session(&id, |session| {
            if request.all {
                session.select_all()?;
            } else if let Some(rows) = &request.rows {
                session.select_only(rows)?;
            } else if let Some(row) = request.toggle {
                session.toggle(row)?;
            } else {
                return Err(AppError::BadRequest(
                    "selection needs `all`, `rows`, or `toggle`".to_string(),
                ));
            }
            Ok(ImportSessionView::of(&id, session))
        })
        .map(Json)
}

pub(crate) async fn apply_import<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ImportSessionView>, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let rows = service
        .sessions
        .with_session(&id, |session| Ok(session.begin_apply()?))?;

    let outcome = service.applier.apply(&rows, &actor);

    service
        .sessions
        .with_session(&id, |session| {
            session.complete(outcome)?;
            Ok(ImportSessionView::of(&id, session))
        })
        .map(Json)
}

pub(crate) async fn close_import<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    service.sessions.close(&id)?;
    info!(session = %id, "import session closed");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn bulk_update<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    headers: HeaderMap,
    Json(request): Json<BulkUpdateRequest>,
) -> Result<Json<ApplyResult>, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    let actor = actor_from_headers(&headers)?;
    let result = service.applier.bulk_update(&request, &actor)?;
    Ok(Json(result))
}

pub(crate) async fn audit_logs<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditPage>, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    let filter = query.filter()?;
    let token = non_blank(query.continuation.as_deref()).map(ContinuationToken);
    let page_size = query.page_size.unwrap_or(service.audit_page_size);
    let page = service
        .audit()
        .get_logs(&filter, page_size, token.as_ref())?;
    Ok(Json(page))
}

pub(crate) async fn export_audit_logs<P, S>(
    State(service): State<Arc<PortfolioService<P, S>>>,
    Query(query): Query<AuditQuery>,
) -> Result<Response, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    let filter = query.filter()?;
    let entries = service.audit().collect_all(&filter)?;
    let csv = AuditLog::<S>::export_csv(&entries)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"audit-log.csv\"".to_string(),
            ),
        ],
        csv,
    )
        .into_response())
}

fn find_development<P, S>(
    service: &PortfolioService<P, S>,
    id: String,
) -> Result<Development, AppError>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    let id = DevelopmentId(id);
    service
        .repository()
        .development(&id)?
        .ok_or_else(|| AppError::NotFound(format!("development {id}")))
}

fn xlsx_response(developments: &[Development], filename: &str) -> Result<Response, AppError> {
    let bytes = export_xlsx(developments)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn file_stem(raw: &str) -> String {
    let stem: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "development".to_string()
    } else {
        stem
    }
}
