use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use devtrack::apply::{ApplyResult, ChangeApplier};
use devtrack::audit::{AuditLog, AuditStore, MemoryAuditStore};
use devtrack::config::{AppConfig, PortfolioConfig};
use devtrack::error::AppError;
use devtrack::import::{ImportOptions, ImportResult, ImportSession, ImportStage};
use devtrack::portfolio::{
    Actor, Development, MemoryOverrideStore, OverlayPortfolio, PortfolioRepository,
    RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::{debug, info};

use crate::demo::demo_portfolio;

pub(crate) type Portfolio = OverlayPortfolio<MemoryOverrideStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything the HTTP handlers share: the applier (which owns the repository
/// and the audit log) plus the open import sessions.
pub(crate) struct PortfolioService<P, S> {
    pub(crate) applier: ChangeApplier<P, S>,
    pub(crate) sessions: SessionStore,
    pub(crate) import_options: ImportOptions,
    pub(crate) audit_page_size: usize,
}

impl<P, S> PortfolioService<P, S>
where
    P: PortfolioRepository + 'static,
    S: AuditStore + 'static,
{
    pub(crate) fn new(
        repository: Arc<P>,
        audit_store: Arc<S>,
        import_options: ImportOptions,
        audit_page_size: usize,
    ) -> Self {
        Self {
            applier: ChangeApplier::new(repository, AuditLog::new(audit_store)),
            sessions: SessionStore::default(),
            import_options,
            audit_page_size,
        }
    }

    pub(crate) fn repository(&self) -> &Arc<P> {
        self.applier.repository()
    }

    pub(crate) fn audit(&self) -> &AuditLog<S> {
        self.applier.audit()
    }
}

pub(crate) fn build_service(
    config: &AppConfig,
) -> Result<PortfolioService<Portfolio, MemoryAuditStore>, AppError> {
    let portfolio = load_portfolio(&config.portfolio)?;
    Ok(PortfolioService::new(
        Arc::new(portfolio),
        Arc::new(MemoryAuditStore::default()),
        config.import.options(),
        config.audit.page_size,
    ))
}

pub(crate) fn load_portfolio(config: &PortfolioConfig) -> Result<Portfolio, AppError> {
    let base = match &config.seed_path {
        Some(path) => read_seed(path)?,
        None => demo_portfolio(),
    };
    Ok(OverlayPortfolio::load(
        base,
        Arc::new(MemoryOverrideStore::default()),
    )?)
}

fn read_seed(path: &Path) -> Result<Vec<Development>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let developments: Vec<Development> = serde_json::from_str(&raw)?;
    info!(path = %path.display(), developments = developments.len(), "portfolio seed loaded");
    Ok(developments)
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> String {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("import-{id:06}")
}

/// Sessions untouched for this long are dropped the next time one opens.
const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct OpenSession {
    session: ImportSession,
    last_used: Instant,
}

type SessionMap = HashMap<String, OpenSession>;

/// Open import sessions keyed by id.
pub(crate) struct SessionStore {
    sessions: Mutex<SessionMap>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(SESSION_IDLE_TTL)
    }
}

impl SessionStore {
    pub(crate) fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub(crate) fn open(&self, preview: ImportResult) -> Result<ImportSessionView, AppError> {
        let mut session = ImportSession::new();
        session.load_preview(preview)?;

        let id = next_session_id();
        let view = ImportSessionView::of(&id, &session);

        let mut guard = self.lock()?;
        let before = guard.len();
        guard.retain(|_, open| open.last_used.elapsed() < self.idle_ttl);
        if guard.len() < before {
            debug!(evicted = before - guard.len(), "idle import sessions dropped");
        }
        guard.insert(
            id,
            OpenSession {
                session,
                last_used: Instant::now(),
            },
        );
        Ok(view)
    }

    /// Run `action` against one session while holding the store lock.
    pub(crate) fn with_session<T>(
        &self,
        id: &str,
        action: impl FnOnce(&mut ImportSession) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut guard = self.lock()?;
        let open = guard.get_mut(id).ok_or_else(|| session_not_found(id))?;
        open.last_used = Instant::now();
        action(&mut open.session)
    }

    pub(crate) fn view(&self, id: &str) -> Result<ImportSessionView, AppError> {
        self.with_session(id, |session| Ok(ImportSessionView::of(id, session)))
    }

    /// Discard a session, whatever stage it reached.
    pub(crate) fn close(&self, id: &str) -> Result<(), AppError> {
        self.lock()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| session_not_found(id))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SessionMap>, AppError> {
        self.sessions.lock().map_err(|_| {
            AppError::Repository(RepositoryError::Unavailable(
                "import session lock poisoned".to_string(),
            ))
        })
    }
}

fn session_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("import session {id}"))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImportSessionView {
    pub(crate) id: String,
    pub(crate) stage: ImportStage,
    pub(crate) selected: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) preview: Option<ImportResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) outcome: Option<ApplyResult>,
}

impl ImportSessionView {
    pub(crate) fn of(id: &str, session: &ImportSession) -> Self {
        Self {
            id: id.to_string(),
            stage: session.stage(),
            selected: session.selected_indices(),
            preview: session.preview().cloned(),
            outcome: session.outcome().cloned(),
        }
    }
}

pub(crate) const USER_ID_HEADER: &str = "x-user-id";
pub(crate) const USER_EMAIL_HEADER: &str = "x-user-email";
pub(crate) const USER_NAME_HEADER: &str = "x-user-name";

/// Identity is asserted by the fronting proxy; only the id is mandatory.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    let user_id = read(USER_ID_HEADER);
    if user_id.is_empty() {
        return Err(AppError::BadRequest(format!(
            "missing {USER_ID_HEADER} header"
        )));
    }
    Ok(Actor::new(
        user_id,
        read(USER_EMAIL_HEADER),
        read(USER_NAME_HEADER),
    ))
}

/// Filter bounds accept RFC 3339 timestamps or plain dates. A plain date covers
/// the whole day on either side of the range.
pub(crate) fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    let trimmed = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|err| {
        AppError::BadRequest(format!(
            "failed to parse '{raw}' as an RFC 3339 timestamp or YYYY-MM-DD ({err})"
        ))
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    Ok(date.and_time(time).and_utc())
}
