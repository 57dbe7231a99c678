use std::sync::{Arc, Mutex, RwLock};

use tracing::{info, warn};

use super::domain::{Development, DevelopmentId, UnitOverride};

/// Read/write access to the portfolio so services never touch shared global state.
pub trait PortfolioRepository: Send + Sync {
    fn developments(&self) -> Result<Vec<Development>, RepositoryError>;
    fn development(&self, id: &DevelopmentId) -> Result<Option<Development>, RepositoryError>;
    fn apply_override(&self, record: UnitOverride) -> Result<(), RepositoryError>;
}

/// Durable home for unit overrides.
pub trait OverrideStore: Send + Sync {
    fn save(&self, record: &UnitOverride) -> Result<(), RepositoryError>;
    fn load_all(&self) -> Result<Vec<UnitOverride>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("development {0} not found")]
    DevelopmentNotFound(DevelopmentId),
    #[error("unit {unit_number} not found in development {development_id}")]
    UnitNotFound {
        development_id: DevelopmentId,
        unit_number: String,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Base dataset held in memory with persisted overrides layered on top.
pub struct OverlayPortfolio<O> {
    developments: RwLock<Vec<Development>>,
    overrides: Arc<O>,
}

impl<O> OverlayPortfolio<O>
where
    O: OverrideStore,
{
    /// Build the overlay, replaying every stored override onto the base data.
    pub fn load(base: Vec<Development>, overrides: Arc<O>) -> Result<Self, RepositoryError> {
        let mut developments = base;
        let stored = overrides.load_all()?;
        let mut replayed = 0usize;

        for record in stored {
            match replay(&mut developments, &record) {
                Ok(()) => replayed += 1,
                Err(err) => warn!(error = %err, "skipping stale unit override"),
            }
        }

        info!(
            developments = developments.len(),
            overrides = replayed,
            "portfolio loaded"
        );

        Ok(Self {
            developments: RwLock::new(developments),
            overrides,
        })
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Development>>, RepositoryError> {
        self.developments
            .read()
            .map_err(|_| RepositoryError::Unavailable("portfolio lock poisoned".to_string()))
    }
}

impl<O> PortfolioRepository for OverlayPortfolio<O>
where
    O: OverrideStore,
{
    fn developments(&self) -> Result<Vec<Development>, RepositoryError> {
        Ok(self.read()?.clone())
    }

    fn development(&self, id: &DevelopmentId) -> Result<Option<Development>, RepositoryError> {
        Ok(self
            .read()?
            .iter()
            .find(|development| &development.id == id)
            .cloned())
    }

    fn apply_override(&self, record: UnitOverride) -> Result<(), RepositoryError> {
        let mut guard = self
            .developments
            .write()
            .map_err(|_| RepositoryError::Unavailable("portfolio lock poisoned".to_string()))?;

        ensure_target(&guard, &record)?;
        self.overrides.save(&record)?;
        replay(&mut guard, &record)
    }
}

fn ensure_target(
    developments: &[Development],
    record: &UnitOverride,
) -> Result<(), RepositoryError> {
    let development = developments
        .iter()
        .find(|development| development.id == record.development_id)
        .ok_or_else(|| RepositoryError::DevelopmentNotFound(record.development_id.clone()))?;

    if development.unit(&record.unit_number).is_none() {
        return Err(RepositoryError::UnitNotFound {
            development_id: record.development_id.clone(),
            unit_number: record.unit_number.clone(),
        });
    }

    Ok(())
}

fn replay(developments: &mut [Development], record: &UnitOverride) -> Result<(), RepositoryError> {
    let development = developments
        .iter_mut()
        .find(|development| development.id == record.development_id)
        .ok_or_else(|| RepositoryError::DevelopmentNotFound(record.development_id.clone()))?;

    let unit = development
        .unit_mut(&record.unit_number)
        .ok_or_else(|| RepositoryError::UnitNotFound {
            development_id: record.development_id.clone(),
            unit_number: record.unit_number.clone(),
        })?;

    *unit = record.unit.clone();
    Ok(())
}

/// Process-local override store; later saves for the same unit replace earlier ones.
#[derive(Default, Clone)]
pub struct MemoryOverrideStore {
    records: Arc<Mutex<Vec<UnitOverride>>>,
}

impl MemoryOverrideStore {
    pub fn with_records(records: Vec<UnitOverride>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OverrideStore for MemoryOverrideStore {
    fn save(&self, record: &UnitOverride) -> Result<(), RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("override store poisoned".to_string()))?;

        match guard.iter_mut().find(|existing| {
            existing.development_id == record.development_id
                && existing.unit_number == record.unit_number
        }) {
            Some(existing) => *existing = record.clone(),
            None => guard.push(record.clone()),
        }
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<UnitOverride>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("override store poisoned".to_string()))?;
        Ok(guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::domain::{DevelopmentStatus, SalesStatus, Unit};

    fn base() -> Vec<Development> {
        vec![Development {
            id: DevelopmentId::new("dev-1"),
            name: "Harbour View".to_string(),
            project_number: "P-100".to_string(),
            status: DevelopmentStatus::Active,
            units: vec![Unit::new("1", "House"), Unit::new("2", "House")],
        }]
    }

    fn sold(unit_number: &str) -> UnitOverride {
        let mut unit = Unit::new(unit_number, "House");
        unit.sales_status = SalesStatus::Contracted;
        UnitOverride {
            development_id: DevelopmentId::new("dev-1"),
            unit_number: unit_number.to_string(),
            unit,
        }
    }

    #[test]
    fn load_replays_stored_overrides_and_skips_stale_ones() {
        let mut stale = sold("99");
        stale.development_id = DevelopmentId::new("dev-1");
        let store = Arc::new(MemoryOverrideStore::with_records(vec![sold("2"), stale]));

        let portfolio = OverlayPortfolio::load(base(), store).expect("portfolio loads");
        let development = portfolio
            .development(&DevelopmentId::new("dev-1"))
            .expect("read")
            .expect("development present");

        assert_eq!(
            development.unit("2").expect("unit").sales_status,
            SalesStatus::Contracted
        );
        assert_eq!(
            development.unit("1").expect("unit").sales_status,
            SalesStatus::NotReleased
        );
    }

    #[test]
    fn apply_override_persists_and_updates_memory() {
        let store = Arc::new(MemoryOverrideStore::default());
        let portfolio = OverlayPortfolio::load(base(), store.clone()).expect("portfolio loads");

        portfolio.apply_override(sold("1")).expect("override applies");
        portfolio.apply_override(sold("1")).expect("override re-applies");

        assert_eq!(store.len(), 1);
        let developments = portfolio.developments().expect("read");
        assert_eq!(
            developments[0].unit("1").expect("unit").sales_status,
            SalesStatus::Contracted
        );
    }

    #[test]
    fn apply_override_rejects_unknown_units_without_persisting() {
        let store = Arc::new(MemoryOverrideStore::default());
        let portfolio = OverlayPortfolio::load(base(), store.clone()).expect("portfolio loads");

        let error = portfolio
            .apply_override(sold("42"))
            .expect_err("unknown unit rejected");

        assert!(matches!(error, RepositoryError::UnitNotFound { .. }));
        assert!(store.is_empty());
    }
}
