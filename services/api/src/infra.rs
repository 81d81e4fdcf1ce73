use chrono::NaiveDate;
use loan_underwriting::underwriting::{
    BorrowerId, LoanId, LoanRecord, LoanRepository, RepositoryError, SettingsStore,
    UnderwritingSettings,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLoanRepository {
    records: Arc<Mutex<HashMap<LoanId, LoanRecord>>>,
}

impl LoanRepository for InMemoryLoanRepository {
    fn insert(&self, record: LoanRecord) -> Result<LoanRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: LoanRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_borrower(&self, borrower_id: &BorrowerId) -> Result<Vec<LoanRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.borrower_id == borrower_id)
            .cloned()
            .collect())
    }

    fn list(&self) -> Result<Vec<LoanRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

/// Process-wide settings snapshot. Readers clone the current value; admins swap it whole.
#[derive(Default, Clone)]
pub(crate) struct InMemorySettingsStore {
    current: Arc<RwLock<UnderwritingSettings>>,
}

impl SettingsStore for InMemorySettingsStore {
    fn current(&self) -> Result<UnderwritingSettings, RepositoryError> {
        let guard = self.current.read().expect("settings lock poisoned");
        Ok(guard.clone())
    }

    fn replace(&self, settings: UnderwritingSettings) -> Result<(), RepositoryError> {
        let mut guard = self.current.write().expect("settings lock poisoned");
        *guard = settings;
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
