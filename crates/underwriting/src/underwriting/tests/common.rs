use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{json, Map, Value};

use crate::underwriting::domain::{
    Actor, BorrowerId, BorrowerIntake, ExitStrategy, LiquidityProof, LoanApplication, LoanId,
    LoanType, OtherMortgage, PurchaseDetails, Submitted, UserRole,
};
use crate::underwriting::prefill::FreshnessPolicy;
use crate::underwriting::repository::{
    LoanRecord, LoanRepository, RepositoryError, SettingsStore,
};
use crate::underwriting::service::{FormSubmission, UnderwritingService};
use crate::underwriting::settings::UnderwritingSettings;
use crate::underwriting::{underwriting_router, FormKind};

pub(super) fn closing_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 22).expect("valid date")
}

pub(super) fn purchase_details() -> PurchaseDetails {
    PurchaseDetails {
        purchase_price: 150_000.0,
        rehab_budget: 40_000.0,
        arv: 200_000.0,
        target_closing_date: closing_date(),
        exit_strategy: ExitStrategy::Sell,
    }
}

pub(super) fn intake_at(submitted_at: DateTime<Utc>) -> BorrowerIntake {
    BorrowerIntake {
        credit_score: Some(Submitted::new(712, submitted_at)),
        liquidity: Some(Submitted::new(
            LiquidityProof {
                amount: 15_000.0,
                documents: Vec::new(),
            },
            submitted_at,
        )),
        ..BorrowerIntake::default()
    }
}

pub(super) fn application(borrower: &str) -> LoanApplication {
    LoanApplication {
        borrower_id: BorrowerId(borrower.to_string()),
        loan_type: LoanType::FixAndFlip,
        amount: 100_000.0,
        purchase_details: purchase_details(),
        intake: intake_at(Utc::now()),
    }
}

pub(super) fn application_with_mortgages(borrower: &str) -> LoanApplication {
    let mut application = application(borrower);
    application.intake.other_mortgages = Some(Submitted::new(
        vec![OtherMortgage {
            lender: "First Regional".to_string(),
            monthly_payment: 1_200.0,
            monthly_carrying_cost: 300.0,
        }],
        Utc::now(),
    ));
    application
}

/// Stored loan built directly, bypassing the service, for resolver and projection tests.
pub(super) fn loan(id: &str, borrower: &str, intake: BorrowerIntake) -> LoanRecord {
    let mut application = application(borrower);
    application.intake = intake;
    LoanRecord::from_application(LoanId(id.to_string()), application, Utc::now())
}

pub(super) fn days_ago(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

pub(super) fn actor(role: UserRole) -> Actor {
    Actor {
        role,
        user_id: format!("{}-1", role.label().to_ascii_lowercase().replace(' ', "-")),
    }
}

pub(super) fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Values that satisfy every required field of `form`.
pub(super) fn complete_values(form: FormKind) -> Map<String, Value> {
    object(match form {
        FormKind::Valuation => json!({
            "appraised_value": "$210,000",
            "arv_estimate": 215000,
            "valuation_date": "2025-09-30",
            "valuation_source": "Full appraisal",
            "comparable_sales": "3 comps within 0.5mi",
        }),
        FormKind::Evaluator => json!({
            "property_condition": "Fair",
            "rehab_scope": "Kitchen, baths, roof",
            "budget_assessment": "Adequate",
            "exit_strategy_assessment": "Resale within 6 months",
            "market_risk": "Low",
        }),
        FormKind::Conditions => json!({
            "title_commitment": "received",
            "insurance_binder": "received",
            "entity_documents": "received",
            "purchase_contract": "executed",
        }),
        FormKind::TitleAgent => json!({
            "title_company": "Prairie Title",
            "agent_name": "Dana Ortiz",
            "agent_email": "dana@prairietitle.example",
            "agent_phone": "515-555-0134",
            "file_number": "PT-2291",
        }),
    })
}

pub(super) fn editor(form: FormKind) -> UserRole {
    match form {
        FormKind::Valuation => UserRole::LoanOfficer,
        FormKind::Evaluator => UserRole::Evaluator,
        FormKind::Conditions => UserRole::Borrower,
        FormKind::TitleAgent => UserRole::TitleAgent,
    }
}

pub(super) fn submission(form: FormKind) -> FormSubmission {
    FormSubmission {
        actor: actor(editor(form)),
        values: complete_values(form),
    }
}

pub(super) type MemoryService = UnderwritingService<MemoryRepository, MemorySettings>;

pub(super) fn build_service() -> (MemoryService, Arc<MemoryRepository>, Arc<MemorySettings>) {
    let repository = Arc::new(MemoryRepository::default());
    let settings = Arc::new(MemorySettings::default());
    let service =
        UnderwritingService::new(repository.clone(), settings.clone(), FreshnessPolicy::default());
    (service, repository, settings)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<LoanId, LoanRecord>>>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, id: &LoanId) -> LoanRecord {
        self.fetch(id)
            .expect("fetch succeeds")
            .expect("record present")
    }
}

impl LoanRepository for MemoryRepository {
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
        if !guard.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(record.id.clone(), record);
        Ok(())
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

#[derive(Default, Clone)]
pub(super) struct MemorySettings {
    current: Arc<Mutex<UnderwritingSettings>>,
}

impl SettingsStore for MemorySettings {
    fn current(&self) -> Result<UnderwritingSettings, RepositoryError> {
        Ok(self.current.lock().expect("settings mutex poisoned").clone())
    }

    fn replace(&self, settings: UnderwritingSettings) -> Result<(), RepositoryError> {
        *self.current.lock().expect("settings mutex poisoned") = settings;
        Ok(())
    }
}

pub(super) struct ConflictRepository;

impl LoanRepository for ConflictRepository {
    fn insert(&self, _record: LoanRecord) -> Result<LoanRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update(&self, _record: LoanRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, _id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError> {
        Ok(None)
    }

    fn for_borrower(&self, _borrower_id: &BorrowerId) -> Result<Vec<LoanRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn list(&self) -> Result<Vec<LoanRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl LoanRepository for UnavailableRepository {
    fn insert(&self, _record: LoanRecord) -> Result<LoanRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: LoanRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_borrower(&self, _borrower_id: &BorrowerId) -> Result<Vec<LoanRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<LoanRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn service_with<R: LoanRepository + 'static>(
    repository: R,
) -> Arc<UnderwritingService<R, MemorySettings>> {
    Arc::new(UnderwritingService::new(
        Arc::new(repository),
        Arc::new(MemorySettings::default()),
        FreshnessPolicy::default(),
    ))
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    underwriting_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.01,
        "expected {expected}, got {actual}"
    );
}
