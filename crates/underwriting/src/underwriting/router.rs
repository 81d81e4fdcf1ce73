use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::completeness::{evaluate_raw, FormKind};
use super::domain::{BorrowerId, LoanApplication, LoanId};
use super::pipeline::{AiAssessment, DecisionRequest, LoanStage};
use super::repository::{LoanRepository, RepositoryError, SettingsStore};
use super::service::{FormSubmission, UnderwritingService, UnderwritingServiceError};
use super::settings::SettingsUpdate;
use crate::error::AppError;

type SharedService<R, S> = State<Arc<UnderwritingService<R, S>>>;

/// Router builder exposing the underwriting endpoints.
pub fn underwriting_router<R, S>(service: Arc<UnderwritingService<R, S>>) -> Router
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    Router::new()
        .route("/api/v1/underwriting/loans", post(submit_handler::<R, S>))
        .route(
            "/api/v1/underwriting/loans/:loan_id",
            get(pipeline_handler::<R, S>),
        )
        .route(
            "/api/v1/underwriting/loans/:loan_id/forms/:form",
            put(save_form_handler::<R, S>),
        )
        .route(
            "/api/v1/underwriting/loans/:loan_id/decision",
            post(decision_handler::<R, S>),
        )
        .route(
            "/api/v1/underwriting/loans/:loan_id/stage",
            post(stage_handler::<R, S>),
        )
        .route(
            "/api/v1/underwriting/loans/:loan_id/assessment",
            put(assessment_handler::<R, S>),
        )
        .route(
            "/api/v1/underwriting/loans/:loan_id/formulas",
            get(formulas_handler::<R, S>),
        )
        .route(
            "/api/v1/underwriting/loans/:loan_id/prefill",
            get(loan_prefill_handler::<R, S>),
        )
        .route(
            "/api/v1/underwriting/borrowers/:borrower_id/prefill",
            get(borrower_prefill_handler::<R, S>),
        )
        .route(
            "/api/v1/underwriting/pipeline",
            get(pipeline_list_handler::<R, S>),
        )
        .route(
            "/api/v1/underwriting/completeness",
            post(completeness_handler),
        )
        .route(
            "/api/v1/underwriting/settings",
            get(settings_handler::<R, S>).put(update_settings_handler::<R, S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StageChange {
    stage: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PipelineFilter {
    stage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletenessCheck {
    form: String,
    #[serde(default)]
    values: serde_json::Map<String, Value>,
}

pub(crate) async fn submit_handler<R, S>(
    State(service): SharedService<R, S>,
    axum::Json(application): axum::Json<LoanApplication>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    match service
        .submit(application)
        .and_then(|record| service.pipeline(&record.id))
    {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(UnderwritingServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({
                "error": "loan already exists",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => failure(other),
    }
}

pub(crate) async fn pipeline_handler<R, S>(
    State(service): SharedService<R, S>,
    Path(loan_id): Path<String>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    respond(service.pipeline(&LoanId(loan_id)))
}

pub(crate) async fn pipeline_list_handler<R, S>(
    State(service): SharedService<R, S>,
    Query(filter): Query<PipelineFilter>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    let stage = match filter.stage.as_deref().map(str::parse::<LoanStage>).transpose() {
        Ok(stage) => stage,
        Err(error) => return failure(error.into()),
    };
    respond(service.pipeline_list(stage))
}

pub(crate) async fn save_form_handler<R, S>(
    State(service): SharedService<R, S>,
    Path((loan_id, form)): Path<(String, String)>,
    axum::Json(submission): axum::Json<FormSubmission>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    let form = match form.parse::<FormKind>() {
        Ok(form) => form,
        Err(error) => return failure(error.into()),
    };
    respond(service.save_form(&LoanId(loan_id), form, submission))
}

pub(crate) async fn decision_handler<R, S>(
    State(service): SharedService<R, S>,
    Path(loan_id): Path<String>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    respond(service.apply_decision(&LoanId(loan_id), &request))
}

pub(crate) async fn stage_handler<R, S>(
    State(service): SharedService<R, S>,
    Path(loan_id): Path<String>,
    axum::Json(change): axum::Json<StageChange>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    let target = match change.stage.parse::<LoanStage>() {
        Ok(stage) => stage,
        Err(error) => return failure(error.into()),
    };
    respond(service.advance_stage(&LoanId(loan_id), target))
}

pub(crate) async fn assessment_handler<R, S>(
    State(service): SharedService<R, S>,
    Path(loan_id): Path<String>,
    axum::Json(assessment): axum::Json<AiAssessment>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    respond(service.record_assessment(&LoanId(loan_id), assessment))
}

pub(crate) async fn formulas_handler<R, S>(
    State(service): SharedService<R, S>,
    Path(loan_id): Path<String>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    respond(service.formulas(&LoanId(loan_id)))
}

pub(crate) async fn loan_prefill_handler<R, S>(
    State(service): SharedService<R, S>,
    Path(loan_id): Path<String>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    let loan_id = LoanId(loan_id);
    let result = service
        .get(&loan_id)
        .and_then(|loan| service.prefill(&loan.borrower_id, Some(&loan_id)));
    respond(result)
}

pub(crate) async fn borrower_prefill_handler<R, S>(
    State(service): SharedService<R, S>,
    Path(borrower_id): Path<String>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    respond(service.prefill(&BorrowerId(borrower_id), None))
}

pub(crate) async fn completeness_handler(
    axum::Json(check): axum::Json<CompletenessCheck>,
) -> Response {
    match check.form.parse::<FormKind>() {
        Ok(form) => {
            let report = evaluate_raw(&form.schema(), &check.values);
            (StatusCode::OK, axum::Json(report)).into_response()
        }
        Err(error) => failure(error.into()),
    }
}

pub(crate) async fn settings_handler<R, S>(State(service): SharedService<R, S>) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    respond(service.settings().map(|settings| settings.view()))
}

pub(crate) async fn update_settings_handler<R, S>(
    State(service): SharedService<R, S>,
    axum::Json(update): axum::Json<SettingsUpdate>,
) -> Response
where
    R: LoanRepository + 'static,
    S: SettingsStore + 'static,
{
    respond(
        service
            .update_settings(&update)
            .map(|settings| settings.view()),
    )
}

fn respond<T: serde::Serialize>(result: Result<T, UnderwritingServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(error) => failure(error),
    }
}

fn failure(error: UnderwritingServiceError) -> Response {
    AppError::from(error).into_response()
}
