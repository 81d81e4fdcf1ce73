use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::underwriting::completeness::FormKind;
use crate::underwriting::router;

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn submit_handler_returns_conflict_on_duplicate() {
    let service = service_with(ConflictRepository);

    let response = router::submit_handler::<ConflictRepository, MemorySettings>(
        State(service),
        axum::Json(application("borrower-1")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn submit_handler_returns_internal_error_on_repository_failure() {
    let service = service_with(UnavailableRepository);

    let response = router::submit_handler::<UnavailableRepository, MemorySettings>(
        State(service),
        axum::Json(application("borrower-1")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn submit_route_creates_a_pipeline_record() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let body = serde_json::to_value(application("borrower-1")).unwrap();
    let response = router
        .oneshot(json_request("POST", "/api/v1/underwriting/loans", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["stage"], "intake");
    assert_eq!(payload["pre_approval_decision"], "PENDING");
    assert_eq!(payload["is_complete"], false);
    assert!(payload["loan_id"]
        .as_str()
        .is_some_and(|id| id.starts_with("loan-")));
}

#[tokio::test]
async fn submit_route_rejects_non_positive_amounts() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let mut application = application("borrower-1");
    application.amount = 0.0;
    let body = serde_json::to_value(application).unwrap();
    let response = router
        .oneshot(json_request("POST", "/api/v1/underwriting/loans", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"].as_str().is_some_and(|error| error.contains("amount")));
}

#[tokio::test]
async fn unknown_loans_return_not_found() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/underwriting/loans/loan-999999"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn decisions_on_unknown_loans_return_not_found() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let body = json!({ "decision": "PRE_APPROVE" });
    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/underwriting/loans/loan-missing/decision",
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("loan-missing"));
}

#[tokio::test]
async fn form_route_saves_and_reports_missing_fields() {
    let (service, _, _) = build_service();
    let record = service.submit(application("borrower-1")).expect("submit");
    let router = router_with_service(service);

    let body = json!({
        "actor": { "role": "loan_officer", "user_id": "lo-1" },
        "values": { "appraised_value": 210000, "valuation_source": "  ", "color": "red" }
    });
    let uri = format!("/api/v1/underwriting/loans/{}/forms/valuation", record.id);
    let response = router
        .oneshot(json_request("PUT", &uri, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["completeness"]["missing"],
        json!([
            "After-repair value",
            "Valuation date",
            "Valuation source",
            "Comparable sales"
        ])
    );
    assert_eq!(payload["ignored_keys"], json!(["color"]));
}

#[tokio::test]
async fn form_route_forbids_roles_without_edit_rights() {
    let (service, _, _) = build_service();
    let record = service.submit(application("borrower-1")).expect("submit");
    let router = router_with_service(service);

    let body = json!({
        "actor": { "role": "title_agent", "user_id": "ta-1" },
        "values": complete_values(FormKind::Evaluator)
    });
    let uri = format!("/api/v1/underwriting/loans/{}/forms/evaluator", record.id);
    let response = router
        .oneshot(json_request("PUT", &uri, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn form_route_rejects_unknown_forms() {
    let (service, _, _) = build_service();
    let record = service.submit(application("borrower-1")).expect("submit");
    let router = router_with_service(service);

    let body = json!({
        "actor": { "role": "admin", "user_id": "admin-1" },
        "values": {}
    });
    let uri = format!("/api/v1/underwriting/loans/{}/forms/inspection", record.id);
    let response = router
        .oneshot(json_request("PUT", &uri, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn decision_route_requires_notes_for_decline() {
    let (service, repository, _) = build_service();
    let record = service.submit(application("borrower-1")).expect("submit");
    let router = router_with_service(service);
    let uri = format!("/api/v1/underwriting/loans/{}/decision", record.id);

    let response = router
        .clone()
        .oneshot(json_request("POST", &uri, &json!({ "decision": "DECLINE" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .oneshot(json_request(
            "POST",
            &uri,
            &json!({
                "decision": "DECLINE",
                "notes": "Insufficient liquidity",
                "decided_by": "lender-7"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["pre_approval_decision"], "DECLINE");
    assert_eq!(payload["decision_notes"], "Insufficient liquidity");
    assert_eq!(
        repository.stored(&record.id).review.notes.as_deref(),
        Some("Insufficient liquidity")
    );
}

#[tokio::test]
async fn stage_route_rejects_regressions() {
    let (service, _, _) = build_service();
    let record = service.submit(application("borrower-1")).expect("submit");
    let router = router_with_service(service);
    let uri = format!("/api/v1/underwriting/loans/{}/stage", record.id);

    let response = router
        .clone()
        .oneshot(json_request("POST", &uri, &json!({ "stage": "closing" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["stage_label"], "Closing");

    let response = router
        .oneshot(json_request("POST", &uri, &json!({ "stage": "processing" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn pipeline_route_validates_stage_filter() {
    let (service, _, _) = build_service();
    service.submit(application("borrower-1")).expect("submit");
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(get("/api/v1/underwriting/pipeline?stage=intake"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(1));

    let response = router
        .oneshot(get("/api/v1/underwriting/pipeline?stage=cancelled"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn formulas_route_returns_golden_values() {
    let (service, _, _) = build_service();
    let record = service.submit(application("borrower-1")).expect("submit");
    let router = router_with_service(service);

    let uri = format!("/api/v1/underwriting/loans/{}/formulas", record.id);
    let response = router.oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["prepaid_days"], 10);
    assert_close(payload["origination_fee"].as_f64().unwrap(), 2_000.0);
    assert_eq!(payload["liquidity"]["tier"], "acceptable");
}

#[tokio::test]
async fn formulas_route_reports_arithmetic_failures() {
    let (service, _, _) = build_service();
    let mut application = application("borrower-1");
    application.purchase_details.arv = 0.0;
    let record = service.submit(application).expect("submit");
    let router = router_with_service(service);

    let uri = format!("/api/v1/underwriting/loans/{}/formulas", record.id);
    let response = router.oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json_body(response).await["kind"], "arithmetic");
}

#[tokio::test]
async fn prefill_routes_resolve_borrower_history() {
    let (service, _, _) = build_service();
    let first = service.submit(application("borrower-9")).expect("submit");
    let second = service.submit(application("borrower-9")).expect("submit");
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(get("/api/v1/underwriting/borrowers/borrower-9/prefill"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["credit_score"]["value"], 712);
    assert_eq!(payload["credit_score"]["can_reuse"], true);

    let uri = format!("/api/v1/underwriting/loans/{}/prefill", second.id);
    let response = router.oneshot(get(&uri)).await.unwrap();
    let payload = read_json_body(response).await;
    assert_eq!(payload["credit_score"]["source_loan_id"], first.id.0);
}

#[tokio::test]
async fn completeness_route_evaluates_without_storing() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let body = json!({
        "form": "title-agent",
        "values": { "title_company": "Prairie Title", "agent_name": 42 }
    });
    let response = router
        .oneshot(json_request("POST", "/api/v1/underwriting/completeness", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["missing"],
        json!(["Agent email", "Agent phone", "Title file number"])
    );
    assert_eq!(payload["is_complete"], false);
}

#[tokio::test]
async fn settings_routes_use_percent_scale() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(get("/api/v1/underwriting/settings"))
        .await
        .unwrap();
    let payload = read_json_body(response).await;
    assert_close(payload["max_ltv"].as_f64().unwrap(), 75.0);

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/underwriting/settings",
            &json!({ "max_ltv": 70 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_close(read_json_body(response).await["max_ltv"].as_f64().unwrap(), 70.0);

    let response = router
        .oneshot(json_request(
            "PUT",
            "/api/v1/underwriting/settings",
            &json!({ "origination_fee_percent": 120 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn assessment_route_attaches_recommendation() {
    let (service, _, _) = build_service();
    let record = service.submit(application("borrower-1")).expect("submit");
    let router = router_with_service(service);

    let uri = format!("/api/v1/underwriting/loans/{}/assessment", record.id);
    let body = json!({
        "recommendation": "approve",
        "confidence": 0.81,
        "summary": "Experienced borrower, conservative LTV",
        "generated_at": "2025-10-01T12:00:00Z"
    });
    let response = router
        .oneshot(json_request("PUT", &uri, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["ai_assessment"]["recommendation"], "approve");
    assert_eq!(payload["pre_approval_decision"], "PENDING");
}
