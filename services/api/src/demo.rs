use crate::infra::{InMemoryLoanRepository, InMemorySettingsStore};
use chrono::{Duration, Local, NaiveDate, Utc};
use clap::Args;
use loan_underwriting::error::AppError;
use loan_underwriting::underwriting::{
    Actor, BorrowerId, BorrowerIntake, DecisionRequest, ExitStrategy, FormKind, FormSubmission,
    FreshnessPolicy, LenderPipelineRecord, LiquidityProof, LlcDetails, LoanApplication, LoanType,
    OtherMortgage, PastProject, PurchaseDetails, Submitted, UnderwritingService, UserRole,
};
use loan_underwriting::underwriting::prefill::DEFAULT_FRESHNESS_WINDOW_DAYS;
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Target closing date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) closing_date: Option<NaiveDate>,
    /// Requested loan amount for the sample loan.
    #[arg(long, default_value_t = 250_000.0)]
    pub(crate) amount: f64,
    /// Days a prior borrower fact stays reusable.
    #[arg(long)]
    pub(crate) prefill_window_days: Option<u32>,
    /// Age in days of the borrower's previous application.
    #[arg(long, default_value_t = 12)]
    pub(crate) prior_age_days: i64,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        closing_date,
        amount,
        prefill_window_days,
        prior_age_days,
    } = args;

    let closing_date = closing_date.unwrap_or_else(|| Local::now().date_naive());
    let policy =
        FreshnessPolicy::new(prefill_window_days.unwrap_or(DEFAULT_FRESHNESS_WINDOW_DAYS));
    let service = UnderwritingService::new(
        Arc::new(InMemoryLoanRepository::default()),
        Arc::new(InMemorySettingsStore::default()),
        policy,
    );

    println!("Underwriting demo");
    let borrower = BorrowerId("borrower-demo".to_string());

    let prior = service.submit(sample_application(
        &borrower,
        amount * 0.8,
        closing_date,
        prior_age_days,
    ))?;
    println!(
        "- Prior loan {} on file ({} days old)",
        prior.id, prior_age_days
    );

    let mut current_application = sample_application(&borrower, amount, closing_date, 0);
    current_application.intake = BorrowerIntake::default();
    let current = service.submit(current_application)?;
    println!(
        "- New {} loan {} for ${:.2}, closing {}",
        current.loan_type.label(),
        current.id,
        current.amount,
        closing_date
    );

    let prefill = service.prefill(&borrower, Some(&current.id))?;
    println!(
        "\nPrefill (window {} days): {} of 6 facts reusable",
        prefill.window_days,
        prefill.reusable_count()
    );
    print_json(&prefill);

    println!("\nRole forms");
    for form in FormKind::ordered() {
        let outcome = service.save_form(&current.id, form, demo_form(form))?;
        let missing = if outcome.completeness.missing.is_empty() {
            "complete".to_string()
        } else {
            format!("missing {}", outcome.completeness.missing.join(", "))
        };
        println!("- {}: {}", form.label(), missing);
    }

    let view = service.pipeline(&current.id)?;
    println!("\nFormulas");
    print_json(&view.formulas);
    print_pipeline(&view);

    let decided = service.apply_decision(
        &current.id,
        &DecisionRequest {
            decision: "PRE_APPROVE".to_string(),
            notes: Some("Demo approval".to_string()),
            decided_by: Some("lender-demo".to_string()),
        },
    )?;
    println!("\nAfter decision");
    print_pipeline(&decided);

    Ok(())
}

fn sample_application(
    borrower: &BorrowerId,
    amount: f64,
    closing_date: NaiveDate,
    facts_age_days: i64,
) -> LoanApplication {
    let submitted_at = Utc::now() - Duration::days(facts_age_days);
    LoanApplication {
        borrower_id: borrower.clone(),
        loan_type: LoanType::FixAndFlip,
        amount,
        purchase_details: PurchaseDetails {
            purchase_price: amount * 1.2,
            rehab_budget: amount * 0.3,
            arv: amount * 1.8,
            target_closing_date: closing_date,
            exit_strategy: ExitStrategy::Sell,
        },
        intake: BorrowerIntake {
            credit_score: Some(Submitted::new(731, submitted_at)),
            liquidity: Some(Submitted::new(
                LiquidityProof {
                    amount: amount * 0.2,
                    documents: Vec::new(),
                },
                submitted_at,
            )),
            llc: Some(Submitted::new(
                LlcDetails {
                    name: "Demo Holdings LLC".to_string(),
                    ein: None,
                    state_of_formation: Some("IA".to_string()),
                    documents: Vec::new(),
                },
                submitted_at,
            )),
            referral: None,
            past_projects: Some(Submitted::new(
                vec![PastProject {
                    address: "118 Walnut St".to_string(),
                    purchase_price: 142_000.0,
                    sale_price: Some(219_000.0),
                    completed_on: None,
                }],
                submitted_at,
            )),
            other_mortgages: Some(Submitted::new(
                vec![OtherMortgage {
                    lender: "First Regional".to_string(),
                    monthly_payment: 1_150.0,
                    monthly_carrying_cost: 280.0,
                }],
                submitted_at,
            )),
        },
    }
}

fn demo_form(form: FormKind) -> FormSubmission {
    let (role, values) = match form {
        FormKind::Valuation => (
            UserRole::Lender,
            json!({
                "appraised_value": "$430,000",
                "arv_estimate": "$450,000",
                "valuation_date": "2025-09-30",
                "valuation_source": "Full appraisal",
                "comparable_sales": "3 comps",
            }),
        ),
        FormKind::Evaluator => (
            UserRole::Evaluator,
            json!({
                "property_condition": "Fair",
                "rehab_scope": "Kitchen and baths",
                "budget_assessment": "Adequate",
                "exit_strategy_assessment": "Resale",
                "market_risk": "Low",
            }),
        ),
        FormKind::Conditions => (
            UserRole::Borrower,
            json!({
                "title_commitment": "received",
                "insurance_binder": "received",
                "entity_documents": "received",
            }),
        ),
        FormKind::TitleAgent => (
            UserRole::TitleAgent,
            json!({
                "title_company": "Prairie Title",
                "agent_name": "Dana Ortiz",
                "agent_email": "dana@prairietitle.example",
                "agent_phone": "515-555-0134",
                "file_number": "PT-2291",
            }),
        ),
    };

    FormSubmission {
        actor: Actor {
            role,
            user_id: format!("{}-demo", role.label().to_ascii_lowercase().replace(' ', "-")),
        },
        values: match values {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    }
}

fn print_pipeline(view: &LenderPipelineRecord) {
    println!(
        "- Stage {} ({}/7) | decision {} | forms complete: {} | loan complete: {}",
        view.stage_label,
        view.stage_index + 1,
        view.decision_label,
        view.forms_complete,
        view.is_complete
    );
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => println!("  (unable to render: {err})"),
    }
}
