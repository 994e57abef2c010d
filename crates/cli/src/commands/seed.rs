use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use staffdesk_core::audit;
use staffdesk_core::domain::request::{
    ActorRole, Attachment, Priority, Request, RequestId, RequestStatus,
};
use staffdesk_core::config::{AppConfig, LoadOptions};
use staffdesk_db::repositories::{RequestRepository, SqlRequestRepository};
use staffdesk_db::{connect_with_settings, migrations};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repository = SqlRequestRepository::new(pool.clone());
        let mut inserted = Vec::new();
        for request in demo_requests() {
            let id = request.id.0.clone();
            let exists = repository
                .find_by_id(&request.id)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?
                .is_some();
            if exists {
                continue;
            }
            repository
                .create(request)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            inserted.push(id);
        }

        pool.close().await;
        Ok::<Vec<String>, (&'static str, String, u8)>(inserted)
    });

    match result {
        Ok(inserted) if inserted.is_empty() => {
            CommandResult::success("seed", "demo requests already present, nothing to do")
        }
        Ok(inserted) => CommandResult::success_with_detail(
            "seed",
            format!("loaded {} demo requests", inserted.len()),
            serde_json::json!({ "inserted": inserted }),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

/// Fixture requests covering the submission, mid-workflow, and terminal
/// shapes of the lifecycle. IDs are fixed so reseeding is a no-op.
fn demo_requests() -> Vec<Request> {
    let now = Utc::now();

    let pending = Request {
        id: RequestId("REQ-demo-leave".to_owned()),
        employee_id: "EMP-demo-1".to_owned(),
        employee_name: "Sara Ahmadi".to_owned(),
        request_type: "annual-leave".to_owned(),
        status: RequestStatus::Pending,
        priority: Priority::Medium,
        description: "two weeks of annual leave in September".to_owned(),
        reason: Some("family visit".to_owned()),
        start_date: NaiveDate::from_ymd_opt(2026, 9, 7),
        end_date: NaiveDate::from_ymd_opt(2026, 9, 18),
        amount: None,
        submission_date: now - Duration::days(1),
        attachments: Vec::new(),
        comments: Vec::new(),
        history: vec![audit::submission_entry("Sara Ahmadi")],
    };

    let mut under_review = Request {
        id: RequestId("REQ-demo-equipment".to_owned()),
        employee_id: "EMP-demo-2".to_owned(),
        employee_name: "Reza Karimi".to_owned(),
        request_type: "equipment".to_owned(),
        status: RequestStatus::UnderReview,
        priority: Priority::High,
        description: "replacement laptop for the design team".to_owned(),
        reason: None,
        start_date: None,
        end_date: None,
        amount: Some(Decimal::new(2_499_00, 2)),
        submission_date: now - Duration::days(3),
        attachments: vec![Attachment {
            file_name: "vendor-quote.pdf".to_owned(),
            file_path: "/uploads/demo/vendor-quote.pdf".to_owned(),
            file_type: "application/pdf".to_owned(),
        }],
        comments: Vec::new(),
        history: vec![audit::submission_entry("Reza Karimi")],
    };
    under_review
        .history
        .push(audit::status_entry(RequestStatus::UnderReview, "Leila Hosseini"));

    let mut rejected = Request {
        id: RequestId("REQ-demo-training".to_owned()),
        employee_id: "EMP-demo-3".to_owned(),
        employee_name: "Omid Nazari".to_owned(),
        request_type: "training".to_owned(),
        status: RequestStatus::RejectedManager,
        priority: Priority::Low,
        description: "conference attendance".to_owned(),
        reason: Some("skill development".to_owned()),
        start_date: None,
        end_date: None,
        amount: Some(Decimal::new(1_200_00, 2)),
        submission_date: now - Duration::days(10),
        attachments: Vec::new(),
        comments: vec![audit::comment_entry(
            "Leila Hosseini",
            ActorRole::Manager,
            "budget exhausted for this quarter",
        )],
        history: vec![audit::submission_entry("Omid Nazari")],
    };
    rejected
        .history
        .push(audit::status_entry(RequestStatus::RejectedManager, "Leila Hosseini"));

    vec![pending, under_review, rejected]
}
